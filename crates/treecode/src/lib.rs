//! # Treecode
//!
//! Bridges structured Rust values and [`treepack`] trees.
//!
//! A type opts in by implementing [`Encode`] and [`Decode`]. Both traits are
//! visitors: `encode` asks the [`Encoder`] for a keyed view ([`MapEncoder`]),
//! an ordered view ([`ArrayEncoder`]) or a single-value view
//! ([`ValueEncoder`]) and writes through it; `decode` asks the [`Decoder`]
//! for the mirror-image views over its current node.
//!
//! Container views are guards. Opening one begins the container (or pushes
//! the node being navigated) and dropping it completes the container (or
//! pops the node), so nesting stays balanced on every exit path, `?`
//! included.
//!
//! ```ignore
//! struct User { name: String, tags: Vec<u32> }
//!
//! impl Encode for User {
//!     fn encode(&self, enc: &mut Encoder) -> Result<()> {
//!         let mut map = enc.map()?;
//!         map.str("name", &self.name)?;
//!         map.encode("tags", &self.tags)?;
//!         map.finish()
//!     }
//! }
//!
//! impl Decode for User {
//!     fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
//!         let mut map = dec.map()?;
//!         Ok(User { name: map.string("name")?, tags: map.decode("tags")? })
//!     }
//! }
//! ```
//!
//! With the `derive` feature (on by default) the same impls come from
//! `#[derive(Encode, Decode)]`: named fields as a map, tuple fields as an
//! array, unit structs as nil.

// Lets derived impls name `::treecode` from inside this crate too.
extern crate self as treecode;

mod macros;

mod decoder;
mod encoder;
mod error;
mod impls;
mod value;

#[cfg(test)]
mod tests;

pub use decoder::ArrayDecoder;
pub use decoder::Decoder;
pub use decoder::MapDecoder;
pub use decoder::ValueDecoder;
pub use encoder::ArrayEncoder;
pub use encoder::Encoder;
pub use encoder::MapEncoder;
pub use encoder::ValueEncoder;
pub use error::Corruption;
pub use error::Error;
pub use error::Path;
pub use error::Result;
pub use error::Segment;
pub use value::Value;

pub use treepack::Kind;
pub use treepack::Node;
pub use treepack::Tree;

#[cfg(feature = "derive")]
pub use treecode_derive::Decode;
#[cfg(feature = "derive")]
pub use treecode_derive::Encode;

/// A value that can write itself through an [`Encoder`].
///
/// Implementations write exactly one value: a scalar, a map or an array.
pub trait Encode {
    fn encode(&self, enc: &mut Encoder) -> Result<()>;
}

/// A value that can rebuild itself from the [`Decoder`]'s current node.
pub trait Decode: Sized {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self>;
}
