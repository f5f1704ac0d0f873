//! # Treepack
//!
//! A small, self-describing binary tree codec.
//!
//! Values are written through a [`Writer`] as a flat stream of primitive
//! writes bracketed by `begin_*`/`complete_*` calls, and read back by
//! parsing the whole buffer into a [`Tree`] whose values are addressed with
//! lightweight [`Node`] handles.
//!
//! ## Format
//!
//! - **Markers**: `[Tag: 1b]` (nil, true, false)
//! - **Scalars**: `[Tag: 1b][Data: N]`
//! - **Strings**: `[Tag: 1b][Len: 4b][Utf8: Len]`
//! - **Containers**: `[Tag: 1b][Len: 4b][Count: 4b][Body: Len]`
//!
//! Map bodies alternate key and value items; `Count` is the number of
//! entries. All integers are Little-Endian.

mod tree;
mod writer;

#[cfg(test)]
mod tests;

pub use tree::Elements;
pub use tree::Entries;
pub use tree::Node;
pub use tree::Tree;
pub use tree::MAX_DEPTH;
pub use writer::Writer;

/// Treepack write and parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Byte does not correspond to a valid `Tag`.
    InvalidTag(u8),
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// Buffer exhausted while parsing.
    UnexpectedEnd,
    /// Bytes remain after the root value.
    TrailingBytes(usize),
    /// Containers nested deeper than [`MAX_DEPTH`].
    TooDeep,
    /// A container's declared count disagrees with its body.
    CountMismatch { declared: usize, found: usize },
    /// String or container length exceeds `u32::MAX`.
    BlobTooLarge(usize),
    /// Closing a scope that does not match the active scope.
    ScopeMismatch { expected: Scope, actual: Scope },
    /// Attempted to close a scope when only the Root remains.
    ScopeUnderflow,
    /// Attempted to finish with open scopes; carries the open depth.
    ScopeStillOpen(usize),
    /// Attempted to write a second value at the root.
    TooManyRoots,
    /// Finished without writing any value.
    EmptyRoot,
    /// Completed a map whose last key has no value.
    DanglingKey,
    /// A node was read as the wrong kind.
    TypeMismatch { expected: Kind, found: Kind },
    /// An integer does not fit the requested width.
    OutOfRange(&'static str),
    /// Element index past the end of an array.
    OutOfBounds { index: usize, len: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidTag(b) => write!(f, "invalid tag byte: {:#04x}", b),
            Error::InvalidUtf8 => write!(f, "string is not valid utf-8"),
            Error::UnexpectedEnd => write!(f, "unexpected end of input"),
            Error::TrailingBytes(n) => write!(f, "{} trailing bytes after root value", n),
            Error::TooDeep => write!(f, "nesting exceeds {} levels", MAX_DEPTH),
            Error::CountMismatch { declared, found } => {
                write!(f, "container declares {} items, body holds {}", declared, found)
            }
            Error::ScopeMismatch { expected, actual } => {
                write!(f, "scope mismatch: expected {:?}, found {:?}", expected, actual)
            }
            Error::ScopeStillOpen(depth) => write!(f, "{} scopes still open", depth),
            Error::TypeMismatch { expected, found } => {
                write!(f, "expected {:?}, found {:?}", expected, found)
            }
            Error::OutOfRange(ty) => write!(f, "value out of range for {}", ty),
            Error::OutOfBounds { index, len } => {
                write!(f, "index {} out of bounds for length {}", index, len)
            }
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for Treepack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Identifies the type of an encoded value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Nil = 0x00,
    True = 0x01,
    False = 0x02,
    U8 = 0x03,
    U16 = 0x04,
    U32 = 0x05,
    U64 = 0x06,
    I8 = 0x07,
    I16 = 0x08,
    I32 = 0x09,
    I64 = 0x0A,
    F32 = 0x0B,
    F64 = 0x0C,

    // Blobs (Tag + u32 Len + Bytes)
    Str = 0x10,

    // Containers (Tag + u32 Len + u32 Count + Body)
    Array = 0x20,
    Map = 0x21,
}

impl Tag {
    /// Returns the Tag variant for a given byte, or `None` if invalid.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Tag::Nil),
            0x01 => Some(Tag::True),
            0x02 => Some(Tag::False),
            0x03 => Some(Tag::U8),
            0x04 => Some(Tag::U16),
            0x05 => Some(Tag::U32),
            0x06 => Some(Tag::U64),
            0x07 => Some(Tag::I8),
            0x08 => Some(Tag::I16),
            0x09 => Some(Tag::I32),
            0x0A => Some(Tag::I64),
            0x0B => Some(Tag::F32),
            0x0C => Some(Tag::F64),
            0x10 => Some(Tag::Str),
            0x20 => Some(Tag::Array),
            0x21 => Some(Tag::Map),
            _ => None,
        }
    }
}

/// The shape of a parsed value, as seen through a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Nil,
    Bool,
    /// Unsigned integer of any width.
    Uint,
    /// Signed integer of any width.
    Int,
    F32,
    F64,
    Str,
    Array,
    Map,
}

/// Open container state on the `Writer` stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The virtual root; accepts exactly one value.
    Root,
    /// Ordered sequence; any number of values.
    Array,
    /// Alternating keys and values; must close on a value.
    Map,
}
