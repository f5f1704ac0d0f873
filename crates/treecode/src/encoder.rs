use treepack::Scope;
use treepack::Writer;

use crate::macros::array_encoder_scalar;
use crate::macros::for_each_scalar;
use crate::macros::map_encoder_scalar;
use crate::macros::value_encoder_scalar;
use crate::Encode;
use crate::Error;
use crate::Result;

/// Drives a single [`Writer`] through a recursive [`Encode`] traversal.
///
/// The encoder is single-use: [`Encoder::finish`] consumes it.
pub struct Encoder {
    writer: Writer,
    /// First completion failure seen while a guard was dropped.
    deferred: Option<treepack::Error>,
    /// Armed by `super_encoder`; the next container request reuses the open scope.
    merge: Option<Scope>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self { writer: Writer::new(), deferred: None, merge: None }
    }

    /// Encodes `value` into a fresh buffer.
    pub fn encode<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        value.encode(&mut enc)?;
        enc.finish()
    }

    /// Opens a keyed container.
    pub fn map(&mut self) -> Result<MapEncoder<'_>> {
        Ok(MapEncoder { open: Open::begin(self, Scope::Map)? })
    }

    /// Opens an ordered container.
    pub fn array(&mut self) -> Result<ArrayEncoder<'_>> {
        Ok(ArrayEncoder { open: Open::begin(self, Scope::Array)?, count: 0 })
    }

    /// A view that accepts exactly one value.
    pub fn value(&mut self) -> ValueEncoder<'_> {
        ValueEncoder { enc: self }
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.writer.depth()
    }

    /// Closes the root and returns the encoded bytes.
    ///
    /// # Errors
    /// `Error::Encoding` if a container failed to complete or the writer is unbalanced.
    pub fn finish(self) -> Result<Vec<u8>> {
        if let Some(e) = self.deferred {
            return Err(Error::Encoding(e));
        }
        self.writer.finish().map_err(Error::Encoding)
    }

    fn write(&mut self, f: impl FnOnce(&mut Writer) -> treepack::Result<()>) -> Result<()> {
        self.merge = None;
        f(&mut self.writer).map_err(Error::Encoding)
    }
}

/// An open container. Completes it exactly once, on `close` or on drop.
struct Open<'a> {
    enc: &'a mut Encoder,
    scope: Scope,
    /// False when reusing a scope opened by an enclosing guard.
    owned: bool,
    closed: bool,
}

impl<'a> Open<'a> {
    fn begin(enc: &'a mut Encoder, scope: Scope) -> Result<Self> {
        match enc.merge.take() {
            Some(open) if open == scope => {
                return Ok(Self { enc, scope, owned: false, closed: false });
            }
            Some(open) => {
                return Err(Error::Encoding(treepack::Error::ScopeMismatch { expected: open, actual: scope }));
            }
            None => {}
        }
        match scope {
            Scope::Map => enc.writer.begin_map(),
            _ => enc.writer.begin_array(),
        }
        .map_err(Error::Encoding)?;
        Ok(Self { enc, scope, owned: true, closed: false })
    }

    fn close(&mut self) -> treepack::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.enc.merge = None;
        if !self.owned {
            return Ok(());
        }
        match self.scope {
            Scope::Map => self.enc.writer.complete_map(),
            _ => self.enc.writer.complete_array(),
        }
    }

    fn super_encoder(&mut self) -> &mut Encoder {
        self.enc.merge = Some(self.scope);
        &mut *self.enc
    }
}

impl Drop for Open<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // An error between a key and its value leaves the map one item short.
        if self.owned && self.enc.writer.pending_key() {
            self.enc.deferred.get_or_insert(treepack::Error::DanglingKey);
            let _ = self.enc.writer.nil();
        }
        if let Err(e) = self.close() {
            self.enc.deferred.get_or_insert(e);
        }
    }
}

/// Accepts exactly one value: a scalar, or a nested container.
#[must_use]
pub struct ValueEncoder<'a> {
    enc: &'a mut Encoder,
}

impl<'a> ValueEncoder<'a> {
    for_each_scalar!(value_encoder_scalar);

    pub fn nil(self) -> Result<()> {
        self.enc.write(|w| w.nil())
    }

    pub fn str(self, v: &str) -> Result<()> {
        self.enc.write(|w| w.str(v))
    }

    /// Natural-width signed integer, written as `i64`.
    pub fn int(self, v: isize) -> Result<()> {
        self.i64(v as i64)
    }

    /// Natural-width unsigned integer, written as `u64`.
    pub fn uint(self, v: usize) -> Result<()> {
        self.u64(v as u64)
    }

    pub fn encode<T: Encode + ?Sized>(self, v: &T) -> Result<()> {
        v.encode(self.enc)
    }

    pub fn map(self) -> Result<MapEncoder<'a>> {
        let enc = self.enc;
        enc.map()
    }

    pub fn array(self) -> Result<ArrayEncoder<'a>> {
        let enc = self.enc;
        enc.array()
    }
}

/// Keyed container view. Each write emits the key, then its value.
pub struct MapEncoder<'a> {
    open: Open<'a>,
}

impl<'a> MapEncoder<'a> {
    for_each_scalar!(map_encoder_scalar);

    /// Writes `key` and returns the slot for its value.
    pub fn key(&mut self, key: &str) -> Result<ValueEncoder<'_>> {
        self.open.enc.write(|w| w.str(key))?;
        Ok(self.open.enc.value())
    }

    pub fn nil(&mut self, key: &str) -> Result<&mut Self> {
        self.key(key)?.nil()?;
        Ok(self)
    }

    pub fn str(&mut self, key: &str, v: &str) -> Result<&mut Self> {
        self.key(key)?.str(v)?;
        Ok(self)
    }

    pub fn int(&mut self, key: &str, v: isize) -> Result<&mut Self> {
        self.key(key)?.int(v)?;
        Ok(self)
    }

    pub fn uint(&mut self, key: &str, v: usize) -> Result<&mut Self> {
        self.key(key)?.uint(v)?;
        Ok(self)
    }

    pub fn encode<T: Encode + ?Sized>(&mut self, key: &str, v: &T) -> Result<&mut Self> {
        self.key(key)?.encode(v)?;
        Ok(self)
    }

    pub fn map(&mut self, key: &str) -> Result<MapEncoder<'_>> {
        self.key(key)?.map()
    }

    pub fn array(&mut self, key: &str) -> Result<ArrayEncoder<'_>> {
        self.key(key)?.array()
    }

    /// The shared encoder, armed so the next `map()` writes into this map
    /// instead of nesting a new one.
    pub fn super_encoder(&mut self) -> &mut Encoder {
        self.open.super_encoder()
    }

    /// Completes the map, reporting completion errors directly.
    pub fn finish(mut self) -> Result<()> {
        self.open.close().map_err(Error::Encoding)
    }
}

/// Ordered container view.
pub struct ArrayEncoder<'a> {
    open: Open<'a>,
    count: usize,
}

impl<'a> ArrayEncoder<'a> {
    for_each_scalar!(array_encoder_scalar);

    /// The slot for the next element.
    pub fn element(&mut self) -> ValueEncoder<'_> {
        self.count += 1;
        self.open.enc.value()
    }

    /// Elements written so far through this view.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn nil(&mut self) -> Result<&mut Self> {
        self.element().nil()?;
        Ok(self)
    }

    pub fn str(&mut self, v: &str) -> Result<&mut Self> {
        self.element().str(v)?;
        Ok(self)
    }

    pub fn int(&mut self, v: isize) -> Result<&mut Self> {
        self.element().int(v)?;
        Ok(self)
    }

    pub fn uint(&mut self, v: usize) -> Result<&mut Self> {
        self.element().uint(v)?;
        Ok(self)
    }

    pub fn encode<T: Encode + ?Sized>(&mut self, v: &T) -> Result<&mut Self> {
        self.element().encode(v)?;
        Ok(self)
    }

    pub fn map(&mut self) -> Result<MapEncoder<'_>> {
        self.element().map()
    }

    pub fn array(&mut self) -> Result<ArrayEncoder<'_>> {
        self.element().array()
    }

    /// The shared encoder, armed so the next `array()` appends to this array.
    pub fn super_encoder(&mut self) -> &mut Encoder {
        self.open.super_encoder()
    }

    /// Completes the array, reporting completion errors directly.
    pub fn finish(mut self) -> Result<()> {
        self.open.close().map_err(Error::Encoding)
    }
}
