use crate::Error;
use crate::Result;
use crate::Scope;
use crate::Tag;

/// An open container on the `Writer` stack.
#[derive(Clone, Copy)]
struct Frame {
    /// Offset of the first body byte; the length and count headers sit just before it.
    start: usize,
    scope: Scope,
    count: usize,
}

/// A single-use, state-machine driven writer.
///
/// The Writer keeps a stack of open containers and back-patches their
/// length and count headers when they complete.
///
/// # Structural Invariants
///
/// 1.  **Root**: exactly one value is written at the root.
/// 2.  **Map**: items alternate key, value; a map cannot complete on a key.
/// 3.  **Balance**: every `begin_*` is matched by its own `complete_*`
///     before `finish` succeeds.
pub struct Writer {
    buf: Vec<u8>,
    /// Bottom is always `Scope::Root`.
    stack: Vec<Frame>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a new writer with default capacity.
    pub fn new() -> Self {
        let mut writer = Self {
            buf: Vec::with_capacity(256),
            stack: Vec::with_capacity(8),
        };
        writer.stack.push(Frame { start: 0, scope: Scope::Root, count: 0 });
        writer
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// True if the innermost container is a map holding a key without its value.
    pub fn pending_key(&self) -> bool {
        let frame = &self.stack[self.stack.len() - 1];
        frame.scope == Scope::Map && frame.count % 2 == 1
    }

    /// Consumes the writer and returns the encoded bytes.
    ///
    /// # Errors
    /// `Error::ScopeStillOpen` if containers remain open, `Error::EmptyRoot`
    /// if no value was written.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.depth() > 0 {
            return Err(Error::ScopeStillOpen(self.depth()));
        }
        if self.stack[0].count == 0 {
            return Err(Error::EmptyRoot);
        }
        Ok(self.buf)
    }

    fn frame(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn check_write(&mut self) -> Result<()> {
        let frame = self.frame();
        if frame.scope == Scope::Root && frame.count >= 1 {
            return Err(Error::TooManyRoots);
        }
        Ok(())
    }

    fn on_item_written(&mut self) {
        self.frame().count += 1;
    }

    fn scalar(&mut self, tag: Tag, data: &[u8]) -> Result<()> {
        self.check_write()?;
        self.buf.push(tag as u8);
        self.buf.extend_from_slice(data);
        self.on_item_written();
        Ok(())
    }

    fn begin(&mut self, tag: Tag, scope: Scope) -> Result<()> {
        self.check_write()?;
        self.buf.push(tag as u8);
        self.buf.extend_from_slice(&[0; 8]); // Length and count placeholders
        self.stack.push(Frame { start: self.buf.len(), scope, count: 0 });
        Ok(())
    }

    fn complete(&mut self, expected: Scope) -> Result<()> {
        if self.stack.len() <= 1 {
            return Err(Error::ScopeUnderflow);
        }

        let Frame { start, scope, count } = *self.frame();
        if scope != expected {
            return Err(Error::ScopeMismatch { expected, actual: scope });
        }
        if scope == Scope::Map && count % 2 == 1 {
            return Err(Error::DanglingKey);
        }

        let body_len = self.buf.len() - start;
        if body_len > u32::MAX as usize {
            return Err(Error::BlobTooLarge(body_len));
        }
        let items = match scope {
            Scope::Map => count / 2,
            _ => count,
        };

        // Pop and patch
        self.stack.pop();
        self.buf[start - 8..start - 4].copy_from_slice(&(body_len as u32).to_le_bytes());
        self.buf[start - 4..start].copy_from_slice(&(items as u32).to_le_bytes());
        self.on_item_written();
        Ok(())
    }

    /// Writes nil.
    pub fn nil(&mut self) -> Result<()> { self.scalar(Tag::Nil, &[]) }

    /// Writes a boolean.
    pub fn bool(&mut self, v: bool) -> Result<()> {
        self.scalar(if v { Tag::True } else { Tag::False }, &[])
    }

    pub fn u8(&mut self, v: u8) -> Result<()> { self.scalar(Tag::U8, &[v]) }
    pub fn i8(&mut self, v: i8) -> Result<()> { self.scalar(Tag::I8, &v.to_le_bytes()) }
    pub fn u16(&mut self, v: u16) -> Result<()> { self.scalar(Tag::U16, &v.to_le_bytes()) }
    pub fn i16(&mut self, v: i16) -> Result<()> { self.scalar(Tag::I16, &v.to_le_bytes()) }
    pub fn u32(&mut self, v: u32) -> Result<()> { self.scalar(Tag::U32, &v.to_le_bytes()) }
    pub fn i32(&mut self, v: i32) -> Result<()> { self.scalar(Tag::I32, &v.to_le_bytes()) }
    pub fn u64(&mut self, v: u64) -> Result<()> { self.scalar(Tag::U64, &v.to_le_bytes()) }
    pub fn i64(&mut self, v: i64) -> Result<()> { self.scalar(Tag::I64, &v.to_le_bytes()) }
    pub fn f32(&mut self, v: f32) -> Result<()> { self.scalar(Tag::F32, &v.to_le_bytes()) }
    pub fn f64(&mut self, v: f64) -> Result<()> { self.scalar(Tag::F64, &v.to_le_bytes()) }

    /// Writes a UTF-8 string.
    pub fn str(&mut self, v: &str) -> Result<()> {
        let len = v.len();
        if len > u32::MAX as usize {
            return Err(Error::BlobTooLarge(len));
        }
        self.check_write()?;
        self.buf.push(Tag::Str as u8);
        self.buf.extend_from_slice(&(len as u32).to_le_bytes());
        self.buf.extend_from_slice(v.as_bytes());
        self.on_item_written();
        Ok(())
    }

    /// Begins a map. Items written until `complete_map` alternate key, value.
    pub fn begin_map(&mut self) -> Result<()> { self.begin(Tag::Map, Scope::Map) }
    /// Completes the innermost map.
    pub fn complete_map(&mut self) -> Result<()> { self.complete(Scope::Map) }

    /// Begins an array.
    pub fn begin_array(&mut self) -> Result<()> { self.begin(Tag::Array, Scope::Array) }
    /// Completes the innermost array.
    pub fn complete_array(&mut self) -> Result<()> { self.complete(Scope::Array) }
}
