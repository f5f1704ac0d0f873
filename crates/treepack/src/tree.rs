//! Arena-backed reader for parsed buffers.
//!
//! [`Tree::parse`] walks the buffer once and records every value as an
//! entry in a flat arena. Containers point at a contiguous run of child
//! indices in a separate link table, so navigation never re-scans bytes.

use crate::Error;
use crate::Kind;
use crate::Result;
use crate::Tag;

/// Maximum container nesting accepted by the parser.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy)]
enum Entry {
    Nil,
    Bool(bool),
    Uint(u64),
    Int(i64),
    F32(f32),
    F64(f64),
    /// Byte range into the backing buffer.
    Str { start: usize, len: usize },
    /// `len` child indices starting at `first` in the link table.
    Array { first: usize, len: usize },
    /// `len` entries; `2 * len` links alternating key, value.
    Map { first: usize, len: usize },
}

/// A parsed buffer. Owns the bytes and the node arena.
#[derive(Debug, Clone)]
pub struct Tree {
    bytes: Vec<u8>,
    entries: Vec<Entry>,
    links: Vec<usize>,
    root: usize,
}

impl Tree {
    /// Parses exactly one value from `bytes`.
    ///
    /// # Errors
    /// Any structural problem aborts the parse; no partial tree is returned.
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Tree> {
        let bytes = bytes.into();
        let mut parser = Parser { buf: &bytes, pos: 0, entries: Vec::new(), links: Vec::new() };
        let root = parser.value(0)?;
        if parser.pos != bytes.len() {
            return Err(Error::TrailingBytes(bytes.len() - parser.pos));
        }
        let Parser { entries, links, .. } = parser;
        Ok(Tree { bytes, entries, links, root })
    }

    /// The root value.
    pub fn root(&self) -> Node<'_> {
        Node { tree: self, index: self.root }
    }

    /// The buffer this tree was parsed from.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
    entries: Vec<Entry>,
    links: Vec<usize>,
}

impl<'a> Parser<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(Error::UnexpectedEnd)?;
        let bytes = self.buf.get(self.pos..end).ok_or(Error::UnexpectedEnd)?;
        self.pos = end;
        Ok(bytes)
    }

    fn fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<usize> {
        Ok(u32::from_le_bytes(self.fixed()?) as usize)
    }

    fn push(&mut self, entry: Entry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    fn value(&mut self, depth: usize) -> Result<usize> {
        let [byte] = self.fixed::<1>()?;
        let tag = Tag::from_u8(byte).ok_or(Error::InvalidTag(byte))?;
        let entry = match tag {
            Tag::Nil => Entry::Nil,
            Tag::True => Entry::Bool(true),
            Tag::False => Entry::Bool(false),
            Tag::U8 => Entry::Uint(u8::from_le_bytes(self.fixed()?) as u64),
            Tag::U16 => Entry::Uint(u16::from_le_bytes(self.fixed()?) as u64),
            Tag::U32 => Entry::Uint(u32::from_le_bytes(self.fixed()?) as u64),
            Tag::U64 => Entry::Uint(u64::from_le_bytes(self.fixed()?)),
            Tag::I8 => Entry::Int(i8::from_le_bytes(self.fixed()?) as i64),
            Tag::I16 => Entry::Int(i16::from_le_bytes(self.fixed()?) as i64),
            Tag::I32 => Entry::Int(i32::from_le_bytes(self.fixed()?) as i64),
            Tag::I64 => Entry::Int(i64::from_le_bytes(self.fixed()?)),
            Tag::F32 => Entry::F32(f32::from_le_bytes(self.fixed()?)),
            Tag::F64 => Entry::F64(f64::from_le_bytes(self.fixed()?)),
            Tag::Str => {
                let len = self.u32()?;
                let start = self.pos;
                self.take(len)?;
                Entry::Str { start, len }
            }
            Tag::Array | Tag::Map => return self.container(tag, depth),
        };
        Ok(self.push(entry))
    }

    fn container(&mut self, tag: Tag, depth: usize) -> Result<usize> {
        if depth >= MAX_DEPTH {
            return Err(Error::TooDeep);
        }
        let body = self.u32()?;
        let count = self.u32()?;
        let end = self.pos.checked_add(body).filter(|end| *end <= self.buf.len()).ok_or(Error::UnexpectedEnd)?;
        let declared = if tag == Tag::Map { count.saturating_mul(2) } else { count };

        // The declared count is untrusted; grow as children actually parse.
        let mut children = Vec::new();
        while self.pos < end {
            children.push(self.value(depth + 1)?);
        }
        if self.pos != end {
            return Err(Error::UnexpectedEnd);
        }
        if children.len() != declared {
            return Err(Error::CountMismatch { declared, found: children.len() });
        }

        let first = self.links.len();
        self.links.extend(children);
        let entry = match tag {
            Tag::Map => Entry::Map { first, len: count },
            _ => Entry::Array { first, len: count },
        };
        Ok(self.push(entry))
    }
}

/// A handle to one value inside a [`Tree`].
///
/// Nodes are `Copy` and borrow the tree; they cannot outlive it.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t Tree,
    index: usize,
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node").field("index", &self.index).field("kind", &self.kind()).finish()
    }
}

macro_rules! int_readers {
    ($($name:ident => $ty:ty, $kind:expr;)*) => {
        $(
            #[doc = concat!("Reads the value as `", stringify!($ty), "`, converting from any integer width.")]
            pub fn $name(&self) -> Result<$ty> {
                match self.entry() {
                    Entry::Uint(v) => <$ty>::try_from(v).map_err(|_| Error::OutOfRange(stringify!($ty))),
                    Entry::Int(v) => <$ty>::try_from(v).map_err(|_| Error::OutOfRange(stringify!($ty))),
                    _ => Err(self.mismatch($kind)),
                }
            }
        )*
    };
}

impl<'t> Node<'t> {
    fn entry(&self) -> Entry {
        self.tree.entries[self.index]
    }

    fn at(&self, link: usize) -> Node<'t> {
        Node { tree: self.tree, index: self.tree.links[link] }
    }

    fn mismatch(&self, expected: Kind) -> Error {
        Error::TypeMismatch { expected, found: self.kind() }
    }

    /// The tree this node belongs to.
    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    pub fn kind(&self) -> Kind {
        match self.entry() {
            Entry::Nil => Kind::Nil,
            Entry::Bool(_) => Kind::Bool,
            Entry::Uint(_) => Kind::Uint,
            Entry::Int(_) => Kind::Int,
            Entry::F32(_) => Kind::F32,
            Entry::F64(_) => Kind::F64,
            Entry::Str { .. } => Kind::Str,
            Entry::Array { .. } => Kind::Array,
            Entry::Map { .. } => Kind::Map,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.entry(), Entry::Nil)
    }

    pub fn bool(&self) -> Result<bool> {
        match self.entry() {
            Entry::Bool(v) => Ok(v),
            _ => Err(self.mismatch(Kind::Bool)),
        }
    }

    int_readers! {
        u8 => u8, Kind::Uint;
        u16 => u16, Kind::Uint;
        u32 => u32, Kind::Uint;
        u64 => u64, Kind::Uint;
        i8 => i8, Kind::Int;
        i16 => i16, Kind::Int;
        i32 => i32, Kind::Int;
        i64 => i64, Kind::Int;
    }

    /// Reads the value as `f32`. Doubles are narrowed, integers converted.
    pub fn f32(&self) -> Result<f32> {
        match self.entry() {
            Entry::F32(v) => Ok(v),
            Entry::F64(v) => Ok(v as f32),
            Entry::Uint(v) => Ok(v as f32),
            Entry::Int(v) => Ok(v as f32),
            _ => Err(self.mismatch(Kind::F32)),
        }
    }

    /// Reads the value as `f64`. Floats are widened, integers converted.
    pub fn f64(&self) -> Result<f64> {
        match self.entry() {
            Entry::F64(v) => Ok(v),
            Entry::F32(v) => Ok(v as f64),
            Entry::Uint(v) => Ok(v as f64),
            Entry::Int(v) => Ok(v as f64),
            _ => Err(self.mismatch(Kind::F64)),
        }
    }

    /// Reads a string, validating UTF-8.
    pub fn str(&self) -> Result<&'t str> {
        match self.entry() {
            Entry::Str { start, len } => {
                std::str::from_utf8(&self.tree.bytes[start..start + len]).map_err(|_| Error::InvalidUtf8)
            }
            _ => Err(self.mismatch(Kind::Str)),
        }
    }

    /// Element count of an array, or entry count of a map.
    pub fn len(&self) -> Result<usize> {
        match self.entry() {
            Entry::Array { len, .. } | Entry::Map { len, .. } => Ok(len),
            _ => Err(self.mismatch(Kind::Array)),
        }
    }

    /// The `index`th element of an array.
    pub fn element(&self, index: usize) -> Result<Node<'t>> {
        match self.entry() {
            Entry::Array { first, len } if index < len => Ok(self.at(first + index)),
            Entry::Array { len, .. } => Err(Error::OutOfBounds { index, len }),
            _ => Err(self.mismatch(Kind::Array)),
        }
    }

    /// Looks up a string key in a map. The first matching entry wins.
    pub fn field(&self, key: &str) -> Result<Option<Node<'t>>> {
        for (k, v) in self.entries()? {
            if let Entry::Str { start, len } = k.entry() {
                if &self.tree.bytes[start..start + len] == key.as_bytes() {
                    return Ok(Some(v));
                }
            }
        }
        Ok(None)
    }

    /// True if this is a map holding `key`.
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.field(key), Ok(Some(_)))
    }

    /// Iterates the key/value entries of a map.
    pub fn entries(&self) -> Result<Entries<'t>> {
        match self.entry() {
            Entry::Map { first, len } => Ok(Entries { node: *self, next: first, end: first + len * 2 }),
            _ => Err(self.mismatch(Kind::Map)),
        }
    }

    /// Iterates the elements of an array.
    pub fn elements(&self) -> Result<Elements<'t>> {
        match self.entry() {
            Entry::Array { first, len } => Ok(Elements { node: *self, next: first, end: first + len }),
            _ => Err(self.mismatch(Kind::Array)),
        }
    }
}

/// Iterator over map entries, see [`Node::entries`].
pub struct Entries<'t> {
    node: Node<'t>,
    next: usize,
    end: usize,
}

impl<'t> Iterator for Entries<'t> {
    type Item = (Node<'t>, Node<'t>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let pair = (self.node.at(self.next), self.node.at(self.next + 1));
        self.next += 2;
        Some(pair)
    }
}

/// Iterator over array elements, see [`Node::elements`].
pub struct Elements<'t> {
    node: Node<'t>,
    next: usize,
    end: usize,
}

impl<'t> Iterator for Elements<'t> {
    type Item = Node<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let node = self.node.at(self.next);
        self.next += 1;
        Some(node)
    }
}
