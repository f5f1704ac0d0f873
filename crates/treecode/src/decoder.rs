use treepack::Kind;
use treepack::Node;
use treepack::Tree;

use crate::error::Corruption;
use crate::error::Path;
use crate::error::Segment;
use crate::macros::array_decoder_scalar;
use crate::macros::for_each_scalar;
use crate::macros::map_decoder_scalar;
use crate::macros::value_decoder_scalar;
use crate::Decode;
use crate::Error;
use crate::Result;

/// How a stacked node was reached from its parent.
#[derive(Clone, Copy)]
enum Step<'t> {
    Key(&'t str),
    Index(usize),
}

impl Step<'_> {
    fn segment(self) -> Segment {
        match self {
            Step::Key(key) => Segment::Key(key.to_owned()),
            Step::Index(index) => Segment::Index(index),
        }
    }
}

#[derive(Clone, Copy)]
struct Position<'t> {
    node: Node<'t>,
    /// `None` for a view re-entering the node below it.
    step: Option<Step<'t>>,
}

/// Walks a parsed [`Tree`] on behalf of [`Decode`] implementations.
///
/// Holds a stack of current nodes. Views push the node they navigate and
/// pop it when dropped; the bottom entry is never popped.
pub struct Decoder<'t> {
    stack: Vec<Position<'t>>,
}

impl<'t> Decoder<'t> {
    /// A decoder positioned at the root of `tree`.
    pub fn new(tree: &'t Tree) -> Self {
        Self::at(tree.root())
    }

    /// A decoder positioned at `node`.
    pub fn at(node: Node<'t>) -> Self {
        Self { stack: vec![Position { node, step: None }] }
    }

    /// Parses `bytes` and decodes a `T` from the root.
    pub fn decode<T: Decode>(bytes: impl Into<Vec<u8>>) -> Result<T> {
        let tree = Tree::parse(bytes).map_err(Error::Parse)?;
        Self::decode_node(tree.root())
    }

    /// Decodes a `T` from `node`.
    pub fn decode_node<T: Decode>(node: Node<'_>) -> Result<T> {
        let mut dec = Decoder::at(node);
        T::decode(&mut dec)
    }

    /// The current node.
    pub fn node(&self) -> Node<'t> {
        self.stack[self.stack.len() - 1].node
    }

    /// Stack height; 1 when no view is open.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Keys and indices leading from the starting node to the current node.
    pub fn coding_path(&self) -> Path {
        Path(self.stack.iter().filter_map(|p| p.step).map(Step::segment).collect())
    }

    /// Keyed view over the current node.
    pub fn map(&mut self) -> Result<MapDecoder<'_, 't>> {
        let node = self.node();
        MapDecoder::enter(self, node, None)
    }

    /// Ordered view over the current node.
    pub fn array(&mut self) -> Result<ArrayDecoder<'_, 't>> {
        let node = self.node();
        ArrayDecoder::enter(self, node, None)
    }

    /// Single-value view over the current node.
    pub fn value(&mut self) -> ValueDecoder<'_, 't> {
        let node = self.node();
        ValueDecoder { dec: self, node }
    }

    fn corrupted(&self, last: Option<Segment>, cause: Corruption) -> Error {
        let mut path = self.coding_path();
        path.0.extend(last);
        Error::DataCorrupted { path, cause }
    }

    /// Pushes `node`, decodes a `T` there, and pops.
    fn descend<T: Decode>(&mut self, node: Node<'t>, step: Step<'t>) -> Result<T> {
        let frame = Frame::push(self, node, Some(step));
        T::decode(&mut *frame.dec)
    }
}

/// Scoped stack entry. Pops on drop.
struct Frame<'d, 't> {
    dec: &'d mut Decoder<'t>,
}

impl<'d, 't> Frame<'d, 't> {
    fn push(dec: &'d mut Decoder<'t>, node: Node<'t>, step: Option<Step<'t>>) -> Self {
        dec.stack.push(Position { node, step });
        Self { dec }
    }
}

impl Drop for Frame<'_, '_> {
    fn drop(&mut self) {
        self.dec.stack.pop();
    }
}

/// Single-value view over the decoder's current node.
pub struct ValueDecoder<'d, 't> {
    dec: &'d mut Decoder<'t>,
    node: Node<'t>,
}

impl<'d, 't> ValueDecoder<'d, 't> {
    for_each_scalar!(value_decoder_scalar);

    pub fn kind(&self) -> Kind {
        self.node.kind()
    }

    pub fn is_nil(&self) -> bool {
        self.node.is_nil()
    }

    pub fn node(&self) -> Node<'t> {
        self.node
    }

    pub fn str(&self) -> Result<&'t str> {
        self.node.str().map_err(|e| self.dec.corrupted(None, e.into()))
    }

    pub fn string(&self) -> Result<String> {
        self.str().map(str::to_owned)
    }

    /// Natural-width signed integer.
    pub fn int(&self) -> Result<isize> {
        let v = self.i64()?;
        isize::try_from(v).map_err(|_| self.dec.corrupted(None, treepack::Error::OutOfRange("isize").into()))
    }

    /// Natural-width unsigned integer.
    pub fn uint(&self) -> Result<usize> {
        let v = self.u64()?;
        usize::try_from(v).map_err(|_| self.dec.corrupted(None, treepack::Error::OutOfRange("usize").into()))
    }

    /// Decodes a `T` from the same node.
    pub fn decode<T: Decode>(self) -> Result<T> {
        T::decode(self.dec)
    }
}

/// Keyed view. Holds its map node on the stack while alive.
pub struct MapDecoder<'d, 't> {
    frame: Frame<'d, 't>,
    node: Node<'t>,
}

impl<'d, 't> MapDecoder<'d, 't> {
    for_each_scalar!(map_decoder_scalar);

    fn enter(dec: &'d mut Decoder<'t>, node: Node<'t>, step: Option<Step<'t>>) -> Result<Self> {
        if node.kind() != Kind::Map {
            let cause = treepack::Error::TypeMismatch { expected: Kind::Map, found: node.kind() };
            return Err(dec.corrupted(step.map(Step::segment), cause.into()));
        }
        Ok(Self { frame: Frame::push(dec, node, step), node })
    }

    fn corrupted(&self, key: &str, cause: Corruption) -> Error {
        self.frame.dec.corrupted(Some(Segment::Key(key.to_owned())), cause)
    }

    /// Finds `key`, returning the stored key (borrowed from the tree) and its value.
    fn lookup(&self, key: &str) -> Option<(&'t str, Node<'t>)> {
        self.node
            .entries()
            .ok()?
            .find_map(|(k, v)| k.str().ok().filter(|stored| *stored == key).map(|stored| (stored, v)))
    }

    fn entry(&self, key: &str) -> Result<(&'t str, Node<'t>)> {
        self.lookup(key).ok_or_else(|| self.corrupted(key, Corruption::Missing))
    }

    fn child(&self, key: &str) -> Result<Node<'t>> {
        self.entry(key).map(|(_, node)| node)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.node.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// True if `key` holds nil. A missing key is an error.
    pub fn is_nil(&self, key: &str) -> Result<bool> {
        Ok(self.child(key)?.is_nil())
    }

    /// Entry keys in stored order.
    pub fn keys(&self) -> Result<Vec<&'t str>> {
        self.entries().map(|entries| entries.into_iter().map(|(k, _)| k).collect())
    }

    /// Entries in stored order. Every key must be a string.
    pub fn entries(&self) -> Result<Vec<(&'t str, Node<'t>)>> {
        let iter = self.node.entries().map_err(|e| self.frame.dec.corrupted(None, e.into()))?;
        iter.map(|(k, v)| match k.str() {
            Ok(key) => Ok((key, v)),
            Err(e) => Err(self.frame.dec.corrupted(None, e.into())),
        })
        .collect()
    }

    pub fn node(&self, key: &str) -> Result<Node<'t>> {
        self.child(key)
    }

    pub fn str(&self, key: &str) -> Result<&'t str> {
        self.child(key)?.str().map_err(|e| self.corrupted(key, e.into()))
    }

    pub fn string(&self, key: &str) -> Result<String> {
        self.str(key).map(str::to_owned)
    }

    pub fn int(&mut self, key: &str) -> Result<isize> {
        self.decode(key)
    }

    pub fn uint(&mut self, key: &str) -> Result<usize> {
        self.decode(key)
    }

    /// Decodes the value under `key`.
    pub fn decode<T: Decode>(&mut self, key: &str) -> Result<T> {
        let (stored, child) = self.entry(key)?;
        self.decode_value(stored, child)
    }

    /// Decodes the value under `key`; absent or nil yields `None`.
    pub fn decode_opt<T: Decode>(&mut self, key: &str) -> Result<Option<T>> {
        match self.lookup(key) {
            Some((stored, node)) if !node.is_nil() => self.decode_value(stored, node).map(Some),
            _ => Ok(None),
        }
    }

    /// Decodes an entry obtained from [`MapDecoder::entries`].
    pub fn decode_value<T: Decode>(&mut self, key: &'t str, value: Node<'t>) -> Result<T> {
        self.frame.dec.descend(value, Step::Key(key))
    }

    /// Keyed view over the map under `key`.
    pub fn map(&mut self, key: &str) -> Result<MapDecoder<'_, 't>> {
        let (stored, child) = self.entry(key)?;
        MapDecoder::enter(&mut *self.frame.dec, child, Some(Step::Key(stored)))
    }

    /// Ordered view over the array under `key`.
    pub fn array(&mut self, key: &str) -> Result<ArrayDecoder<'_, 't>> {
        let (stored, child) = self.entry(key)?;
        ArrayDecoder::enter(&mut *self.frame.dec, child, Some(Step::Key(stored)))
    }

    /// The shared decoder, positioned at this map.
    pub fn super_decoder(&mut self) -> &mut Decoder<'t> {
        &mut *self.frame.dec
    }
}

/// Ordered view with a read cursor. Holds its array node on the stack while alive.
pub struct ArrayDecoder<'d, 't> {
    frame: Frame<'d, 't>,
    node: Node<'t>,
    count: usize,
    index: usize,
}

impl<'d, 't> ArrayDecoder<'d, 't> {
    for_each_scalar!(array_decoder_scalar);

    fn enter(dec: &'d mut Decoder<'t>, node: Node<'t>, step: Option<Step<'t>>) -> Result<Self> {
        if node.kind() != Kind::Array {
            let cause = treepack::Error::TypeMismatch { expected: Kind::Array, found: node.kind() };
            return Err(dec.corrupted(step.map(Step::segment), cause.into()));
        }
        // Read once; the tree is immutable while the view is alive.
        let count = node.len().map_err(|e| dec.corrupted(step.map(Step::segment), e.into()))?;
        Ok(Self { frame: Frame::push(dec, node, step), node, count, index: 0 })
    }

    fn corrupted(&self, cause: Corruption) -> Error {
        self.frame.dec.corrupted(Some(Segment::Index(self.index)), cause)
    }

    /// The element under the cursor, without advancing.
    fn peek(&self) -> Result<Node<'t>> {
        if self.index >= self.count {
            let cause = treepack::Error::OutOfBounds { index: self.index, len: self.count };
            return Err(self.corrupted(cause.into()));
        }
        self.node.element(self.index).map_err(|e| self.corrupted(e.into()))
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Zero-based read cursor.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_at_end(&self) -> bool {
        self.index >= self.count
    }

    /// True, and advances past it, if the element under the cursor is nil.
    pub fn is_nil(&mut self) -> Result<bool> {
        let nil = self.peek()?.is_nil();
        if nil {
            self.index += 1;
        }
        Ok(nil)
    }

    /// The element under the cursor as a raw node; advances.
    pub fn node(&mut self) -> Result<Node<'t>> {
        let node = self.peek()?;
        self.index += 1;
        Ok(node)
    }

    pub fn str(&mut self) -> Result<&'t str> {
        let v = self.peek()?.str().map_err(|e| self.corrupted(e.into()))?;
        self.index += 1;
        Ok(v)
    }

    pub fn string(&mut self) -> Result<String> {
        self.str().map(str::to_owned)
    }

    pub fn int(&mut self) -> Result<isize> {
        self.decode()
    }

    pub fn uint(&mut self) -> Result<usize> {
        self.decode()
    }

    /// Decodes the element under the cursor; advances on success.
    pub fn decode<T: Decode>(&mut self) -> Result<T> {
        let node = self.peek()?;
        let v = self.frame.dec.descend(node, Step::Index(self.index))?;
        self.index += 1;
        Ok(v)
    }

    /// Keyed view over the element under the cursor; advances.
    pub fn map(&mut self) -> Result<MapDecoder<'_, 't>> {
        let node = self.peek()?;
        let index = self.index;
        self.index += 1;
        MapDecoder::enter(&mut *self.frame.dec, node, Some(Step::Index(index)))
    }

    /// Ordered view over the element under the cursor; advances.
    pub fn array(&mut self) -> Result<ArrayDecoder<'_, 't>> {
        let node = self.peek()?;
        let index = self.index;
        self.index += 1;
        ArrayDecoder::enter(&mut *self.frame.dec, node, Some(Step::Index(index)))
    }

    /// The shared decoder, positioned at this array.
    pub fn super_decoder(&mut self) -> &mut Decoder<'t> {
        &mut *self.frame.dec
    }
}
