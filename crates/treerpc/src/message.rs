//! Wire envelopes.
//!
//! Every message is a four-element array whose first two slots are the kind
//! and the message id:
//!
//! ```text
//! request:  [0, id, method, [params...]]
//! response: [1, id, error | nil, result | nil]
//! ```

use treecode::{ArrayDecoder, Decoder, Encode, Encoder, Kind, Node, Tree};

use crate::error::CallError;

/// Correlates a response with the request that caused it.
pub type MessageId = u32;

const ENVELOPE_LEN: usize = 4;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request = 0,
    Response = 1,
}

impl MessageKind {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Request),
            1 => Some(Self::Response),
            _ => None,
        }
    }
}

/// Outgoing request. Parameters are encoded in order, one element each.
pub struct Request<'a> {
    pub id: MessageId,
    pub method: &'a str,
    pub params: &'a [&'a dyn Encode],
}

impl Encode for Request<'_> {
    fn encode(&self, enc: &mut Encoder) -> treecode::Result<()> {
        let mut env = enc.array()?;
        env.u8(MessageKind::Request as u8)?;
        env.u32(self.id)?;
        env.str(self.method)?;
        let mut params = env.array()?;
        for param in self.params {
            params.encode(*param)?;
        }
        params.finish()?;
        env.finish()
    }
}

/// Outgoing response. Exactly one of the error and result slots is non-nil.
pub struct Response<'a> {
    pub id: MessageId,
    pub outcome: Result<&'a dyn Encode, &'a CallError>,
}

impl Encode for Response<'_> {
    fn encode(&self, enc: &mut Encoder) -> treecode::Result<()> {
        let mut env = enc.array()?;
        env.u8(MessageKind::Response as u8)?;
        env.u32(self.id)?;
        match self.outcome {
            Ok(result) => {
                env.nil()?;
                env.encode(result)?;
            }
            Err(error) => {
                env.encode(error)?;
                env.nil()?;
            }
        }
        env.finish()
    }
}

/// A decoded envelope borrowing from its tree.
#[derive(Debug, Clone, Copy)]
pub enum Envelope<'t> {
    Request {
        id: MessageId,
        method: &'t str,
        /// Always an array node.
        params: Node<'t>,
    },
    Response {
        id: MessageId,
        /// `None` when the error slot is nil.
        error: Option<Node<'t>>,
        result: Node<'t>,
    },
}

impl<'t> Envelope<'t> {
    /// Reads only the kind and id, so a malformed body can still be answered.
    pub fn peek(tree: &'t Tree) -> treecode::Result<(MessageKind, MessageId)> {
        let mut dec = Decoder::new(tree);
        let mut env = dec.array()?;
        Self::header(&mut env)
    }

    pub fn read(tree: &'t Tree) -> treecode::Result<Self> {
        let mut dec = Decoder::new(tree);
        let mut env = dec.array()?;
        let (kind, id) = Self::header(&mut env)?;
        match kind {
            MessageKind::Request => {
                let method = env.str()?;
                let params = env.node()?;
                if params.kind() != Kind::Array {
                    return Err(treecode::Error::invalid(format!(
                        "request params must be an array, found {:?}",
                        params.kind()
                    )));
                }
                Ok(Envelope::Request { id, method, params })
            }
            MessageKind::Response => {
                let error = env.node()?;
                let result = env.node()?;
                let error = if error.is_nil() { None } else { Some(error) };
                Ok(Envelope::Response { id, error, result })
            }
        }
    }

    pub fn id(&self) -> MessageId {
        match self {
            Envelope::Request { id, .. } | Envelope::Response { id, .. } => *id,
        }
    }

    fn header(env: &mut ArrayDecoder<'_, 't>) -> treecode::Result<(MessageKind, MessageId)> {
        if env.count() != ENVELOPE_LEN {
            return Err(treecode::Error::invalid(format!(
                "envelope has {} elements, expected {}",
                env.count(),
                ENVELOPE_LEN
            )));
        }
        let kind = env.u8()?;
        let kind = MessageKind::from_u8(kind)
            .ok_or_else(|| treecode::Error::invalid(format!("unknown message kind {}", kind)))?;
        let id = env.u32()?;
        Ok((kind, id))
    }
}
