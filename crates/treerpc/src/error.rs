use std::fmt;

use treecode::{Encode, Encoder};

use crate::channel;

/// Why a call failed on the far side, or why its reply could not be used.
///
/// Travels as a single string in the error slot of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum CallError {
    /// The handler returned an error; carries its description.
    Remote(String),
    MethodNotFound(String),
    BadArgumentCount { expected: usize, got: usize },
    BadArguments(treecode::Error),
    MalformedRequest(treecode::Error),
    /// The reply arrived but its result did not decode as the expected type.
    MalformedReply(treecode::Error),
    Panicked,
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Remote(msg) => write!(f, "{}", msg),
            CallError::MethodNotFound(name) => write!(f, "method not found: {}", name),
            CallError::BadArgumentCount { expected, got } => {
                write!(f, "expected {} arguments, got {}", expected, got)
            }
            CallError::BadArguments(e) => write!(f, "bad arguments: {}", e),
            CallError::MalformedRequest(e) => write!(f, "malformed request: {}", e),
            CallError::MalformedReply(e) => write!(f, "malformed reply: {}", e),
            CallError::Panicked => write!(f, "handler panicked"),
        }
    }
}

impl std::error::Error for CallError {}

impl Encode for CallError {
    fn encode(&self, enc: &mut Encoder) -> treecode::Result<()> {
        enc.value().str(&self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Arguments could not be encoded into a request.
    Encode(treecode::Error),
    Channel(channel::Error),
    Call(CallError),
    Timeout,
    Cancelled,
    /// The client shut down, or was dropped, before the reply arrived.
    Closed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Encode(e) => write!(f, "Encode error: {}", e),
            Error::Channel(e) => write!(f, "Channel error: {}", e),
            Error::Call(e) => write!(f, "Call failed: {}", e),
            Error::Timeout => write!(f, "Call timed out"),
            Error::Cancelled => write!(f, "Call cancelled"),
            Error::Closed => write!(f, "Client closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Encode(e) => Some(e),
            Error::Channel(e) => Some(e),
            Error::Call(e) => Some(e),
            _ => None,
        }
    }
}

impl From<channel::Error> for Error {
    fn from(e: channel::Error) -> Self {
        Error::Channel(e)
    }
}

impl From<CallError> for Error {
    fn from(e: CallError) -> Self {
        Error::Call(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
