//! # Treerpc
//!
//! Request/response calls between two endpoints joined by a [`Channel`].
//!
//! A [`Client`] encodes a method name and its arguments into a request
//! envelope, tags it with a fresh [`MessageId`], and waits for the response
//! envelope carrying the same id. A [`Server`] decodes the request, finds the
//! registered [`Handler`], checks the argument count, calls it, and sends the
//! result or error back.
//!
//! Calls come in three shapes: blocking ([`Client::call`]), callback
//! ([`Client::call_with`]) and suspending ([`Client::call_async`]). All
//! three share one pending table, so each call completes exactly once and a
//! stray or duplicate response is dropped.
//!
//! ```ignore
//! let (a, b) = MemoryChannel::pair();
//! let server = Server::new(Arc::new(b))?;
//! server.register("add", |x: i64, y: i64| Ok::<_, Infallible>(x + y));
//!
//! let client = Client::new(Arc::new(a))?;
//! let sum: i64 = client.call("add", &[&2i64, &3i64])?;
//! ```

pub mod channel;
mod client;
mod config;
mod error;
mod handler;
mod message;
mod server;


pub use channel::Channel;
pub use channel::MemoryChannel;
pub use client::Client;
pub use config::ClientConfig;
pub use config::ServerConfig;
pub use config::UnknownMethod;
pub use config::DEFAULT_TIMEOUT;
pub use error::CallError;
pub use error::Error;
pub use error::Result;
pub use handler::Handler;
pub use message::Envelope;
pub use message::MessageId;
pub use message::MessageKind;
pub use message::Request;
pub use message::Response;
pub use server::Server;
