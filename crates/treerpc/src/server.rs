//! # Server
//!
//! Answers requests arriving on a [`Channel`] by calling registered
//! functions. Each request gets at most one response, carrying the
//! request's id.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::{debug, trace, warn};
use treecode::{Decoder, Encode, Encoder, Tree};

use crate::channel::Channel;
use crate::config::{ServerConfig, UnknownMethod};
use crate::error::{CallError, Result};
use crate::handler::{Erased, Handler, Method};
use crate::message::{Envelope, MessageId, MessageKind, Response};

type Outcome = std::result::Result<Box<dyn Encode>, CallError>;

struct Inner {
    channel: Arc<dyn Channel>,
    methods: DashMap<String, Arc<dyn Method>>,
    config: ServerConfig,
}

/// Cheap to clone; clones share one method registry.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

impl Server {
    pub fn new(channel: Arc<dyn Channel>) -> Result<Self> {
        Self::with_config(channel, ServerConfig::default())
    }

    /// Installs the server as the channel's inbound handler. Requests that
    /// arrive before a method is registered are answered as unknown.
    pub fn with_config(channel: Arc<dyn Channel>, config: ServerConfig) -> Result<Self> {
        let inner = Arc::new(Inner {
            channel,
            methods: DashMap::new(),
            config,
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner.channel.on_incoming(Box::new(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.receive(message);
            }
        }))?;

        Ok(Self { inner })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Registers `handler` under `name`, replacing any earlier registration.
    ///
    /// ```ignore
    /// server.register("add", |a: i64, b: i64| Ok::<_, Infallible>(a + b));
    /// ```
    pub fn register<Args, H>(&self, name: impl Into<String>, handler: H)
    where
        H: Handler<Args>,
        Args: 'static,
    {
        let name = name.into();
        let method: Arc<dyn Method> = Arc::new(Erased::new(handler));
        debug!(method = %name, arity = method.arity(), "registering method");
        self.inner.methods.insert(name, method);
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.inner.methods.remove(name).is_some()
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.methods.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl Inner {
    fn receive(&self, message: Vec<u8>) {
        let tree = match Tree::parse(message) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(error = %e, "dropping unparsable message");
                return;
            }
        };

        // Without a readable id there is nobody to answer.
        let id = match Envelope::peek(&tree) {
            Ok((MessageKind::Request, id)) => id,
            Ok((MessageKind::Response, id)) => {
                trace!(id, "server ignoring inbound response");
                return;
            }
            Err(e) => {
                warn!(error = %e, "dropping message without a request header");
                return;
            }
        };

        let Some(outcome) = self.dispatch(id, &tree) else {
            return;
        };
        self.respond(id, &outcome);
    }

    /// Runs the request. `None` means no response is sent.
    fn dispatch(&self, id: MessageId, tree: &Tree) -> Option<Outcome> {
        let (name, params) = match Envelope::read(tree) {
            Ok(Envelope::Request { method, params, .. }) => (method, params),
            Ok(Envelope::Response { .. }) => return None,
            Err(e) => {
                debug!(id, error = %e, "malformed request");
                return Some(Err(CallError::MalformedRequest(e)));
            }
        };

        // Clone out so the registry is not locked while the handler runs.
        let method = self.methods.get(name).map(|entry| Arc::clone(entry.value()));
        let Some(method) = method else {
            return match self.config.unknown_method {
                UnknownMethod::Reply => {
                    debug!(id, method = name, "unknown method");
                    Some(Err(CallError::MethodNotFound(name.to_owned())))
                }
                UnknownMethod::Drop => {
                    debug!(id, method = name, "dropping request for unknown method");
                    None
                }
            };
        };

        let mut dec = Decoder::at(params);
        let mut args = match dec.array() {
            Ok(args) => args,
            Err(e) => return Some(Err(CallError::BadArguments(e))),
        };

        if args.count() != method.arity() {
            return Some(Err(CallError::BadArgumentCount {
                expected: method.arity(),
                got: args.count(),
            }));
        }

        debug!(id, method = name, "dispatching");
        if !self.config.catch_panics {
            return Some(method.invoke(&mut args));
        }

        match panic::catch_unwind(AssertUnwindSafe(|| method.invoke(&mut args))) {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                warn!(id, method = name, "handler panicked");
                Some(Err(CallError::Panicked))
            }
        }
    }

    fn respond(&self, id: MessageId, outcome: &Outcome) {
        let outcome = match outcome {
            Ok(result) => Ok(&**result),
            Err(error) => Err(error),
        };

        let message = match Encoder::encode(&Response { id, outcome }) {
            Ok(message) => message,
            Err(e) => {
                warn!(id, error = %e, "failed to encode result");
                let failure = CallError::Remote(format!("failed to encode result: {}", e));
                match Encoder::encode(&Response { id, outcome: Err(&failure) }) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(id, error = %e, "failed to encode error response");
                        return;
                    }
                }
            }
        };

        if let Err(e) = self.channel.send(message) {
            warn!(id, error = %e, "failed to send response");
        }
    }
}
