//! # Client
//!
//! Issues requests over a [`Channel`] and routes each response to the call
//! that is waiting for it.
//!
//! Every outstanding call owns one entry in the pending table, keyed by a
//! random [`MessageId`] that is unique among outstanding calls. The entry
//! holds a one-shot continuation. Whoever removes the entry runs it: the
//! inbound handler on a response, `cancel`, `shutdown`, or nobody at all
//! when the caller gives up on a timeout. Removal happens exactly once, so
//! each call completes at most once and duplicate or late responses find
//! nothing and are dropped.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};
use treecode::{Decode, Decoder, Encode, Encoder, Node, Tree};

use crate::channel::Channel;
use crate::config::ClientConfig;
use crate::error::{CallError, Error, Result};
use crate::message::{Envelope, MessageId, Request};

/// What a continuation receives: the result node of a successful reply, or
/// the reason the call ended without one.
pub(crate) type Reply<'t> = std::result::Result<Node<'t>, Error>;

type Continuation = Box<dyn for<'t> FnOnce(Reply<'t>) + Send>;

fn continuation<F>(f: F) -> Continuation
where
    F: for<'t> FnOnce(Reply<'t>) + Send + 'static,
{
    Box::new(f)
}

struct Pending {
    /// Distinguishes this call from a later one that reuses the same id.
    ticket: u64,
    /// Never locked; taken by value once the entry is removed.
    resume: Mutex<Continuation>,
}

impl Pending {
    fn new(ticket: u64, resume: Continuation) -> Self {
        Self {
            ticket,
            resume: Mutex::new(resume),
        }
    }

    fn resume(self, reply: Reply<'_>) {
        let resume = self.resume.into_inner().unwrap_or_else(PoisonError::into_inner);
        resume(reply);
    }
}

struct Inner {
    channel: Arc<dyn Channel>,
    pending: DashMap<MessageId, Pending>,
    tickets: AtomicU64,
    closed: AtomicBool,
    config: ClientConfig,
}

/// Cheap to clone; clones share one pending table.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    pub fn new(channel: Arc<dyn Channel>) -> Result<Self> {
        Self::with_config(channel, ClientConfig::default())
    }

    /// Installs the client as the channel's inbound handler.
    pub fn with_config(channel: Arc<dyn Channel>, config: ClientConfig) -> Result<Self> {
        let inner = Arc::new(Inner {
            channel,
            pending: DashMap::new(),
            tickets: AtomicU64::new(0),
            closed: AtomicBool::new(false),
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

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Calls `method` and blocks the current thread until the reply arrives
    /// or the configured timeout elapses.
    ///
    /// Must not be called from the thread that delivers this client's
    /// inbound messages.
    pub fn call<R>(&self, method: &str, args: &[&dyn Encode]) -> Result<R>
    where
        R: Decode + Send + 'static,
    {
        self.call_timeout(method, args, self.inner.config.timeout)
    }

    /// Like [`Client::call`] with an explicit bound. `None` waits forever.
    pub fn call_timeout<R>(&self, method: &str, args: &[&dyn Encode], timeout: Option<Duration>) -> Result<R>
    where
        R: Decode + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let (id, ticket) = self.issue(
            method,
            args,
            continuation(move |reply| {
                let _ = tx.send(resolve::<R>(reply));
            }),
        )?;

        let received = match timeout {
            Some(limit) => rx.recv_timeout(limit).map_err(|e| match e {
                RecvTimeoutError::Timeout => Error::Timeout,
                RecvTimeoutError::Disconnected => Error::Closed,
            }),
            None => rx.recv().map_err(|_| Error::Closed),
        };

        match received {
            Ok(result) => result,
            Err(e) => {
                debug!(id, method, error = %e, "abandoning call");
                self.inner.abandon(id, ticket);
                Err(e)
            }
        }
    }

    /// Calls `method` and returns immediately. `callback` runs exactly once,
    /// on the inbound delivery context, when the reply arrives or the call is
    /// cancelled or the client shuts down.
    pub fn call_with<R, F>(&self, method: &str, args: &[&dyn Encode], callback: F) -> Result<MessageId>
    where
        R: Decode + 'static,
        F: FnOnce(Result<R>) + Send + 'static,
    {
        let (id, _) = self.issue(
            method,
            args,
            continuation(move |reply| callback(resolve::<R>(reply))),
        )?;
        Ok(id)
    }

    /// Calls `method` and returns a future that resolves with the reply.
    ///
    /// The request is sent before this returns. Dropping the future before
    /// it resolves, or letting it time out, removes the pending entry.
    pub fn call_async<R>(&self, method: &str, args: &[&dyn Encode]) -> impl Future<Output = Result<R>> + Send + 'static
    where
        R: Decode + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        // Armed before the future exists, so dropping it unpolled still cleans up.
        let issued = self
            .issue(
                method,
                args,
                continuation(move |reply| {
                    let _ = tx.send(resolve::<R>(reply));
                }),
            )
            .map(|(id, ticket)| Abandon {
                inner: Arc::downgrade(&self.inner),
                id,
                ticket,
                armed: true,
            });
        let timeout = self.inner.config.timeout;

        async move {
            let mut guard = issued?;

            let received = match timeout {
                Some(limit) => tokio::time::timeout(limit, rx).await.map_err(|_| Error::Timeout)?,
                None => rx.await,
            };

            guard.armed = false;
            received.map_err(|_| Error::Closed)?
        }
    }

    /// Completes the call with [`Error::Cancelled`]. Returns false if it was
    /// no longer pending. A later response for `id` is dropped.
    pub fn cancel(&self, id: MessageId) -> bool {
        match self.inner.pending.remove(&id) {
            Some((_, pending)) => {
                self.inner.resume(id, pending, Err(Error::Cancelled));
                true
            }
            None => false,
        }
    }

    /// Number of calls waiting for a response.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.len()
    }

    /// Fails every pending call with [`Error::Closed`] and refuses new ones.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.fail_all();
    }

    /// Reserves an id, sends the request, and leaves `resume` pending.
    fn issue(&self, method: &str, args: &[&dyn Encode], resume: Continuation) -> Result<(MessageId, u64)> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        let ticket = inner.tickets.fetch_add(1, Ordering::Relaxed);
        let id = reserve(&inner.pending, Pending::new(ticket, resume), rand::random);
        // A shutdown racing the insert may have missed this entry. If it did
        // not, the continuation has already run with the failure.
        if inner.closed.load(Ordering::SeqCst) && inner.abandon(id, ticket) {
            return Err(Error::Closed);
        }

        let message = match Encoder::encode(&Request { id, method, params: args }) {
            Ok(message) => message,
            Err(e) => {
                inner.abandon(id, ticket);
                return Err(Error::Encode(e));
            }
        };

        debug!(id, method, len = message.len(), "sending request");
        if let Err(e) = inner.channel.send(message) {
            inner.abandon(id, ticket);
            return Err(Error::Channel(e));
        }

        Ok((id, ticket))
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

        let (id, error, result) = match Envelope::read(&tree) {
            Ok(Envelope::Response { id, error, result }) => (id, error, result),
            Ok(Envelope::Request { id, method, .. }) => {
                trace!(id, method, "client ignoring inbound request");
                return;
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed envelope");
                return;
            }
        };

        let Some((_, pending)) = self.pending.remove(&id) else {
            // Duplicate, late, or cancelled.
            debug!(id, "dropping response with no pending call");
            return;
        };

        let reply = match error {
            Some(error) => Err(Error::Call(CallError::Remote(describe(error)))),
            None => Ok(result),
        };
        self.resume(id, pending, reply);
    }

    /// Runs a removed entry's continuation. A panicking callback must not
    /// take the delivery thread down with it.
    fn resume(&self, id: MessageId, pending: Pending, reply: Reply<'_>) {
        if panic::catch_unwind(AssertUnwindSafe(|| pending.resume(reply))).is_err() {
            warn!(id, "call continuation panicked");
        }
    }

    /// Removes the entry only if it still belongs to the call holding `ticket`.
    fn abandon(&self, id: MessageId, ticket: u64) -> bool {
        self.pending.remove_if(&id, |_, pending| pending.ticket == ticket).is_some()
    }

    fn fail_all(&self) {
        let ids: Vec<MessageId> = self.pending.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, pending)) = self.pending.remove(&id) {
                self.resume(id, pending, Err(Error::Closed));
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.fail_all();
    }
}

/// Removes the pending entry if a suspended call is dropped or times out.
/// Holds the client weakly so a suspended call does not keep it alive.
struct Abandon {
    inner: Weak<Inner>,
    id: MessageId,
    ticket: u64,
    armed: bool,
}

impl Drop for Abandon {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            debug!(id = self.id, "abandoning suspended call");
            inner.abandon(self.id, self.ticket);
        }
    }
}

/// Inserts `value` under the first id drawn from `draw` that is not already
/// outstanding.
pub(crate) fn reserve<V>(table: &DashMap<MessageId, V>, value: V, mut draw: impl FnMut() -> MessageId) -> MessageId {
    loop {
        let id = draw();
        if let Entry::Vacant(slot) = table.entry(id) {
            slot.insert(value);
            return id;
        }
        trace!(id, "message id collision, redrawing");
    }
}

fn resolve<R: Decode>(reply: Reply<'_>) -> Result<R> {
    let node = reply?;
    Decoder::decode_node(node).map_err(|e| Error::Call(CallError::MalformedReply(e)))
}

fn describe(error: Node<'_>) -> String {
    match error.str() {
        Ok(msg) => msg.to_owned(),
        Err(_) => "remote call failed".to_owned(),
    }
}
