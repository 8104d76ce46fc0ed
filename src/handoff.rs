//! The connection between two adjacent pipeline stages.
//!
//! A stage only ever sees one end of a handoff, through the `HandoffSender` or `HandoffReceiver`
//! traits, so the same stage code runs over either implementation:
//!
//!   * `ChannelHandoff` - a bounded crossbeam channel. Sends block while the channel is full
//!     (with the default capacity of zero, until the receiver takes the chunk) and receives block
//!     while it is empty.
//!   * `QueueHandoff` - an unbounded `SharedQueue`. Sends never block. The receiver waits for
//!     chunks according to a `WaitStrategy`.
//!
//! Closing is done by dropping (or calling `close` on) the sender. Dropping the receiver
//! disconnects it, so that a producer doesn't block forever on a consumer that has stopped.

use std::{fmt, sync::{Arc, atomic::{AtomicBool, Ordering}}};

use crossbeam::channel::select;

use crate::{cancel::CancelToken, chunk::Chunk, shared_queue::{self, QueueReceiver, QueueSender, WaitStrategy}};

/// Outcome of waiting for the next item from a handoff.
#[derive(Debug, PartialEq, Eq)]
pub enum Received<T> {
    Item(T),
    /// The sender has closed and everything it sent has been received.
    Closed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end has been dropped, so nobody will ever take the chunk.
    Disconnected,
    Cancelled,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Disconnected => write!(f, "receiver disconnected"),
            SendError::Cancelled => write!(f, "cancelled"),
        }
    }
}

pub trait HandoffSender: Send + 'static {
    /// Passes the chunk on to the receiver, blocking if the handoff can't take it yet.
    fn send(&self, chunk: Chunk, cancel: &CancelToken) -> Result<(), SendError>;

    /// Signals that nothing more will be sent. Equivalent to dropping the sender.
    fn close(self) where Self: Sized {
        drop(self)
    }
}

pub trait HandoffReceiver: Send + 'static {
    /// Waits for the next chunk, or until the sender has closed and everything has been received.
    fn recv(&self, cancel: &CancelToken) -> Received<Chunk>;

    /// True once the sender has closed, even if there are still chunks waiting to be received.
    fn is_closed(&self) -> bool;

    fn is_closed_and_empty(&self) -> bool;
}

/// Something that can create a connected sender/receiver pair.
pub trait Handoff {
    type Sender: HandoffSender;
    type Receiver: HandoffReceiver;

    fn open(&self) -> (Self::Sender, Self::Receiver);
}

/// Handoff over a bounded crossbeam channel.
#[derive(Clone, Copy, Debug)]
pub struct ChannelHandoff {
    /// Zero makes a rendezvous channel, where every send waits for the matching receive.
    pub capacity: usize,
}

pub struct ChannelSender {
    inner: crossbeam::channel::Sender<Chunk>,
    closed: Arc<AtomicBool>,
}

pub struct ChannelReceiver {
    inner: crossbeam::channel::Receiver<Chunk>,
    closed: Arc<AtomicBool>,
}

impl Handoff for ChannelHandoff {
    type Sender = ChannelSender;
    type Receiver = ChannelReceiver;

    fn open(&self) -> (ChannelSender, ChannelReceiver) {
        let (s, r) = crossbeam::channel::bounded(self.capacity);
        // crossbeam doesn't let the receiver ask whether the sender is gone without trying to
        // receive, so we track that ourselves.
        let closed = Arc::new(AtomicBool::new(false));
        (
            ChannelSender { inner: s, closed: closed.clone() },
            ChannelReceiver { inner: r, closed },
        )
    }
}

impl HandoffSender for ChannelSender {
    fn send(&self, chunk: Chunk, cancel: &CancelToken) -> Result<(), SendError> {
        if cancel.is_cancelled() {
            return Err(SendError::Cancelled);
        }
        select! {
            send(self.inner, chunk) -> r => r.map_err(|_| SendError::Disconnected),
            recv(cancel.signal()) -> _ => Err(SendError::Cancelled),
        }
    }
}

impl Drop for ChannelSender {
    fn drop(&mut self) {
        // No more sends can happen once we're being dropped, so it's fine that the crossbeam
        // Sender itself is only dropped after this.
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl HandoffReceiver for ChannelReceiver {
    fn recv(&self, cancel: &CancelToken) -> Received<Chunk> {
        if cancel.is_cancelled() {
            return Received::Cancelled;
        }
        select! {
            recv(self.inner) -> r => match r {
                Ok(c) => Received::Item(c),
                Err(_) => Received::Closed,
            },
            recv(cancel.signal()) -> _ => Received::Cancelled,
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn is_closed_and_empty(&self) -> bool {
        self.is_closed() && self.inner.is_empty()
    }
}

/// Handoff over an unbounded, lock-protected `SharedQueue`.
#[derive(Clone, Copy, Debug)]
pub struct QueueHandoff {
    pub wait: WaitStrategy,
}

impl Handoff for QueueHandoff {
    type Sender = QueueSender<Chunk>;
    type Receiver = QueueReceiver<Chunk>;

    fn open(&self) -> (QueueSender<Chunk>, QueueReceiver<Chunk>) {
        shared_queue::new(self.wait)
    }
}

impl HandoffSender for QueueSender<Chunk> {
    fn send(&self, chunk: Chunk, cancel: &CancelToken) -> Result<(), SendError> {
        if cancel.is_cancelled() {
            return Err(SendError::Cancelled);
        }
        QueueSender::send(self, chunk).map_err(|_| SendError::Disconnected)
    }
}

impl HandoffReceiver for QueueReceiver<Chunk> {
    fn recv(&self, cancel: &CancelToken) -> Received<Chunk> {
        QueueReceiver::recv(self, cancel)
    }

    fn is_closed(&self) -> bool {
        QueueReceiver::is_closed(self)
    }

    fn is_closed_and_empty(&self) -> bool {
        QueueReceiver::is_closed_and_empty(self)
    }
}
