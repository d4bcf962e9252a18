//! Transport boundary of the control channel.
//!
//! The client does not implement a wire protocol. It needs a local receiver
//! that calls a handler once per inbound envelope, and a sender that delivers
//! envelopes to the controller endpoint. This module defines that boundary
//! and ships two in-process implementations: a mock for tests and a loopback
//! that routes requests to a [`Responder`].

use crate::discovery::Endpoint;
use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use pixsync_protocol::{Command, Envelope};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Called once per received envelope.
pub type InboundHandler = Arc<dyn Fn(Envelope) + Send + Sync>;

/// Sends envelopes to the controller.
pub trait EnvelopeSender: Send + Sync {
    /// Sends one envelope.
    fn send(&self, envelope: &Envelope) -> SyncResult<()>;
}

/// A bound local receiver.
pub trait Listener: Send {
    /// Stops delivering envelopes. Idempotent.
    fn close(&mut self);
}

/// Creates the receiving and sending halves of the control channel.
pub trait Transport: Send + 'static {
    /// Binds the local receiver on `local_port`.
    fn listen(
        &self,
        local_port: u16,
        buffer_size: usize,
        handler: InboundHandler,
    ) -> SyncResult<Box<dyn Listener>>;

    /// Creates a sender targeting `endpoint`.
    fn connect(&self, endpoint: &Endpoint, buffer_size: usize)
        -> SyncResult<Box<dyn EnvelopeSender>>;
}

#[derive(Default)]
struct MockInner {
    sent: Mutex<Vec<Envelope>>,
    handler: Mutex<Option<InboundHandler>>,
    listen_port: Mutex<Option<u16>>,
    endpoint: Mutex<Option<Endpoint>>,
    fail_listen: AtomicBool,
    fail_connect: AtomicBool,
    fail_send: AtomicBool,
}

/// A transport for testing. Records every send and lets the test inject
/// inbound envelopes.
///
/// Clones share state, so a test can keep one handle and give another to
/// the client.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `listen` fail.
    pub fn set_fail_listen(&self, fail: bool) {
        self.inner.fail_listen.store(fail, Ordering::SeqCst);
    }

    /// Makes `connect` fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.inner.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Makes every send fail.
    pub fn set_fail_send(&self, fail: bool) {
        self.inner.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Envelopes sent so far.
    pub fn sent(&self) -> Vec<Envelope> {
        self.inner.sent.lock().clone()
    }

    /// Commands of the envelopes sent so far, skipping unknown patterns.
    pub fn sent_commands(&self) -> Vec<Command> {
        self.inner
            .sent
            .lock()
            .iter()
            .filter_map(Envelope::command)
            .collect()
    }

    /// Port passed to `listen`, if it succeeded.
    pub fn listen_port(&self) -> Option<u16> {
        *self.inner.listen_port.lock()
    }

    /// Endpoint passed to `connect`, if it succeeded.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.inner.endpoint.lock().clone()
    }

    /// Returns true while a listener is open.
    pub fn is_listening(&self) -> bool {
        self.inner.handler.lock().is_some()
    }

    /// Delivers an envelope to the registered handler, on the calling thread.
    ///
    /// Returns false if nothing is listening.
    pub fn deliver(&self, envelope: Envelope) -> bool {
        let handler = self.inner.handler.lock().clone();
        match handler {
            Some(handler) => {
                handler(envelope);
                true
            }
            None => false,
        }
    }
}

struct MockListener {
    inner: Arc<MockInner>,
}

impl Listener for MockListener {
    fn close(&mut self) {
        self.inner.handler.lock().take();
    }
}

struct MockSender {
    inner: Arc<MockInner>,
}

impl EnvelopeSender for MockSender {
    fn send(&self, envelope: &Envelope) -> SyncResult<()> {
        if self.inner.fail_send.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("mock send failure".into()));
        }
        self.inner.sent.lock().push(envelope.clone());
        Ok(())
    }
}

impl Transport for MockTransport {
    fn listen(
        &self,
        local_port: u16,
        _buffer_size: usize,
        handler: InboundHandler,
    ) -> SyncResult<Box<dyn Listener>> {
        if self.inner.fail_listen.load(Ordering::SeqCst) {
            return Err(SyncError::Bind {
                port: local_port,
                message: "mock bind failure".into(),
            });
        }
        *self.inner.handler.lock() = Some(handler);
        *self.inner.listen_port.lock() = Some(local_port);
        Ok(Box::new(MockListener {
            inner: Arc::clone(&self.inner),
        }))
    }

    fn connect(
        &self,
        endpoint: &Endpoint,
        _buffer_size: usize,
    ) -> SyncResult<Box<dyn EnvelopeSender>> {
        if self.inner.fail_connect.load(Ordering::SeqCst) {
            return Err(SyncError::Connect {
                endpoint: endpoint.to_string(),
                message: "mock connect failure".into(),
            });
        }
        *self.inner.endpoint.lock() = Some(endpoint.clone());
        Ok(Box::new(MockSender {
            inner: Arc::clone(&self.inner),
        }))
    }
}

/// Answers requests routed through a [`LoopbackTransport`].
pub trait Responder: Send + Sync {
    /// Returns the envelopes sent back for `request`. May be empty.
    fn respond(&self, request: &Envelope) -> Vec<Envelope>;
}

/// How a [`LoopbackTransport`] hands replies to the inbound handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// On the sending thread, before `send` returns.
    Inline,
    /// On a dedicated delivery thread, like a socket reader would.
    #[default]
    Threaded,
}

enum Route {
    Inline(InboundHandler),
    Queue(mpsc::Sender<Envelope>),
}

/// A transport that routes each sent envelope to an in-process responder and
/// feeds its replies to the local receiver.
///
/// Replies to requests sent while nothing listens are dropped, as datagrams
/// to a closed port would be.
pub struct LoopbackTransport<R: Responder> {
    responder: Arc<R>,
    delivery: DeliveryMode,
    route: Arc<Mutex<Option<Route>>>,
}

impl<R: Responder + 'static> LoopbackTransport<R> {
    /// Creates a loopback transport with threaded delivery.
    pub fn new(responder: Arc<R>) -> Self {
        Self::with_delivery(responder, DeliveryMode::Threaded)
    }

    /// Creates a loopback transport with the given delivery mode.
    pub fn with_delivery(responder: Arc<R>, delivery: DeliveryMode) -> Self {
        Self {
            responder,
            delivery,
            route: Arc::new(Mutex::new(None)),
        }
    }

    /// The responder behind this transport.
    pub fn responder(&self) -> &Arc<R> {
        &self.responder
    }
}

struct LoopbackListener {
    route: Arc<Mutex<Option<Route>>>,
    delivery_thread: Option<JoinHandle<()>>,
}

impl Listener for LoopbackListener {
    fn close(&mut self) {
        // Dropping the queue sender ends the delivery thread.
        self.route.lock().take();
        if let Some(handle) = self.delivery_thread.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for LoopbackListener {
    fn drop(&mut self) {
        self.close();
    }
}

struct LoopbackSender<R: Responder> {
    responder: Arc<R>,
    route: Arc<Mutex<Option<Route>>>,
}

impl<R: Responder> EnvelopeSender for LoopbackSender<R> {
    fn send(&self, envelope: &Envelope) -> SyncResult<()> {
        let replies = self.responder.respond(envelope);
        debug!(pattern = %envelope.pattern, replies = replies.len(), "loopback request");

        for reply in replies {
            // The lock is released before an inline handler runs.
            let handler = match &*self.route.lock() {
                Some(Route::Queue(tx)) => {
                    let _ = tx.send(reply);
                    continue;
                }
                Some(Route::Inline(handler)) => Arc::clone(handler),
                None => continue,
            };
            handler(reply);
        }
        Ok(())
    }
}

impl<R: Responder + 'static> Transport for LoopbackTransport<R> {
    fn listen(
        &self,
        local_port: u16,
        _buffer_size: usize,
        handler: InboundHandler,
    ) -> SyncResult<Box<dyn Listener>> {
        let mut route = self.route.lock();
        if route.is_some() {
            return Err(SyncError::Bind {
                port: local_port,
                message: "address already in use".into(),
            });
        }

        let delivery_thread = match self.delivery {
            DeliveryMode::Inline => {
                *route = Some(Route::Inline(handler));
                None
            }
            DeliveryMode::Threaded => {
                let (tx, rx) = mpsc::channel::<Envelope>();
                let handle = thread::Builder::new()
                    .name("pixsync-loopback".into())
                    .spawn(move || {
                        while let Ok(envelope) = rx.recv() {
                            handler(envelope);
                        }
                    })
                    .map_err(|e| SyncError::Bind {
                        port: local_port,
                        message: e.to_string(),
                    })?;
                *route = Some(Route::Queue(tx));
                Some(handle)
            }
        };

        Ok(Box::new(LoopbackListener {
            route: Arc::clone(&self.route),
            delivery_thread,
        }))
    }

    fn connect(
        &self,
        _endpoint: &Endpoint,
        _buffer_size: usize,
    ) -> SyncResult<Box<dyn EnvelopeSender>> {
        Ok(Box::new(LoopbackSender {
            responder: Arc::clone(&self.responder),
            route: Arc::clone(&self.route),
        }))
    }
}
