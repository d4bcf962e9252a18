//! Observer fan-out for pushed state.
//!
//! Notifications are delivered synchronously, in subscription order, to the
//! observers subscribed when the notification started. An observer that
//! fails (by error or panic) is logged and keeps its subscription; delivery
//! continues with the next one.

use crate::error::ObserverError;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use tracing::warn;

/// Receives notifications of type `T`.
pub trait Observer<T>: Send + Sync {
    /// Handles one notification.
    fn notify(&self, value: &T) -> Result<(), ObserverError>;
}

struct FnObserver<F>(F);

impl<T, F> Observer<T> for FnObserver<F>
where
    F: Fn(&T) -> Result<(), ObserverError> + Send + Sync,
{
    fn notify(&self, value: &T) -> Result<(), ObserverError> {
        (self.0)(value)
    }
}

struct ChannelObserver<T>(Sender<T>);

impl<T: Clone + Send> Observer<T> for ChannelObserver<T> {
    fn notify(&self, value: &T) -> Result<(), ObserverError> {
        self.0
            .send(value.clone())
            .map_err(|_| ObserverError::new("receiver disconnected"))
    }
}

/// Outcome of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    /// Observers that handled the value.
    pub delivered: usize,
    /// Observers that returned an error or panicked.
    pub failed: usize,
}

/// A thread-safe list of observers.
pub struct ObserverRegistry<T> {
    observers: RwLock<Vec<Arc<dyn Observer<T>>>>,
}

impl<T: 'static> ObserverRegistry<T> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribes an observer.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        self.observers.write().push(observer);
    }

    /// Subscribes a closure.
    pub fn subscribe_fn<F>(&self, f: F)
    where
        F: Fn(&T) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnObserver(f)));
    }

    /// Subscribes a channel and returns its receiving end.
    ///
    /// Dropping the receiver does not unsubscribe; further notifications
    /// count as failed deliveries.
    pub fn subscribe_channel(&self) -> Receiver<T>
    where
        T: Clone + Send,
    {
        let (tx, rx) = mpsc::channel();
        self.subscribe(Arc::new(ChannelObserver(tx)));
        rx
    }

    /// Delivers `value` to every current observer.
    pub fn notify(&self, value: &T) -> Delivery {
        // Observers subscribed from inside a notification only see the next one.
        let observers: Vec<_> = self.observers.read().clone();

        let mut delivery = Delivery::default();
        for (index, observer) in observers.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.notify(value))) {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(e)) => {
                    warn!(observer = index, error = %e, "observer failed");
                    delivery.failed += 1;
                }
                Err(_) => {
                    warn!(observer = index, "observer panicked");
                    delivery.failed += 1;
                }
            }
        }
        delivery
    }

    /// Number of subscribed observers.
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns true if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }
}

impl<T: 'static> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
