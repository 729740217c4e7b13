//! Listener notifier running on a dedicated OS thread.
//!
//! Events are queued on a bounded `crossbeam-channel` and fanned out to a
//! snapshot of the registered listeners, so connectors never call listener
//! code while holding their own locks.
//!
//! - **No polling**: the thread blocks on `recv`
//! - **Clean shutdown**: dropping the sender lets the thread drain and exit
//! - **Isolation**: a panicking listener is logged and skipped

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::core::{ConnectorError, ListenerRegistry, ReservationEvent};

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifierStats {
    /// Events accepted onto the queue.
    pub published: u64,
    /// Events handed to every listener.
    pub delivered: u64,
    /// Events dropped because the queue was full or closed.
    pub dropped: u64,
    /// Listener invocations that panicked.
    pub listener_panics: u64,
}

#[derive(Debug, Default)]
struct NotifierCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    listener_panics: AtomicU64,
}

impl NotifierCounters {
    fn snapshot(&self) -> NotifierStats {
        NotifierStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            listener_panics: self.listener_panics.load(Ordering::Relaxed),
        }
    }
}

/// Background delivery of [`ReservationEvent`]s to registered listeners.
pub struct Notifier {
    tx: Mutex<Option<Sender<ReservationEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<NotifierCounters>,
}

impl Notifier {
    /// Spawn the delivery thread.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Backend`] if the thread cannot be spawned.
    pub fn spawn(
        name: &str,
        queue_depth: usize,
        listeners: Arc<ListenerRegistry>,
    ) -> Result<Self, ConnectorError> {
        let (tx, rx) = bounded::<ReservationEvent>(queue_depth);
        let counters = Arc::new(NotifierCounters::default());

        let worker = {
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name(format!("{name}-notifier"))
                .spawn(move || deliver_loop(&rx, &listeners, &counters))
                .map_err(|e| ConnectorError::Backend(format!("failed to spawn notifier: {e}")))?
        };

        debug!(queue_depth, "notifier started");
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            counters,
        })
    }

    /// Queue an event without blocking. Returns `false` if it was dropped.
    pub fn publish(&self, event: ReservationEvent) -> bool {
        let tx_guard = self.tx.lock();
        let Some(tx) = tx_guard.as_ref() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => {
                self.counters.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(event)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    reservation_id = %event.reservation_id(),
                    "notifier queue full, event dropped"
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Delivery counters.
    #[must_use]
    pub fn stats(&self) -> NotifierStats {
        self.counters.snapshot()
    }

    /// Close the queue, let the thread deliver what is already queued, and
    /// join it. Idempotent. When called from a listener running on the
    /// notifier thread itself, the thread is detached instead of joined.
    pub fn shutdown(&self) {
        self.tx.lock().take();
        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        if worker.thread().id() == thread::current().id() {
            debug!("notifier shut down from its own thread, detaching");
            return;
        }
        if worker.join().is_err() {
            error!("notifier thread panicked");
        }
        debug!("notifier stopped");
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        // Closing the channel is enough for the thread to exit on its own.
        self.tx.get_mut().take();
    }
}

fn deliver_loop(
    rx: &Receiver<ReservationEvent>,
    listeners: &ListenerRegistry,
    counters: &NotifierCounters,
) {
    while let Ok(event) = rx.recv() {
        for listener in listeners.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(&event))).is_err() {
                counters.listener_panics.fetch_add(1, Ordering::Relaxed);
                error!(reservation_id = %event.reservation_id(), "listener panicked");
            }
        }
        counters.delivered.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::{
        Handle, Locality, PlacedReservation, Reservation, ReservationId, ReservationListener,
        Resource, SharedListener,
    };

    struct Collect(Mutex<Vec<ReservationId>>);

    impl ReservationListener for Collect {
        fn on_event(&self, event: &ReservationEvent) {
            self.0.lock().push(event.reservation_id());
        }
    }

    struct Panicky;

    impl ReservationListener for Panicky {
        fn on_event(&self, _event: &ReservationEvent) {
            panic!("listener failure");
        }
    }

    fn event() -> ReservationEvent {
        let resource =
            Resource::new(uuid::Uuid::new_v4(), "n1", Locality::DontCare, 1, 128).unwrap();
        let reservation = Reservation::new(Handle::new_v4(), "q", vec![resource], false).unwrap();
        ReservationEvent::new(PlacedReservation::pending(ReservationId::new_v4(), reservation, 0))
    }

    #[test]
    fn test_delivers_in_order_and_drains_on_shutdown() {
        let registry = Arc::new(ListenerRegistry::new());
        let collect = Arc::new(Collect(Mutex::new(Vec::new())));
        registry.add(Arc::clone(&collect) as SharedListener);

        let notifier = Notifier::spawn("test", 16, Arc::clone(&registry)).unwrap();
        let events: Vec<_> = (0..5).map(|_| event()).collect();
        let expected: Vec<_> = events.iter().map(ReservationEvent::reservation_id).collect();
        for e in events {
            assert!(notifier.publish(e));
        }
        notifier.shutdown();

        assert_eq!(*collect.0.lock(), expected);
        let stats = notifier.stats();
        assert_eq!(stats.published, 5);
        assert_eq!(stats.delivered, 5);
        assert!(!notifier.publish(event()));
        assert_eq!(notifier.stats().dropped, 1);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let registry = Arc::new(ListenerRegistry::new());
        let collect = Arc::new(Collect(Mutex::new(Vec::new())));
        registry.add(Arc::new(Panicky));
        registry.add(Arc::clone(&collect) as SharedListener);

        let notifier = Notifier::spawn("test", 4, registry).unwrap();
        notifier.publish(event());
        notifier.publish(event());
        notifier.shutdown();

        assert_eq!(collect.0.lock().len(), 2);
        assert_eq!(notifier.stats().listener_panics, 2);
    }

    struct Gated {
        entered: Sender<()>,
        gate: Receiver<()>,
    }

    impl ReservationListener for Gated {
        fn on_event(&self, _event: &ReservationEvent) {
            let _ = self.entered.send(());
            let _ = self.gate.recv();
        }
    }

    #[test]
    fn test_full_queue_drops_event() {
        let (entered_tx, entered_rx) = bounded(4);
        let (gate_tx, gate_rx) = bounded(0);
        let registry = Arc::new(ListenerRegistry::new());
        registry.add(Arc::new(Gated {
            entered: entered_tx,
            gate: gate_rx,
        }));

        let notifier = Notifier::spawn("test", 1, registry).unwrap();
        assert!(notifier.publish(event()));
        // The thread now holds the first event inside the listener.
        entered_rx.recv().unwrap();

        assert!(notifier.publish(event()));
        assert!(!notifier.publish(event()));
        let stats = notifier.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.dropped, 1);

        drop(gate_tx);
        notifier.shutdown();
        assert_eq!(notifier.stats().delivered, 2);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let notifier = Notifier::spawn("test", 1, Arc::new(ListenerRegistry::new())).unwrap();
        notifier.shutdown();
        notifier.shutdown();
        assert_eq!(notifier.stats(), NotifierStats::default());
    }
}
