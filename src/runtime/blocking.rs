//! Blocking facade for thread-based callers.
//!
//! [`BlockingBroker`] owns a multi-threaded tokio runtime and drives every
//! broker operation to completion on it, so plain OS threads can share one
//! broker without an async context of their own.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::config::BrokerConfig;
use crate::core::{
    BrokerResult, Connector, ContractBroker, Handle, NodeId, PlacedReservation, Reservation,
    ReservationId, SharedListener,
};

/// Blocking wrapper over a shared [`ContractBroker`].
///
/// Must not be used from inside an async runtime; `block_on` panics there.
pub struct BlockingBroker<C: Connector> {
    broker: Arc<ContractBroker<C>>,
    runtime: Runtime,
}

impl<C: Connector> BlockingBroker<C> {
    /// Wrap a broker with a runtime sized to the number of CPUs.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the runtime cannot be built.
    pub fn new(broker: Arc<ContractBroker<C>>) -> Result<Self, std::io::Error> {
        Self::with_worker_threads(broker, num_cpus::get())
    }

    /// Wrap a broker with a runtime of `worker_threads` threads.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the runtime cannot be built.
    pub fn with_worker_threads(
        broker: Arc<ContractBroker<C>>,
        worker_threads: usize,
    ) -> Result<Self, std::io::Error> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("broker-blocking")
            .enable_all()
            .build()?;
        Ok(Self { broker, runtime })
    }

    /// The shared async broker.
    pub const fn broker(&self) -> &Arc<ContractBroker<C>> {
        &self.broker
    }

    /// See [`ContractBroker::config`].
    pub fn config(&self) -> &BrokerConfig {
        self.broker.config()
    }

    /// See [`ContractBroker::is_running`].
    pub fn is_running(&self) -> bool {
        self.broker.is_running()
    }

    /// See [`ContractBroker::start`].
    ///
    /// # Errors
    ///
    /// As [`ContractBroker::start`].
    pub fn start(&self) -> BrokerResult<()> {
        self.runtime.block_on(self.broker.start())
    }

    /// See [`ContractBroker::stop`].
    pub fn stop(&self) {
        self.runtime.block_on(self.broker.stop());
    }

    /// See [`ContractBroker::nodes`].
    ///
    /// # Errors
    ///
    /// As [`ContractBroker::nodes`].
    pub fn nodes(&self) -> BrokerResult<Vec<NodeId>> {
        self.runtime.block_on(self.broker.nodes())
    }

    /// See [`ContractBroker::reserve`].
    ///
    /// # Errors
    ///
    /// As [`ContractBroker::reserve`].
    pub fn reserve(&self, reservation: &Reservation) -> BrokerResult<PlacedReservation> {
        self.runtime.block_on(self.broker.reserve(reservation))
    }

    /// See [`ContractBroker::reserve_with_id`].
    ///
    /// # Errors
    ///
    /// As [`ContractBroker::reserve_with_id`].
    pub fn reserve_with_id(
        &self,
        id: ReservationId,
        reservation: &Reservation,
    ) -> BrokerResult<PlacedReservation> {
        self.runtime.block_on(self.broker.reserve_with_id(id, reservation))
    }

    /// See [`ContractBroker::release_reservation`].
    ///
    /// # Errors
    ///
    /// As [`ContractBroker::release_reservation`].
    pub fn release_reservation(
        &self,
        id: ReservationId,
    ) -> BrokerResult<Option<PlacedReservation>> {
        self.runtime.block_on(self.broker.release_reservation(id))
    }

    /// See [`ContractBroker::get_reservation`].
    ///
    /// # Errors
    ///
    /// As [`ContractBroker::get_reservation`].
    pub fn get_reservation(&self, id: ReservationId) -> BrokerResult<Option<PlacedReservation>> {
        self.runtime.block_on(self.broker.get_reservation(id))
    }

    /// See [`ContractBroker::release_reservations_for_handle`].
    ///
    /// # Errors
    ///
    /// As [`ContractBroker::release_reservations_for_handle`].
    pub fn release_reservations_for_handle(
        &self,
        handle: Handle,
    ) -> BrokerResult<Vec<PlacedReservation>> {
        self.runtime
            .block_on(self.broker.release_reservations_for_handle(handle))
    }

    /// See [`ContractBroker::add_listener`].
    ///
    /// # Errors
    ///
    /// As [`ContractBroker::add_listener`].
    pub fn add_listener(&self, listener: SharedListener) -> BrokerResult<()> {
        self.runtime.block_on(self.broker.add_listener(listener))
    }

    /// See [`ContractBroker::remove_listener`].
    ///
    /// # Errors
    ///
    /// As [`ContractBroker::remove_listener`].
    pub fn remove_listener(&self, listener: &SharedListener) -> BrokerResult<()> {
        self.runtime.block_on(self.broker.remove_listener(listener))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryConnector;
    use crate::core::{Locality, Resource};

    #[test]
    fn test_blocking_round_trip_from_threads() {
        let cfg = BrokerConfig::default().with_node("n1", 8, 8192);
        let broker = Arc::new(ContractBroker::new(InMemoryConnector::new(cfg)));
        let blocking = Arc::new(BlockingBroker::with_worker_threads(broker, 2).unwrap());
        blocking.start().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let blocking = Arc::clone(&blocking);
                std::thread::spawn(move || {
                    let resource =
                        Resource::new(uuid::Uuid::new_v4(), "n1", Locality::MustHave, 1, 512)
                            .unwrap();
                    let reservation =
                        Reservation::new(Handle::new_v4(), "q", vec![resource], false).unwrap();
                    blocking.reserve(&reservation).unwrap().id
                })
            })
            .collect();
        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for id in ids {
            assert!(blocking.get_reservation(id).unwrap().is_some());
        }
        blocking.stop();
        assert!(!blocking.is_running());
        assert!(blocking.nodes().unwrap_err().is_state());
    }
}
