//! Contract-enforcing broker.
//!
//! [`ContractBroker`] wraps a [`Connector`] and checks, in this order, the
//! lifecycle state and then the arguments of every call before delegating.
//! Contract violations surface as [`BrokerError::State`] or
//! [`BrokerError::Argument`]; connector failures pass through unchanged as
//! [`BrokerError::Connector`].

use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::core::validator::{
    require_handle, require_reservation, require_reservation_id, require_reserve_args,
};
use crate::core::{
    BrokerError, BrokerResult, Connector, Handle, Lifecycle, LifecycleState, NodeId,
    PlacedReservation, Reservation, ReservationId, SharedListener, StartOutcome,
};

/// Gatekeeper over a connector enforcing lifecycle and argument contracts.
///
/// Safe to share across tasks and threads (`Arc<ContractBroker<C>>`). The
/// lifecycle lock is never held across a connector call, so a slow
/// reservation never delays `stop` or concurrent callers.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_reservation_broker::core::{ContractBroker, Handle, Reservation};
///
/// let broker = ContractBroker::new(connector);
/// broker.start().await?;
/// let placed = broker.reserve(&reservation).await?;
/// broker.release_reservation(placed.id).await?;
/// broker.stop().await;
/// ```
pub struct ContractBroker<C: Connector> {
    connector: C,
    lifecycle: Lifecycle,
}

impl<C: Connector> ContractBroker<C> {
    /// Wrap a connector. The broker starts out unstarted.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Static configuration of the underlying connector. Available in every
    /// lifecycle state.
    pub fn config(&self) -> &BrokerConfig {
        self.connector.config()
    }

    /// The wrapped connector.
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Whether the broker is accepting operations.
    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    /// Start the connector and begin accepting operations. Valid once.
    ///
    /// # Errors
    ///
    /// - [`BrokerError::State`] if already started or stopped, or if `stop`
    ///   ran while the connector was starting
    /// - [`BrokerError::Connector`] if the connector failed to start; the
    ///   broker stays unstarted
    pub async fn start(&self) -> BrokerResult<()> {
        if let Err(e) = self.lifecycle.begin_start() {
            warn!(error = %e, "start rejected");
            return Err(e);
        }

        if let Err(e) = self.connector.start().await {
            self.lifecycle.abort_start();
            warn!(error = %e, "connector failed to start");
            return Err(e.into());
        }

        match self.lifecycle.finish_start() {
            StartOutcome::Running => {
                info!(broker = %self.config().name, "broker started");
                Ok(())
            }
            StartOutcome::StoppedMeanwhile => {
                self.stop_connector().await;
                warn!("broker stopped while starting");
                Err(BrokerError::State("stopped while starting".into()))
            }
        }
    }

    /// Stop the broker. Never fails and is idempotent; the connector is
    /// stopped once, best-effort, if it had been started.
    pub async fn stop(&self) {
        match self.lifecycle.stop() {
            LifecycleState::Running => {
                self.stop_connector().await;
                info!(broker = %self.config().name, "broker stopped");
            }
            // `start` owns the connector until it observes the stop.
            LifecycleState::Starting => debug!("stop requested while starting"),
            LifecycleState::Unstarted => debug!("broker stopped before start"),
            LifecycleState::Stopped => {}
        }
    }

    async fn stop_connector(&self) {
        if let Err(e) = self.connector.stop().await {
            warn!(error = %e, "connector failed to stop cleanly");
        }
    }

    /// Nodes reservations can be placed on.
    ///
    /// # Errors
    ///
    /// [`BrokerError::State`] unless running; [`BrokerError::Connector`] on
    /// connector failure.
    pub async fn nodes(&self) -> BrokerResult<Vec<NodeId>> {
        self.lifecycle.ensure_running()?;
        Ok(self.connector.nodes().await?)
    }

    /// Place a reservation under a freshly generated identifier.
    ///
    /// # Errors
    ///
    /// [`BrokerError::State`] unless running; [`BrokerError::Argument`] for a
    /// malformed reservation; [`BrokerError::Connector`] on connector failure.
    pub async fn reserve(&self, reservation: &Reservation) -> BrokerResult<PlacedReservation> {
        self.lifecycle.ensure_running()?;
        require_reservation(reservation).inspect_err(|e| warn!(error = %e, "reserve rejected"))?;
        self.delegate_reserve(ReservationId::new_v4(), reservation).await
    }

    /// Place a reservation under a caller-supplied identifier.
    ///
    /// # Errors
    ///
    /// [`BrokerError::State`] unless running; [`BrokerError::Argument`] for a
    /// nil id (checked first) or a malformed reservation;
    /// [`BrokerError::Connector`] on connector failure.
    pub async fn reserve_with_id(
        &self,
        id: ReservationId,
        reservation: &Reservation,
    ) -> BrokerResult<PlacedReservation> {
        self.lifecycle.ensure_running()?;
        require_reserve_args(&id, reservation)
            .inspect_err(|e| warn!(error = %e, "reserve rejected"))?;
        self.delegate_reserve(id, reservation).await
    }

    async fn delegate_reserve(
        &self,
        id: ReservationId,
        reservation: &Reservation,
    ) -> BrokerResult<PlacedReservation> {
        debug!(
            reservation_id = %id,
            queue = reservation.queue(),
            resources = reservation.resources().len(),
            gang = reservation.is_gang(),
            "delegating reserve"
        );
        Ok(self.connector.reserve(id, reservation).await?)
    }

    /// Release a reservation. Returns `None` if the connector does not know it.
    ///
    /// # Errors
    ///
    /// [`BrokerError::State`] unless running; [`BrokerError::Argument`] for a
    /// nil id; [`BrokerError::Connector`] on connector failure.
    pub async fn release_reservation(
        &self,
        id: ReservationId,
    ) -> BrokerResult<Option<PlacedReservation>> {
        self.lifecycle.ensure_running()?;
        require_reservation_id(&id).inspect_err(|e| warn!(error = %e, "release rejected"))?;
        debug!(reservation_id = %id, "delegating release");
        Ok(self.connector.release_reservation(id).await?)
    }

    /// Look up a reservation. Returns `None` if the connector does not know it.
    ///
    /// # Errors
    ///
    /// [`BrokerError::State`] unless running; [`BrokerError::Argument`] for a
    /// nil id; [`BrokerError::Connector`] on connector failure.
    pub async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> BrokerResult<Option<PlacedReservation>> {
        self.lifecycle.ensure_running()?;
        require_reservation_id(&id).inspect_err(|e| warn!(error = %e, "lookup rejected"))?;
        Ok(self.connector.get_reservation(id).await?)
    }

    /// Release every reservation submitted under `handle`.
    ///
    /// # Errors
    ///
    /// [`BrokerError::State`] unless running; [`BrokerError::Argument`] for a
    /// nil handle; [`BrokerError::Connector`] on connector failure.
    pub async fn release_reservations_for_handle(
        &self,
        handle: Handle,
    ) -> BrokerResult<Vec<PlacedReservation>> {
        self.lifecycle.ensure_running()?;
        require_handle(&handle).inspect_err(|e| warn!(error = %e, "bulk release rejected"))?;
        debug!(handle = %handle, "delegating bulk release");
        Ok(self.connector.release_reservations_for_handle(handle).await?)
    }

    /// Register a placement-change listener.
    ///
    /// # Errors
    ///
    /// [`BrokerError::State`] unless running; [`BrokerError::Connector`] on
    /// connector failure.
    pub async fn add_listener(&self, listener: SharedListener) -> BrokerResult<()> {
        self.lifecycle.ensure_running()?;
        Ok(self.connector.add_listener(listener).await?)
    }

    /// Deregister a placement-change listener.
    ///
    /// # Errors
    ///
    /// [`BrokerError::State`] unless running; [`BrokerError::Connector`] on
    /// connector failure.
    pub async fn remove_listener(&self, listener: &SharedListener) -> BrokerResult<()> {
        self.lifecycle.ensure_running()?;
        Ok(self.connector.remove_listener(listener).await?)
    }
}
