//! In-process connector backed by a static node inventory.
//!
//! Placement is first-fit over the configured nodes, honouring locality:
//! `MustHave` only considers the requested node, `PreferredHave` tries it
//! first, `DontCare` considers every node in configuration order. Gang
//! reservations are placed all-or-nothing. Reservations that cannot be placed
//! yet stay pending and are retried in submission order whenever capacity is
//! released. A reservation containing a resource that can never fit is
//! rejected outright.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{BrokerConfig, NodeConfig};
use crate::core::{
    Connector, ConnectorError, Handle, ListenerRegistry, Locality, NodeId, PlacedReservation,
    PlacedResourceStatus, PlacementStatus, Reservation, ReservationEvent, ReservationId, Resource,
    SharedListener,
};
use crate::infra::notifier::{Notifier, NotifierStats};
use crate::util::clock::now_ms;

/// Failure injection for tests and demos, fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectorBehavior {
    /// `start` reports the resource manager as unavailable.
    pub fail_start: bool,
    /// `reserve` reports the resource manager as unavailable.
    pub fail_reserve: bool,
}

impl ConnectorBehavior {
    /// Make `start` fail.
    #[must_use]
    pub const fn with_fail_start(mut self, fail: bool) -> Self {
        self.fail_start = fail;
        self
    }

    /// Make `reserve` fail.
    #[must_use]
    pub const fn with_fail_reserve(mut self, fail: bool) -> Self {
        self.fail_reserve = fail;
        self
    }
}

/// Snapshot of connector occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorStats {
    /// Reservations with at least one allocated resource.
    pub active: usize,
    /// Reservations waiting for capacity.
    pub pending: usize,
    /// Reservations rejected and still on record.
    pub rejected: usize,
    /// Reservations released since start.
    pub released: u64,
    /// Virtual cores currently allocated.
    pub used_vcores: u64,
    /// Virtual cores across all nodes.
    pub total_vcores: u64,
    /// Memory currently allocated, in megabytes.
    pub used_memory_mb: u64,
    /// Memory across all nodes, in megabytes.
    pub total_memory_mb: u64,
    /// Listener delivery counters, once started.
    pub notifier: Option<NotifierStats>,
}

#[derive(Debug, Clone)]
struct NodeState {
    name: NodeId,
    cpu_total: u32,
    memory_total: u64,
    cpu_used: u32,
    memory_used: u64,
}

impl NodeState {
    fn from_config(cfg: &NodeConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            cpu_total: cfg.cpu_vcores,
            memory_total: cfg.memory_mb,
            cpu_used: 0,
            memory_used: 0,
        }
    }

    const fn free(&self) -> (u32, u64) {
        (
            self.cpu_total - self.cpu_used,
            self.memory_total - self.memory_used,
        )
    }

    const fn could_ever_hold(&self, resource: &Resource) -> bool {
        resource.cpu_vcores() <= self.cpu_total && resource.memory_mb() <= self.memory_total
    }
}

const fn fits(free: (u32, u64), resource: &Resource) -> bool {
    resource.cpu_vcores() <= free.0 && resource.memory_mb() <= free.1
}

#[derive(Debug)]
struct ClusterState {
    nodes: Vec<NodeState>,
    reservations: HashMap<ReservationId, PlacedReservation>,
    by_handle: HashMap<Handle, Vec<ReservationId>>,
    pending: VecDeque<ReservationId>,
    released: u64,
    /// Set by `stop` under the lock; calls that passed the running check
    /// before it must not touch the cluster afterwards.
    stopped: bool,
}

impl ClusterState {
    fn new(nodes: &[NodeConfig]) -> Self {
        Self {
            nodes: nodes.iter().map(NodeState::from_config).collect(),
            reservations: HashMap::new(),
            by_handle: HashMap::new(),
            pending: VecDeque::new(),
            released: 0,
            stopped: false,
        }
    }

    fn ensure_open(&self) -> Result<(), ConnectorError> {
        if self.stopped {
            Err(ConnectorError::Unavailable("connector stopped".into()))
        } else {
            Ok(())
        }
    }

    /// Node indices eligible for `resource`, in preference order.
    fn candidates(&self, resource: &Resource) -> Vec<usize> {
        let requested = self.nodes.iter().position(|n| n.name == resource.location());
        match resource.locality() {
            Locality::MustHave => requested.into_iter().collect(),
            Locality::PreferredHave => requested
                .into_iter()
                .chain((0..self.nodes.len()).filter(|&i| Some(i) != requested))
                .collect(),
            Locality::DontCare => (0..self.nodes.len()).collect(),
        }
    }

    fn can_ever_place(&self, resource: &Resource) -> bool {
        self.candidates(resource)
            .into_iter()
            .any(|i| self.nodes[i].could_ever_hold(resource))
    }

    /// First-fit plan for the pending resources of `placed`, without
    /// committing anything.
    fn plan(&self, placed: &PlacedReservation) -> Vec<Option<usize>> {
        let mut free: Vec<(u32, u64)> = self.nodes.iter().map(NodeState::free).collect();
        placed
            .resources
            .iter()
            .map(|pr| {
                if pr.status != PlacedResourceStatus::Pending {
                    return None;
                }
                let idx = self
                    .candidates(&pr.resource)
                    .into_iter()
                    .find(|&i| fits(free[i], &pr.resource))?;
                free[idx].0 -= pr.resource.cpu_vcores();
                free[idx].1 -= pr.resource.memory_mb();
                Some(idx)
            })
            .collect()
    }

    /// Allocate what can be allocated for `id`. Returns whether anything changed.
    fn try_place(&mut self, id: ReservationId) -> bool {
        let Some(placed) = self.reservations.get(&id) else {
            return false;
        };
        let plan = self.plan(placed);
        let unplaced = placed
            .resources
            .iter()
            .zip(&plan)
            .any(|(pr, slot)| pr.status == PlacedResourceStatus::Pending && slot.is_none());
        if placed.reservation.is_gang() && unplaced {
            return false;
        }
        if plan.iter().all(Option::is_none) {
            return false;
        }

        let Some(placed) = self.reservations.get_mut(&id) else {
            return false;
        };
        for (pr, slot) in placed.resources.iter_mut().zip(plan) {
            let Some(idx) = slot else { continue };
            let node = &mut self.nodes[idx];
            node.cpu_used += pr.resource.cpu_vcores();
            node.memory_used += pr.resource.memory_mb();
            pr.status = PlacedResourceStatus::Allocated;
            pr.node = Some(node.name.clone());
        }
        placed.refresh_status();
        true
    }

    fn free_resources(&mut self, placed: &mut PlacedReservation) {
        for pr in &mut placed.resources {
            if pr.status == PlacedResourceStatus::Allocated {
                if let Some(node) = pr
                    .node
                    .as_deref()
                    .and_then(|name| self.nodes.iter_mut().find(|n| n.name == name))
                {
                    node.cpu_used -= pr.resource.cpu_vcores();
                    node.memory_used -= pr.resource.memory_mb();
                }
            }
            pr.status = PlacedResourceStatus::Released;
        }
        placed.refresh_status();
    }

    /// Remove `id` from every index and return capacity. Does not promote
    /// pending reservations.
    fn release(&mut self, id: ReservationId) -> Option<PlacedReservation> {
        let mut placed = self.reservations.remove(&id)?;
        self.pending.retain(|p| *p != id);
        let handle = placed.handle();
        if let Some(ids) = self.by_handle.get_mut(&handle) {
            ids.retain(|p| *p != id);
            if ids.is_empty() {
                self.by_handle.remove(&handle);
            }
        }
        self.free_resources(&mut placed);
        self.released += 1;
        Some(placed)
    }

    /// Retry pending reservations in submission order, returning snapshots of
    /// those whose placement changed.
    fn promote_pending(&mut self) -> Vec<PlacedReservation> {
        let mut changed = Vec::new();
        let queued: Vec<_> = self.pending.drain(..).collect();
        for id in queued {
            if self.try_place(id) {
                if let Some(placed) = self.reservations.get(&id) {
                    changed.push(placed.clone());
                }
            }
            let done = self
                .reservations
                .get(&id)
                .is_none_or(|p| p.status == PlacementStatus::Allocated);
            if !done {
                self.pending.push_back(id);
            }
        }
        changed
    }

    fn stats(&self) -> ConnectorStats {
        let count = |status: PlacementStatus| {
            self.reservations.values().filter(|p| p.status == status).count()
        };
        ConnectorStats {
            active: count(PlacementStatus::Allocated) + count(PlacementStatus::Partial),
            pending: count(PlacementStatus::Pending),
            rejected: count(PlacementStatus::Rejected),
            released: self.released,
            used_vcores: self.nodes.iter().map(|n| u64::from(n.cpu_used)).sum(),
            total_vcores: self.nodes.iter().map(|n| u64::from(n.cpu_total)).sum(),
            used_memory_mb: self.nodes.iter().map(|n| n.memory_used).sum(),
            total_memory_mb: self.nodes.iter().map(|n| n.memory_total).sum(),
            notifier: None,
        }
    }
}

/// In-process connector for development and tests.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_reservation_broker::config::BrokerConfig;
/// use prometheus_reservation_broker::core::ContractBroker;
/// use prometheus_reservation_broker::infra::InMemoryConnector;
///
/// let cfg = BrokerConfig::default().with_node("node-1", 8, 16_384);
/// let broker = ContractBroker::new(InMemoryConnector::new(cfg));
/// ```
pub struct InMemoryConnector {
    config: BrokerConfig,
    behavior: ConnectorBehavior,
    running: AtomicBool,
    cluster: Mutex<ClusterState>,
    listeners: Arc<ListenerRegistry>,
    notifier: Mutex<Option<Notifier>>,
}

impl InMemoryConnector {
    /// Create a connector over the nodes in `config`.
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        Self::with_behavior(config, ConnectorBehavior::default())
    }

    /// Create a connector with failure injection.
    #[must_use]
    pub fn with_behavior(config: BrokerConfig, behavior: ConnectorBehavior) -> Self {
        let cluster = Mutex::new(ClusterState::new(&config.nodes));
        Self {
            config,
            behavior,
            running: AtomicBool::new(false),
            cluster,
            listeners: Arc::new(ListenerRegistry::new()),
            notifier: Mutex::new(None),
        }
    }

    /// Occupancy snapshot.
    #[must_use]
    pub fn stats(&self) -> ConnectorStats {
        let mut stats = self.cluster.lock().stats();
        stats.notifier = self.notifier.lock().as_ref().map(Notifier::stats);
        stats
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn ensure_started(&self) -> Result<(), ConnectorError> {
        if self.running.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ConnectorError::Unavailable("connector not started".into()))
        }
    }

    fn publish(&self, changes: Vec<PlacedReservation>) {
        if changes.is_empty() {
            return;
        }
        let notifier = self.notifier.lock();
        let Some(notifier) = notifier.as_ref() else {
            return;
        };
        for placed in changes {
            notifier.publish(ReservationEvent::new(placed));
        }
    }
}

#[async_trait]
impl Connector for InMemoryConnector {
    fn config(&self) -> &BrokerConfig {
        &self.config
    }

    async fn start(&self) -> Result<(), ConnectorError> {
        if self.behavior.fail_start {
            return Err(ConnectorError::Unavailable("injected start failure".into()));
        }
        {
            let mut notifier = self.notifier.lock();
            if notifier.is_none() {
                *notifier = Some(Notifier::spawn(
                    &self.config.name,
                    self.config.notifier_queue_depth,
                    Arc::clone(&self.listeners),
                )?);
            }
        }
        self.cluster.lock().stopped = false;
        self.running.store(true, Ordering::Release);
        info!(
            nodes = self.config.nodes.len(),
            queues = self.config.queues.len(),
            "in-memory connector started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<(), ConnectorError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let released: Vec<_> = {
            let mut cluster = self.cluster.lock();
            cluster.stopped = true;
            let ids: Vec<_> = cluster.reservations.keys().copied().collect();
            ids.into_iter().filter_map(|id| cluster.release(id)).collect()
        };
        let outstanding = released.len();
        self.publish(released);
        let notifier = self.notifier.lock().take();
        if let Some(notifier) = notifier {
            notifier.shutdown();
        }
        info!(outstanding, "in-memory connector stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    async fn nodes(&self) -> Result<Vec<NodeId>, ConnectorError> {
        self.ensure_started()?;
        Ok(self.config.nodes.iter().map(|n| n.name.clone()).collect())
    }

    async fn reserve(
        &self,
        id: ReservationId,
        reservation: &Reservation,
    ) -> Result<PlacedReservation, ConnectorError> {
        self.ensure_started()?;
        if self.behavior.fail_reserve {
            return Err(ConnectorError::Unavailable("injected reserve failure".into()));
        }
        if !self.config.accepts_queue(reservation.queue()) {
            return Err(ConnectorError::UnknownQueue(reservation.queue().to_string()));
        }

        let placed = {
            let mut cluster = self.cluster.lock();
            cluster.ensure_open()?;
            if cluster.reservations.contains_key(&id) {
                return Err(ConnectorError::DuplicateReservation(id.to_string()));
            }

            let mut placed = PlacedReservation::pending(id, reservation.clone(), now_ms());
            let placeable = reservation
                .resources()
                .iter()
                .all(|r| cluster.can_ever_place(r));
            if !placeable {
                for pr in &mut placed.resources {
                    pr.status = PlacedResourceStatus::Rejected;
                }
                placed.refresh_status();
            }

            cluster.reservations.insert(id, placed);
            cluster
                .by_handle
                .entry(reservation.handle())
                .or_default()
                .push(id);
            if placeable {
                cluster.try_place(id);
            }

            let placed = cluster
                .reservations
                .get(&id)
                .cloned()
                .ok_or_else(|| ConnectorError::Backend(format!("reservation {id} vanished")))?;
            if matches!(placed.status, PlacementStatus::Pending | PlacementStatus::Partial) {
                cluster.pending.push_back(id);
            }
            placed
        };

        match placed.status {
            PlacementStatus::Rejected => warn!(
                reservation_id = %id,
                queue = reservation.queue(),
                "reservation can never be placed"
            ),
            status => debug!(reservation_id = %id, ?status, "reservation placed"),
        }
        self.publish(vec![placed.clone()]);
        Ok(placed)
    }

    async fn release_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<PlacedReservation>, ConnectorError> {
        self.ensure_started()?;
        let (released, promoted) = {
            let mut cluster = self.cluster.lock();
            cluster.ensure_open()?;
            let released = cluster.release(id);
            let promoted = if released.is_some() {
                cluster.promote_pending()
            } else {
                Vec::new()
            };
            (released, promoted)
        };
        if let Some(placed) = &released {
            debug!(reservation_id = %id, promoted = promoted.len(), "reservation released");
            self.publish(vec![placed.clone()]);
        }
        self.publish(promoted);
        Ok(released)
    }

    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<PlacedReservation>, ConnectorError> {
        self.ensure_started()?;
        let cluster = self.cluster.lock();
        cluster.ensure_open()?;
        Ok(cluster.reservations.get(&id).cloned())
    }

    async fn release_reservations_for_handle(
        &self,
        handle: Handle,
    ) -> Result<Vec<PlacedReservation>, ConnectorError> {
        self.ensure_started()?;
        let (released, promoted) = {
            let mut cluster = self.cluster.lock();
            cluster.ensure_open()?;
            let ids = cluster.by_handle.get(&handle).cloned().unwrap_or_default();
            let released: Vec<_> = ids.into_iter().filter_map(|id| cluster.release(id)).collect();
            let promoted = if released.is_empty() {
                Vec::new()
            } else {
                cluster.promote_pending()
            };
            (released, promoted)
        };
        debug!(%handle, released = released.len(), "handle released");
        self.publish(released.clone());
        self.publish(promoted);
        Ok(released)
    }

    async fn add_listener(&self, listener: SharedListener) -> Result<(), ConnectorError> {
        self.listeners.add(listener);
        Ok(())
    }

    async fn remove_listener(&self, listener: &SharedListener) -> Result<(), ConnectorError> {
        if !self.listeners.remove(listener) {
            debug!("remove_listener for unregistered listener");
        }
        Ok(())
    }
}
