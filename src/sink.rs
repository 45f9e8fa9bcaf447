//! Position Sink
//!
//! Fire-and-forget propagation of vehicle positions to a [`PositionStore`].
//!
//! ## Behavior
//!
//! - `submit()` never blocks and never fails; ticks call it under the
//!   simulation lock
//! - Pending updates are kept as the latest position per vehicle, so the
//!   queue never holds more entries than there are vehicles, even while a
//!   store call is stalled
//! - A worker task takes the whole pending set whenever it is woken
//! - Store failures are logged at `warn` and dropped; local state stays
//!   authoritative
//! - `flush()` waits until everything submitted before it was written;
//!   `shutdown()` drains the queue and stops the worker
//!
//! The store is awaited outside any simulation lock, and no timeout is
//! imposed on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use globe_fleet_core::geo::GeoPosition;
use globe_fleet_core::vehicle::VehicleId;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Notify};

use crate::collaborators::PositionStore;
use crate::error::{FleetError, Result};

/// Latest known position of a vehicle, queued for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub vehicle_id: VehicleId,
    pub position: GeoPosition,
}

#[derive(Default)]
struct Queue {
    /// At most one entry per vehicle, in first-submission order
    pending: Vec<PositionUpdate>,
    waiters: Vec<oneshot::Sender<()>>,
    closing: Option<oneshot::Sender<()>>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    wake: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    coalesced: AtomicU64,
    dropped: AtomicU64,
}

/// Sink counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Updates accepted by `submit()`
    pub submitted: u64,
    /// Successful store writes
    pub written: u64,
    /// Store writes that returned an error
    pub failed: u64,
    /// Updates superseded by a newer position before being written
    pub coalesced: u64,
    /// Updates rejected because the sink was disabled or shut down
    pub dropped: u64,
}

/// Handle for submitting positions; clones feed the same worker
#[derive(Clone)]
pub struct PositionSink {
    shared: Option<Arc<Shared>>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for PositionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionSink")
            .field("enabled", &self.is_enabled())
            .field("stats", &self.stats())
            .finish()
    }
}

impl PositionSink {
    /// Sink that drops every update (no persistence configured)
    pub fn disabled() -> Self {
        Self {
            shared: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Start a worker on the current tokio runtime
    ///
    /// # Errors
    ///
    /// `FleetError::RuntimeUnavailable` when called outside a runtime.
    pub fn spawn(store: Arc<dyn PositionStore>) -> Result<Self> {
        let handle =
            Handle::try_current().map_err(|_| FleetError::RuntimeUnavailable("position sink"))?;
        let shared = Arc::new(Shared::default());
        let counters = Arc::new(Counters::default());

        handle.spawn(run_worker(store, Arc::clone(&shared), Arc::clone(&counters)));
        crate::log_debug!("Position sink worker started");

        Ok(Self {
            shared: Some(shared),
            counters,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.as_ref().is_some_and(|shared| !shared.lock().closed)
    }

    /// Queue a position for persistence, replacing any pending one for the
    /// same vehicle
    pub fn submit(&self, vehicle_id: &VehicleId, position: GeoPosition) {
        let Some(shared) = &self.shared else {
            self.drop_update(vehicle_id);
            return;
        };

        {
            let mut queue = shared.lock();
            if queue.closed {
                drop(queue);
                self.drop_update(vehicle_id);
                return;
            }
            match queue
                .pending
                .iter_mut()
                .find(|p| &p.vehicle_id == vehicle_id)
            {
                Some(existing) => {
                    existing.position = position;
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                }
                None => queue.pending.push(PositionUpdate {
                    vehicle_id: vehicle_id.clone(),
                    position,
                }),
            }
        }
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        shared.wake.notify_one();
    }

    fn drop_update(&self, vehicle_id: &VehicleId) {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        crate::log_trace!("Position sink inactive, dropped update for {}", vehicle_id);
    }

    /// Wait until every update submitted so far has been handed to the store
    pub async fn flush(&self) {
        let Some(shared) = &self.shared else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        {
            let mut queue = shared.lock();
            if queue.closed {
                return;
            }
            queue.waiters.push(done_tx);
        }
        shared.wake.notify_one();
        let _ = done_rx.await;
    }

    /// Drain outstanding updates and stop the worker
    ///
    /// Later submissions are dropped. Safe to call more than once.
    pub async fn shutdown(&self) {
        let Some(shared) = &self.shared else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        {
            let mut queue = shared.lock();
            if queue.closed {
                return;
            }
            queue.closed = true;
            queue.closing = Some(done_tx);
        }
        shared.wake.notify_one();
        let _ = done_rx.await;
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            written: self.counters.written.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Closes the queue when the worker ends, including when its task is
/// dropped with the runtime, so pending `flush()` calls return
struct WorkerGuard(Arc<Shared>);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let mut queue = self.0.lock();
        queue.closed = true;
        queue.pending.clear();
        queue.waiters.clear();
        queue.closing = None;
    }
}

async fn run_worker(store: Arc<dyn PositionStore>, shared: Arc<Shared>, counters: Arc<Counters>) {
    let _guard = WorkerGuard(Arc::clone(&shared));

    loop {
        shared.wake.notified().await;

        loop {
            let (batch, waiters, closing) = {
                let mut queue = shared.lock();
                (
                    std::mem::take(&mut queue.pending),
                    std::mem::take(&mut queue.waiters),
                    queue.closing.take(),
                )
            };
            if batch.is_empty() && waiters.is_empty() && closing.is_none() {
                break;
            }

            for update in batch {
                write(store.as_ref(), &counters, update).await;
            }
            for done in waiters {
                let _ = done.send(());
            }
            // The queue was closed in the same critical section, so nothing
            // can follow the batch just written
            if let Some(done) = closing {
                let _ = done.send(());
                crate::log_debug!("Position sink worker stopped");
                return;
            }
        }
    }
}

async fn write(store: &dyn PositionStore, counters: &Counters, update: PositionUpdate) {
    match store
        .update_vehicle_position(&update.vehicle_id, update.position)
        .await
    {
        Ok(()) => {
            counters.written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            crate::log_warn!("Failed to persist position of {}: {}", update.vehicle_id, e);
        }
    }
}
