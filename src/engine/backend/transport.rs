// Tokio-driven transport
//
// Events live in a queue ordered by (due time, id). A single worker task
// sleeps until the earliest due event, fires everything that is due, and
// goes back to sleep. Scheduling or cancelling wakes the worker so it can
// re-evaluate its deadline.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::PlaybackError;
use crate::music::{EventHandle, MusicEvent, Scheduler};

use super::{Instrument, TimeSource, Transport};

type QueueKey = (u64, u64);

#[derive(Default)]
struct TransportState {
    queue: BTreeMap<QueueKey, (f64, MusicEvent)>,
    index: HashMap<u64, u64>,
    started_at: Option<Instant>,
    worker: Option<JoinHandle<()>>,
}

struct Shared {
    instrument: Arc<dyn Instrument>,
    time_source: Arc<dyn TimeSource>,
    state: Mutex<TransportState>,
    wake: Notify,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("[Transport] State lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn elapsed(&self, started_at: Instant) -> f64 {
        self.time_source
            .now()
            .saturating_duration_since(started_at)
            .as_secs_f64()
    }

    /// Pop and dispatch everything due. Returns the number fired.
    fn fire_due(&self) -> usize {
        let due = {
            let mut state = self.state();
            let Some(started_at) = state.started_at else {
                return 0;
            };
            let now_micros = to_micros(self.elapsed(started_at));
            let mut due = Vec::new();
            while let Some(entry) = state.queue.first_entry() {
                if entry.key().0 > now_micros {
                    break;
                }
                let ((_, id), event) = entry.remove_entry();
                state.index.remove(&id);
                due.push(event);
            }
            due
        };

        for (time, event) in &due {
            event.dispatch(self.instrument.as_ref(), *time);
        }
        due.len()
    }

    /// Instant the earliest pending event becomes due, if running.
    fn next_deadline(&self) -> Option<Option<Instant>> {
        let state = self.state();
        let started_at = state.started_at?;
        Some(
            state
                .queue
                .keys()
                .next()
                .map(|(micros, _)| started_at + Duration::from_micros(*micros)),
        )
    }
}

fn to_micros(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1_000_000.0).round() as u64
    } else {
        0
    }
}

async fn run_worker(shared: Arc<Shared>) {
    log::debug!("[Transport] Worker started");
    loop {
        shared.fire_due();
        match shared.next_deadline() {
            None => break,
            Some(Some(deadline)) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {}
                    _ = shared.wake.notified() => {}
                }
            }
            Some(None) => shared.wake.notified().await,
        }
    }
    log::debug!("[Transport] Worker exited");
}

/// Transport running on the ambient tokio runtime.
pub struct TokioTransport {
    shared: Arc<Shared>,
    next_id: AtomicU64,
}

impl TokioTransport {
    pub fn new(instrument: Arc<dyn Instrument>, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            shared: Arc::new(Shared {
                instrument,
                time_source,
                state: Mutex::new(TransportState::default()),
                wake: Notify::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.state().started_at.is_some()
    }

    /// Fire every due event immediately instead of waiting for the worker.
    pub fn fire_due(&self) -> usize {
        self.shared.fire_due()
    }
}

impl Scheduler for TokioTransport {
    fn schedule_at(&self, time: f64, event: MusicEvent) -> EventHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let micros = to_micros(time);
        {
            let mut state = self.shared.state();
            state.queue.insert((micros, id), (time.max(0.0), event));
            state.index.insert(id, micros);
        }
        self.shared.wake.notify_one();
        EventHandle::new(id)
    }
}

impl Transport for TokioTransport {
    fn start(&self) -> Result<(), PlaybackError> {
        let runtime = Handle::try_current().map_err(|err| PlaybackError::RuntimeUnavailable {
            reason: err.to_string(),
        })?;

        let mut state = self.shared.state();
        if state.started_at.is_some() {
            return Ok(());
        }
        state.started_at = Some(self.shared.time_source.now());
        state.worker = Some(runtime.spawn(run_worker(Arc::clone(&self.shared))));
        log::info!("[Transport] Started with {} pending events", state.queue.len());
        Ok(())
    }

    fn stop(&self) {
        let worker = {
            let mut state = self.shared.state();
            state.started_at = None;
            state.worker.take()
        };
        if let Some(worker) = worker {
            worker.abort();
            log::info!("[Transport] Stopped");
        }
        self.shared.wake.notify_one();
    }

    fn cancel(&self, handle: EventHandle) -> bool {
        let removed = {
            let mut state = self.shared.state();
            match state.index.remove(&handle.id()) {
                Some(micros) => state.queue.remove(&(micros, handle.id())).is_some(),
                None => false,
            }
        };
        if removed {
            self.shared.wake.notify_one();
        }
        removed
    }

    fn now(&self) -> f64 {
        let started_at = self.shared.state().started_at;
        started_at
            .map(|started_at| self.shared.elapsed(started_at))
            .unwrap_or(0.0)
    }

    fn pending(&self) -> usize {
        self.shared.state().queue.len()
    }
}

impl Drop for TokioTransport {
    fn drop(&mut self) {
        if let Some(worker) = self.shared.state().worker.take() {
            worker.abort();
        }
    }
}
