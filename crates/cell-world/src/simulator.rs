//! Turn clock and snapshot publishing.

use crate::field::{CellField, TurnSummary};
use crate::layout::build_field;
use crate::snapshot::FieldSnapshot;
use cell_core::{FieldLayout, Result, SimulationConfig, SimulationStatistics};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, event, info, instrument, trace, warn, Level};

/// Receiving end of the snapshot hand-off, held by the renderer
pub type SnapshotReceiver = mpsc::Receiver<FieldSnapshot>;

/// Single-slot, non-blocking hand-off of snapshots to one consumer.
///
/// While the consumer has not taken the previous snapshot, new ones are dropped,
/// so a slow consumer reads the oldest pending snapshot rather than the latest.
pub struct SnapshotPublisher {
    tx: mpsc::Sender<FieldSnapshot>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl SnapshotPublisher {
    pub fn channel() -> (Self, SnapshotReceiver) {
        let (tx, rx) = mpsc::channel(1);
        let publisher = Self {
            tx,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        };
        (publisher, rx)
    }

    /// Offer a snapshot without waiting. Returns whether it was handed over.
    pub fn publish(&self, snapshot: FieldSnapshot) -> bool {
        match self.tx.try_send(snapshot) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(snapshot)) => {
                trace!(turn = snapshot.turns, "Renderer busy, snapshot dropped");
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(snapshot)) => {
                trace!(turn = snapshot.turns, "Renderer gone, snapshot dropped");
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

struct SimulationState {
    field: CellField,
    stats: SimulationStatistics,
}

struct Engine {
    state: Mutex<SimulationState>,
    busy: AtomicBool,
    publisher: SnapshotPublisher,
    summary_interval: u64,
}

impl Engine {
    fn turn(&self) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            trace!("Previous turn still running, tick dropped");
            return false;
        }

        let snapshot = {
            let mut state = self.state.lock();
            let SimulationState { field, stats } = &mut *state;
            let summary = field.update(stats);
            stats.record_turn();
            self.report(stats, field.entity_count(), &summary);
            field.make_snapshot(stats)
        };
        self.publisher.publish(snapshot);

        self.busy.store(false, Ordering::Release);
        true
    }

    fn report(&self, stats: &SimulationStatistics, entities: usize, summary: &TurnSummary) {
        trace!(
            turn = stats.turns,
            deaths = summary.deaths,
            divisions = summary.divisions,
            births = summary.births,
            "Turn complete"
        );

        if self.summary_interval > 0 && stats.turns % self.summary_interval == 0 {
            info!(
                event = "population_summary",
                turn = stats.turns,
                entities,
                mutations = stats.mutations,
                snapshots_published = self.publisher.published(),
                snapshots_dropped = self.publisher.dropped(),
                "Population summary"
            );

            event!(
                Level::INFO,
                gauge_name = "population_total",
                gauge_value = entities,
                turn = stats.turns,
                "Population gauge"
            );
        }
    }
}

/// Owns a field and advances it on a fixed clock, publishing a snapshot after
/// every turn.
pub struct Simulator {
    engine: Arc<Engine>,
    turn_delay: Duration,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Simulator {
    /// Wrap a prepared field. The first snapshot is already waiting in the
    /// returned receiver, so a renderer never sees an uninitialised field.
    pub fn new(
        config: &SimulationConfig,
        mut field: CellField,
        stats: SimulationStatistics,
    ) -> (Self, SnapshotReceiver) {
        field.set_food_regen(config.food_regen_per_turn);
        let (publisher, receiver) = SnapshotPublisher::channel();
        publisher.publish(field.make_snapshot(&stats));

        let engine = Arc::new(Engine {
            state: Mutex::new(SimulationState { field, stats }),
            busy: AtomicBool::new(false),
            publisher,
            summary_interval: config.summary_interval,
        });

        let simulator = Self {
            engine,
            // A zero period would make the interval panic
            turn_delay: Duration::from_millis(config.turn_delay_ms.max(1)),
            running: None,
        };
        (simulator, receiver)
    }

    /// Start a new run from a layout with fresh statistics
    pub fn from_layout(
        config: &SimulationConfig,
        layout: &FieldLayout,
    ) -> Result<(Self, SnapshotReceiver)> {
        let mut stats = SimulationStatistics::new();
        let field = build_field(layout, &mut stats, config.seed)?;
        Ok(Self::new(config, field, stats))
    }

    /// Run one turn synchronously. Returns `false` when another turn is still
    /// executing and this one was skipped.
    pub fn turn(&self) -> bool {
        self.engine.turn()
    }

    /// Begin firing turns on the clock. Must be called within a Tokio runtime.
    ///
    /// Ticks that arrive while a turn is executing are dropped, not queued.
    #[instrument(skip(self), fields(turn_delay_ms = self.turn_delay.as_millis() as u64))]
    pub fn start(&mut self) {
        if self.running.is_some() {
            warn!("Simulation already running");
            return;
        }
        info!("Starting simulation");

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let engine = self.engine.clone();
        let delay = self.turn_delay;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(delay);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        engine.turn();
                    }
                }
            }
            debug!("Turn loop finished");
        });

        self.running = Some((token, handle));
    }

    /// Stop scheduling turns. A turn already executing completes first.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) {
        let Some((token, handle)) = self.running.take() else {
            return;
        };
        info!("Stopping simulation");
        token.cancel();
        if let Err(err) = handle.await {
            warn!(error = %err, "Turn loop ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn statistics(&self) -> SimulationStatistics {
        self.engine.state.lock().stats.clone()
    }

    pub fn entity_count(&self) -> usize {
        self.engine.state.lock().field.entity_count()
    }

    /// Fresh snapshot of the current state, outside the hand-off channel
    pub fn snapshot(&self) -> FieldSnapshot {
        let state = self.engine.state.lock();
        state.field.make_snapshot(&state.stats)
    }

    pub fn snapshots_published(&self) -> u64 {
        self.engine.publisher.published()
    }

    pub fn snapshots_dropped(&self) -> u64 {
        self.engine.publisher.dropped()
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        if let Some((token, _)) = &self.running {
            token.cancel();
        }
    }
}
