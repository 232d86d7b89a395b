//! # Scheduler
//!
//! Runs the waypoint updater at a fixed rate. Each cycle snapshots the data store, processes the
//! waypoint updater, and publishes the lane produced, if any, to a [`PlanSink`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, trace, warn};
use serde::Serialize;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use crate::{
    data_store::DataStore,
    wp_updater::{Lane, WpUpdater},
};
use util::{module::State, time};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination of the lanes produced by the scheduler.
pub trait PlanSink {
    type Error: std::fmt::Display;

    fn publish(&mut self, lane: &Lane) -> Result<(), Self::Error>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed rate cycle executor.
pub struct Scheduler {
    period: Duration,

    stats: CycleStats,
}

/// Cycle counters, logged at shutdown.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleStats {
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Number of cycles skipped because the pose or the track was missing
    pub num_skipped: u64,

    /// Number of lanes published
    pub num_published: u64,

    /// Number of lanes that could not be published
    pub num_publish_errors: u64,

    /// Number of cycles on which processing failed
    pub num_proc_errors: u64,

    /// Total number of cycle overruns
    pub num_overruns: u64,

    /// Number of consecutive cycle overruns
    pub num_consec_overruns: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// What happened on a single cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Published,
    Skipped,
    PublishFailed,
    ProcFailed,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Cannot run at a frequency of {0} Hz")]
    InvalidFrequency(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Scheduler {
    pub fn new(frequency_hz: f64) -> Result<Self, SchedulerError> {
        let period = time::period_from_frequency(frequency_hz)
            .ok_or(SchedulerError::InvalidFrequency(frequency_hz))?;

        Ok(Self {
            period,
            stats: CycleStats::default(),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Execute a single cycle.
    pub fn tick<S: PlanSink>(
        &mut self,
        ds: &DataStore,
        wpu: &mut WpUpdater,
        sink: &mut S,
    ) -> TickOutcome {
        let input = ds.snapshot();

        let outcome = match wpu.proc(&input) {
            Ok((Some(lane), _)) => match sink.publish(&lane) {
                Ok(()) => {
                    self.stats.num_published += 1;
                    TickOutcome::Published
                }
                Err(e) => {
                    warn!("Could not publish lane {}: {}", lane.header.seq, e);
                    self.stats.num_publish_errors += 1;
                    TickOutcome::PublishFailed
                }
            },
            Ok((None, _)) => {
                trace!("Cycle {} skipped", self.stats.num_cycles);
                self.stats.num_skipped += 1;
                TickOutcome::Skipped
            }
            Err(e) => {
                warn!("Error during WpUpdater processing: {}", e);
                self.stats.num_proc_errors += 1;
                TickOutcome::ProcFailed
            }
        };

        self.stats.num_cycles += 1;

        outcome
    }

    /// Run cycles until `running` is cleared, returning the cycle counters.
    pub fn run<S: PlanSink>(
        &mut self,
        ds: &DataStore,
        wpu: &mut WpUpdater,
        sink: &mut S,
        running: &AtomicBool,
    ) -> CycleStats {
        info!(
            "Begining main loop at {:.1} Hz\n",
            1.0 / self.period.as_secs_f64()
        );

        while running.load(Ordering::Relaxed) {
            // Get cycle start time
            let cycle_start_instant = Instant::now();

            self.tick(ds, wpu, sink);

            // ---- CYCLE MANAGEMENT ----

            let cycle_dur = Instant::now() - cycle_start_instant;

            match self.period.checked_sub(cycle_dur) {
                Some(d) => {
                    self.stats.num_consec_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - self.period.as_secs_f64()
                    );
                    self.stats.num_overruns += 1;
                    self.stats.num_consec_overruns += 1;
                }
            }
        }

        info!("Main loop stopped after {} cycles", self.stats.num_cycles);

        self.stats
    }
}

impl PlanSink for Vec<Lane> {
    type Error = std::convert::Infallible;

    fn publish(&mut self, lane: &Lane) -> Result<(), Self::Error> {
        self.push(lane.clone());
        Ok(())
    }
}
