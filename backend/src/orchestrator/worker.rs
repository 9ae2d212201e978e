//! Background solver worker
//!
//! One dedicated thread runs the matching solver off the authoritative
//! thread. Jobs go in through a one-slot channel guarded by a busy flag;
//! outcomes come back through an unbounded channel that the orchestrator
//! drains at the start of the next tick.
//!
//! # Critical Invariants
//!
//! 1. **At most one outstanding solve**: `try_submit` claims the busy flag
//!    before sending and refuses while it is held
//! 2. **Outcome before release**: the worker publishes its outcome, then
//!    clears the flag, so an idle worker never hides an undrained result
//! 3. **Panics stay on the worker**: a panicking solve becomes a failed
//!    outcome carrying the unsolved demand

use crate::cache::snapshot::SupplySnapshot;
use crate::demand::DemandSnapshot;
use crate::models::courier::CourierInfo;
use crate::models::request::ItemRequest;
use crate::orchestrator::config::SolverMode;
use crate::solver::SolvePlan;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Signature of a matching function the worker can run
pub type SolveFn = fn(&SupplySnapshot, &DemandSnapshot, &[CourierInfo], usize) -> SolvePlan;

const WAIT_POLL: Duration = Duration::from_millis(1);

/// Inputs of one solve, owned by the worker while it runs
#[derive(Debug)]
pub struct SolveJob {
    pub tick: usize,
    pub supply: SupplySnapshot,
    pub demand: DemandSnapshot,
    pub couriers: Vec<CourierInfo>,
}

/// A solve that did not produce a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveFailure {
    pub reason: String,
    /// The demand the failed solve was given
    pub unsolved: Vec<ItemRequest>,
}

/// Result of one solve, waiting to be committed
#[derive(Debug)]
pub struct SolveOutcome {
    /// Tick whose snapshot was solved
    pub tick: usize,
    pub duration: Duration,
    pub result: Result<SolvePlan, SolveFailure>,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "solver panicked".to_string()
    }
}

fn run_job(solve: SolveFn, job: SolveJob) -> SolveOutcome {
    let started = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        solve(&job.supply, &job.demand, &job.couriers, job.tick)
    }));
    let duration = started.elapsed();

    SolveOutcome {
        tick: job.tick,
        duration,
        result: result.map_err(|payload| SolveFailure {
            reason: panic_message(payload),
            unsolved: job.demand.requests().to_vec(),
        }),
    }
}

/// Single-slot solver executor
pub struct SolverWorker {
    solve: SolveFn,
    /// None in inline mode, or once shut down
    job_tx: Option<Sender<SolveJob>>,
    outcome_tx: Sender<SolveOutcome>,
    outcome_rx: Receiver<SolveOutcome>,
    busy: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SolverWorker {
    /// Start a worker; in `Background` mode this spawns the solver thread
    pub fn start(mode: SolverMode, solve: SolveFn) -> io::Result<Self> {
        let (outcome_tx, outcome_rx) = unbounded();
        let busy = Arc::new(AtomicBool::new(false));

        let (job_tx, handle) = match mode {
            SolverMode::Inline => (None, None),
            SolverMode::Background => {
                let (job_tx, job_rx) = bounded::<SolveJob>(1);
                let results = outcome_tx.clone();
                let flag = Arc::clone(&busy);
                let handle = thread::Builder::new()
                    .name("courier-solver".to_string())
                    .spawn(move || {
                        for job in job_rx.iter() {
                            let outcome = run_job(solve, job);
                            // Receiver lives in the worker handle; gone means shutdown
                            let _ = results.send(outcome);
                            flag.store(false, Ordering::Release);
                        }
                        debug!("solver worker stopped");
                    })?;
                (Some(job_tx), Some(handle))
            }
        };

        Ok(Self {
            solve,
            job_tx,
            outcome_tx,
            outcome_rx,
            busy,
            handle,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Hand a job to the worker unless a solve is already outstanding
    ///
    /// Returns the job back when it was not accepted.
    pub fn try_submit(&self, job: SolveJob) -> Result<(), SolveJob> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(job);
        }

        let Some(job_tx) = &self.job_tx else {
            // Inline: solve now, commit next tick like the background path
            let outcome = run_job(self.solve, job);
            let _ = self.outcome_tx.send(outcome);
            self.busy.store(false, Ordering::Release);
            return Ok(());
        };

        match job_tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                self.busy.store(false, Ordering::Release);
                Err(job)
            }
            Err(TrySendError::Disconnected(job)) => {
                error!("solver worker thread is gone; job rejected");
                self.busy.store(false, Ordering::Release);
                Err(job)
            }
        }
    }

    /// Take every finished outcome, oldest first
    pub fn drain_outcomes(&self) -> Vec<SolveOutcome> {
        self.outcome_rx.try_iter().collect()
    }

    /// Block until no solve is outstanding or `timeout` elapses
    ///
    /// Returns true if the worker is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if !self.is_busy() {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(WAIT_POLL);
        }
    }
}

impl Drop for SolverWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop
        self.job_tx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("solver worker thread panicked outside a solve");
            }
        }
    }
}

impl std::fmt::Debug for SolverWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverWorker")
            .field("background", &self.handle.is_some())
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver;

    fn empty_job(tick: usize) -> SolveJob {
        SolveJob {
            tick,
            supply: SupplySnapshot::default(),
            demand: DemandSnapshot::default(),
            couriers: Vec::new(),
        }
    }

    fn panicking_solver(
        _: &SupplySnapshot,
        _: &DemandSnapshot,
        _: &[CourierInfo],
        _: usize,
    ) -> SolvePlan {
        panic!("matcher exploded")
    }

    #[test]
    fn test_inline_outcome_available_immediately() {
        let worker = SolverWorker::start(SolverMode::Inline, solver::plan).unwrap();
        assert!(worker.try_submit(empty_job(3)).is_ok());
        assert!(!worker.is_busy());

        let outcomes = worker.drain_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].tick, 3);
    }

    #[test]
    fn test_background_solve_completes() {
        let worker = SolverWorker::start(SolverMode::Background, solver::plan).unwrap();
        assert!(worker.try_submit(empty_job(1)).is_ok());
        assert!(worker.wait_idle(Duration::from_secs(5)));

        let outcomes = worker.drain_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].result.is_ok());
    }

    #[test]
    fn test_panic_becomes_failed_outcome() {
        let worker = SolverWorker::start(SolverMode::Background, panicking_solver).unwrap();
        assert!(worker.try_submit(empty_job(1)).is_ok());
        assert!(worker.wait_idle(Duration::from_secs(5)));

        let outcomes = worker.drain_outcomes();
        let failure = outcomes[0].result.as_ref().unwrap_err();
        assert!(failure.reason.contains("matcher exploded"));

        // Worker survives and accepts the next job
        assert!(worker.try_submit(empty_job(2)).is_ok());
        assert!(worker.wait_idle(Duration::from_secs(5)));
    }
}
