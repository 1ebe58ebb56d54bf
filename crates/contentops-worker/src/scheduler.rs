//! Scheduler core: job registry, due-job selection, isolated execution,
//! and the polling loop.
//!
//! Jobs run one at a time on the caller's task. A job's failure (error or
//! panic) is recorded and logged but never escapes [`SchedulerCore::run_job`],
//! and a panic escaping a whole tick never stops [`SchedulerCore::poll_loop`].

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use contentops_core::error::AppError;
use contentops_core::result::AppResult;

use crate::cadence::Cadence;
use crate::clock::{Clock, SystemClock};
use crate::executor::{ExecutionResult, JobAction, JobOutcome};

/// Handle to a registered job (its registration index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(usize);

/// A named job with its cadence and run bookkeeping.
#[derive(Debug)]
pub struct ScheduledJob {
    name: String,
    cadence: Cadence,
    action: Arc<dyn JobAction>,
    last_run: Option<DateTime<Utc>>,
    next_run: DateTime<Utc>,
    last_outcome: Option<JobOutcome>,
}

impl ScheduledJob {
    /// Job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recurrence rule, fixed at registration.
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Start time of the most recent run.
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    /// When the job is next due.
    pub fn next_run(&self) -> DateTime<Utc> {
        self.next_run
    }

    /// Outcome of the most recent run.
    pub fn last_outcome(&self) -> Option<JobOutcome> {
        self.last_outcome
    }
}

/// One row of `scheduler status`.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusRow {
    /// Job name.
    pub name: String,
    /// Human-readable cadence.
    pub cadence: String,
    /// Start time of the most recent run.
    pub last_run: Option<DateTime<Utc>>,
    /// When the job is next due.
    pub next_run: DateTime<Utc>,
    /// Outcome of the most recent run.
    pub last_outcome: Option<JobOutcome>,
}

/// In-memory registry of recurring jobs.
#[derive(Debug)]
pub struct SchedulerCore {
    jobs: Vec<ScheduledJob>,
    by_name: HashMap<String, JobId>,
    clock: Arc<dyn Clock>,
}

impl Default for SchedulerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerCore {
    /// Create an empty scheduler on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty scheduler on the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: Vec::new(),
            by_name: HashMap::new(),
            clock,
        }
    }

    /// Current time according to the scheduler's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Add a job. Its first run is the cadence's next trigger after now.
    ///
    /// Fails with a configuration error when `name` is taken or the cadence
    /// has a zero interval.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        cadence: Cadence,
        action: Arc<dyn JobAction>,
    ) -> AppResult<JobId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(AppError::configuration(format!(
                "Job '{name}' is already registered"
            )));
        }
        cadence.validate()?;

        let id = JobId(self.jobs.len());
        let next_run = cadence.next_after(self.clock.now());
        info!(job = %name, %cadence, %next_run, "Registered job");

        self.by_name.insert(name.clone(), id);
        self.jobs.push(ScheduledJob {
            name,
            cadence,
            action,
            last_run: None,
            next_run,
            last_outcome: None,
        });
        Ok(id)
    }

    /// Look up a job by name.
    pub fn find(&self, name: &str) -> Option<JobId> {
        self.by_name.get(name).copied()
    }

    /// The job behind `id`.
    pub fn job(&self, id: JobId) -> Option<&ScheduledJob> {
        self.jobs.get(id.0)
    }

    /// All jobs in registration order.
    pub fn jobs(&self) -> impl Iterator<Item = &ScheduledJob> {
        self.jobs.iter()
    }

    /// Number of registered jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no job is registered.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs with `next_run <= now`, earliest first, ties in registration
    /// order. Does not change any state.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> impl Iterator<Item = JobId> {
        let mut due: Vec<usize> = (0..self.jobs.len())
            .filter(|&i| self.jobs[i].next_run <= now)
            .collect();
        // Stable sort keeps registration order among equal times.
        due.sort_by_key(|&i| self.jobs[i].next_run);
        due.into_iter().map(JobId)
    }

    /// Execute a job now and advance its schedule.
    ///
    /// The action's errors and panics become a `Failure` result; the only
    /// error returned is not-found for an unknown `id`. `last_run` becomes
    /// the start time and `next_run` the cadence's next trigger after it,
    /// pushed past the finish time if the run overran.
    pub async fn run_job(&mut self, id: JobId) -> AppResult<ExecutionResult> {
        let clock = Arc::clone(&self.clock);
        let job = self
            .jobs
            .get_mut(id.0)
            .ok_or_else(|| AppError::not_found(format!("No job with id {}", id.0)))?;

        let run_id = Uuid::new_v4();
        let started_at = clock.now();
        info!(job = %job.name, %run_id, "Starting job");

        let action = Arc::clone(&job.action);
        let result = AssertUnwindSafe(action.run()).catch_unwind().await;
        let finished_at = clock.now();

        let (outcome, error, summary) = match result {
            Ok(Ok(summary)) => (JobOutcome::Success, None, summary),
            Ok(Err(e)) => (JobOutcome::Failure, Some(e.to_string()), None),
            Err(panic) => (
                JobOutcome::Failure,
                Some(format!("Job panicked: {}", panic_message(panic.as_ref()))),
                None,
            ),
        };

        let mut next_run = job.cadence.next_after(started_at);
        if next_run <= finished_at {
            next_run = job.cadence.next_after(finished_at);
        }
        job.last_run = Some(started_at);
        job.next_run = next_run;
        job.last_outcome = Some(outcome);

        let execution = ExecutionResult {
            run_id,
            job_name: job.name.clone(),
            started_at,
            finished_at,
            outcome,
            error,
            summary,
        };

        match &execution.error {
            None => info!(
                job = %execution.job_name,
                %run_id,
                duration_ms = execution.duration_ms(),
                %next_run,
                "Job completed"
            ),
            Some(cause) => error!(
                job = %execution.job_name,
                %run_id,
                %started_at,
                duration_ms = execution.duration_ms(),
                %next_run,
                error = %cause,
                "Job failed"
            ),
        }

        Ok(execution)
    }

    /// Run every due job in order. Returns how many ran.
    pub async fn run_pending(&mut self, now: DateTime<Utc>) -> usize {
        let due: Vec<JobId> = self.due_jobs(now).collect();
        for id in &due {
            // Errors here only mean an unknown id, which due_jobs never yields.
            if let Err(e) = self.run_job(*id).await {
                warn!(error = %e, "Skipped due job");
            }
        }
        due.len()
    }

    /// Run the job called `name` immediately, regardless of `next_run`.
    ///
    /// Fails with not-found when no job has that name.
    pub async fn run_by_name(&mut self, name: &str) -> AppResult<ExecutionResult> {
        let id = self
            .find(name)
            .ok_or_else(|| AppError::not_found(format!("Unknown job: {name}")))?;
        info!(job = name, "Running job on demand");
        self.run_job(id).await
    }

    /// Status rows for every job, in registration order.
    pub fn status(&self) -> Vec<JobStatusRow> {
        self.jobs
            .iter()
            .map(|job| JobStatusRow {
                name: job.name.clone(),
                cadence: job.cadence.to_string(),
                last_run: job.last_run,
                next_run: job.next_run,
                last_outcome: job.last_outcome,
            })
            .collect()
    }

    /// Sleep `interval`, run pending jobs, repeat until `stop` turns true
    /// or its sender is dropped.
    pub async fn poll_loop(&mut self, interval: Duration, mut stop: watch::Receiver<bool>) {
        info!(
            interval_secs = interval.as_secs(),
            jobs = self.jobs.len(),
            "Scheduler loop started"
        );

        loop {
            if *stop.borrow() {
                break;
            }

            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = time::sleep(interval) => {
                    let now = self.clock.now();
                    match AssertUnwindSafe(self.run_pending(now)).catch_unwind().await {
                        Ok(0) => {}
                        Ok(ran) => debug!(ran, "Scheduler tick finished"),
                        Err(panic) => error!(
                            panic = %panic_message(panic.as_ref()),
                            "Scheduler tick panicked, continuing"
                        ),
                    }
                }
            }
        }

        info!("Scheduler loop stopped");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{NaiveTime, TimeZone};
    use contentops_core::ErrorKind;
    use serde_json::Value;

    use super::*;
    use crate::clock::ManualClock;
    use crate::executor::{FnAction, JobExecutionError};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn scheduler() -> (ManualClock, SchedulerCore) {
        let clock = ManualClock::new(t0());
        let core = SchedulerCore::with_clock(Arc::new(clock.clone()));
        (clock, core)
    }

    fn counting(counter: Arc<AtomicUsize>) -> Arc<dyn JobAction> {
        Arc::new(FnAction::new("counting", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<Option<Value>, JobExecutionError>(None)
            }
        }))
    }

    fn failing() -> Arc<dyn JobAction> {
        Arc::new(FnAction::new("failing", || async {
            Err::<Option<Value>, _>(JobExecutionError::Failed("always broken".to_string()))
        }))
    }

    fn panicking() -> Arc<dyn JobAction> {
        Arc::new(FnAction::new("panicking", || async {
            if true {
                panic!("boom");
            }
            Ok::<Option<Value>, JobExecutionError>(None)
        }))
    }

    #[test]
    fn test_duplicate_name_is_configuration_error() {
        let (_clock, mut core) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        core.register("backup", Cadence::EveryHours(1), counting(counter.clone()))
            .unwrap();
        let err = core
            .register("backup", Cadence::EveryHours(2), counting(counter))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(core.len(), 1);
    }

    #[tokio::test]
    async fn test_run_by_unknown_name_is_not_found() {
        let (_clock, mut core) = scheduler();
        let err = core.run_by_name("nightly").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_due_jobs_ordering_and_idempotence() {
        let (_clock, mut core) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        let hourly = core
            .register("hourly", Cadence::EveryHours(1), counting(counter.clone()))
            .unwrap();
        let quarter = core
            .register("quarter", Cadence::EveryMinutes(15), counting(counter.clone()))
            .unwrap();
        let also_hourly = core
            .register("also_hourly", Cadence::EveryHours(1), counting(counter.clone()))
            .unwrap();
        let daily = core
            .register(
                "daily",
                Cadence::Daily {
                    at: NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
                },
                counting(counter),
            )
            .unwrap();

        let now = t0() + chrono::Duration::hours(1);
        let first: Vec<JobId> = core.due_jobs(now).collect();
        let second: Vec<JobId> = core.due_jobs(now).collect();
        assert_eq!(first, vec![quarter, hourly, also_hourly]);
        assert_eq!(first, second);
        assert!(!first.contains(&daily));

        assert_eq!(core.due_jobs(t0()).count(), 0);
    }

    #[tokio::test]
    async fn test_failing_job_does_not_block_others() {
        let (clock, mut core) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        let broken = core
            .register("broken", Cadence::EveryMinutes(30), failing())
            .unwrap();
        let exploding = core
            .register("exploding", Cadence::EveryMinutes(30), panicking())
            .unwrap();
        core.register("healthy", Cadence::EveryMinutes(30), counting(counter.clone()))
            .unwrap();

        clock.advance(chrono::Duration::minutes(30));
        let now = clock.now();
        assert_eq!(core.run_pending(now).await, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        for id in [broken, exploding] {
            let job = core.job(id).unwrap();
            assert_eq!(job.last_outcome(), Some(JobOutcome::Failure));
            assert_eq!(job.last_run(), Some(now));
            assert_eq!(job.next_run(), now + chrono::Duration::minutes(30));
        }

        // Nothing is due again until the next natural tick.
        assert_eq!(core.run_pending(now).await, 0);
    }

    #[tokio::test]
    async fn test_failure_result_carries_cause() {
        let (_clock, mut core) = scheduler();
        core.register("exploding", Cadence::EveryHours(1), panicking())
            .unwrap();
        let result = core.run_by_name("exploding").await.unwrap();
        assert_eq!(result.outcome, JobOutcome::Failure);
        assert!(result.error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_end_to_end_hourly_cadence() {
        let (clock, mut core) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = core
            .register("A", Cadence::EveryHours(1), counting(counter.clone()))
            .unwrap();

        assert_eq!(
            core.due_jobs(t0() - chrono::Duration::seconds(1)).count(),
            0
        );
        let later = t0() + chrono::Duration::hours(1) + chrono::Duration::seconds(1);
        assert_eq!(core.due_jobs(later).collect::<Vec<_>>(), vec![a]);

        clock.set(t0() + chrono::Duration::hours(1));
        let result = core.run_job(a).await.unwrap();
        assert!(result.is_success());
        assert_eq!(
            core.job(a).unwrap().next_run(),
            t0() + chrono::Duration::hours(2)
        );
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_by_name_only_advances_normally() {
        let (clock, mut core) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        core.register("sync", Cadence::EveryHours(6), counting(counter.clone()))
            .unwrap();

        clock.advance(chrono::Duration::hours(1));
        let result = core.run_by_name("sync").await.unwrap();
        assert!(result.is_success());

        let status = core.status();
        assert_eq!(status[0].name, "sync");
        assert_eq!(status[0].cadence, "every 6 hours");
        assert_eq!(status[0].last_run, Some(t0() + chrono::Duration::hours(1)));
        assert_eq!(status[0].next_run, t0() + chrono::Duration::hours(7));
        assert_eq!(status[0].last_outcome, Some(JobOutcome::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_stops_on_signal() {
        let clock = ManualClock::new(t0());
        let mut core = SchedulerCore::with_clock(Arc::new(clock.clone()));
        let counter = Arc::new(AtomicUsize::new(0));
        core.register("tick", Cadence::EveryMinutes(1), counting(counter.clone()))
            .unwrap();
        clock.advance(chrono::Duration::minutes(1));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            core.poll_loop(Duration::from_secs(60), rx).await;
            core
        });

        time::sleep(Duration::from_secs(61)).await;
        tx.send(true).unwrap();
        let core = handle.await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(core.job(JobId(0)).unwrap().last_run().is_some());
    }

    #[test]
    fn test_out_of_range_cadence_is_configuration_error() {
        let (_clock, mut core) = scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        let err = core
            .register("sync", Cadence::EveryHours(u32::MAX), counting(counter))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(core.is_empty());
    }

    #[tokio::test]
    async fn test_overrunning_job_is_not_due_again_when_it_finishes() {
        let (clock, mut core) = scheduler();
        let slow_clock = clock.clone();
        let slow: Arc<dyn JobAction> = Arc::new(FnAction::new("slow", move || {
            let clock = slow_clock.clone();
            async move {
                clock.advance(chrono::Duration::hours(2));
                Ok::<Option<Value>, JobExecutionError>(None)
            }
        }));
        let id = core.register("slow", Cadence::EveryHours(1), slow).unwrap();

        clock.set(t0() + chrono::Duration::hours(1));
        let result = core.run_job(id).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.started_at, t0() + chrono::Duration::hours(1));
        assert_eq!(result.finished_at, t0() + chrono::Duration::hours(3));

        let job = core.job(id).unwrap();
        assert_eq!(job.last_run(), Some(result.started_at));
        assert!(job.next_run() > result.finished_at);
        assert_eq!(job.next_run(), t0() + chrono::Duration::hours(4));
        assert_eq!(core.due_jobs(result.finished_at).count(), 0);
    }

    /// Panics on exactly one call to `now`, counting from 1.
    #[derive(Debug)]
    struct TrippingClock {
        inner: ManualClock,
        calls: AtomicUsize,
        trip_on: usize,
    }

    impl Clock for TrippingClock {
        fn now(&self) -> DateTime<Utc> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.trip_on {
                panic!("clock tripped");
            }
            self.inner.now()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_survives_a_panicking_tick() {
        let manual = ManualClock::new(t0());
        // Call 1 is registration, call 2 the first tick's poll time and
        // call 3 the first job start, which escapes the job boundary.
        let clock = Arc::new(TrippingClock {
            inner: manual.clone(),
            calls: AtomicUsize::new(0),
            trip_on: 3,
        });
        let mut core = SchedulerCore::with_clock(clock.clone());
        let counter = Arc::new(AtomicUsize::new(0));
        core.register("tick", Cadence::EveryMinutes(1), counting(counter.clone()))
            .unwrap();
        manual.advance(chrono::Duration::minutes(1));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            core.poll_loop(Duration::from_secs(60), rx).await;
            core
        });

        time::sleep(Duration::from_secs(61)).await;
        assert!(clock.calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(60)).await;
        tx.send(true).unwrap();
        let core = handle.await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        let job = core.job(JobId(0)).unwrap();
        assert_eq!(job.last_outcome(), Some(JobOutcome::Success));
        assert_eq!(job.last_run(), Some(t0() + chrono::Duration::minutes(1)));
    }
}
