//! Change accumulation and the single-flight sync heartbeat
//!
//! All scheduler state lives in one actor task. Callers hold a
//! [`SchedulerHandle`] and talk to the actor over a channel. The only state
//! shared with the spawned sync task is the `running` flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use graft_core::ChangeBatch;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// Work performed for every non-empty set of accumulated batches.
#[async_trait::async_trait]
pub trait SyncJob: Send + Sync + 'static {
    async fn sync(&self, batches: Vec<ChangeBatch>);

    /// Whether the job holds work of its own, such as a failed run to
    /// retry. A tick with no queued batches still starts a run when it does.
    fn has_pending(&self) -> bool {
        false
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler has stopped")]
    Stopped,
}

/// Point-in-time view of the scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    /// Batches waiting for the next run.
    pub pending: usize,
    /// A heartbeat deadline is set.
    pub armed: bool,
    /// A sync run is in flight.
    pub running: bool,
    pub runs_started: u64,
}

#[derive(Debug)]
enum Command {
    Notify(ChangeBatch),
    Snapshot(oneshot::Sender<StateSnapshot>),
}

#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Queue a batch for the next run.
    pub fn notify(&self, batch: ChangeBatch) -> Result<(), SchedulerError> {
        self.tx
            .send(Command::Notify(batch))
            .map_err(|_| SchedulerError::Stopped)
    }

    pub async fn snapshot(&self) -> Result<StateSnapshot, SchedulerError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply))
            .map_err(|_| SchedulerError::Stopped)?;
        response.await.map_err(|_| SchedulerError::Stopped)
    }
}

/// Resets the shared flag when a run ends, however it ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler<J: SyncJob> {
    job: Arc<J>,
    interval: Duration,
    rx: mpsc::UnboundedReceiver<Command>,
    pending: Vec<ChangeBatch>,
    deadline: Option<Instant>,
    running: Arc<AtomicBool>,
    runs_started: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl<J: SyncJob> Scheduler<J> {
    pub fn new(job: Arc<J>, interval: Duration) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            job,
            interval,
            rx,
            pending: Vec::new(),
            deadline: None,
            running: Arc::new(AtomicBool::new(false)),
            runs_started: 0,
            in_flight: None,
        };
        (scheduler, SchedulerHandle { tx })
    }

    /// Start the actor on the current runtime.
    pub fn spawn(job: Arc<J>, interval: Duration) -> (SchedulerHandle, JoinHandle<()>) {
        let (scheduler, handle) = Self::new(job, interval);
        (handle, tokio::spawn(scheduler.run()))
    }

    /// Process commands and heartbeats until every handle is gone and no
    /// queued work is left.
    pub async fn run(mut self) {
        info!("Scheduler started with a {:?} heartbeat", self.interval);
        if self.job.has_pending() {
            self.deadline = Some(Instant::now() + self.interval);
        }
        let mut closed = false;

        loop {
            if closed && self.pending.is_empty() && !self.running.load(Ordering::Acquire) {
                break;
            }

            let deadline = self.deadline;
            tokio::select! {
                command = self.rx.recv(), if !closed => match command {
                    Some(Command::Notify(batch)) => self.on_notify(batch),
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    None => {
                        debug!("All scheduler handles dropped");
                        closed = true;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_tick();
                }
            }
        }

        if let Some(run) = self.in_flight.take() {
            let _ = run.await;
        }
        info!("Scheduler stopped after {} runs", self.runs_started);
    }

    fn on_notify(&mut self, batch: ChangeBatch) {
        debug!("Queued batch with {} triples", batch.triple_count());
        self.pending.push(batch);
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.interval);
        }
    }

    fn on_tick(&mut self) {
        self.deadline = None;
        self.try_start();
        // Steady heartbeat, whether or not anything ran.
        self.deadline = Some(Instant::now() + self.interval);
    }

    fn try_start(&mut self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            if !self.pending.is_empty() {
                warn!(
                    "Sync still running, {} queued batches wait for a later tick",
                    self.pending.len()
                );
            }
            return;
        }

        let batches = std::mem::take(&mut self.pending);
        if batches.is_empty() && !self.job.has_pending() {
            self.running.store(false, Ordering::Release);
            return;
        }

        self.runs_started += 1;
        info!("Starting sync run {} for {} batches", self.runs_started, batches.len());

        let job = Arc::clone(&self.job);
        let guard = RunningGuard(Arc::clone(&self.running));
        self.in_flight = Some(tokio::spawn(async move {
            let _guard = guard;
            job.sync(batches).await;
        }));
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            pending: self.pending.len(),
            armed: self.deadline.is_some(),
            running: self.running.load(Ordering::Acquire),
            runs_started: self.runs_started,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::{Changeset, DeltaTerm, DeltaTriple};
    use std::sync::atomic::AtomicUsize;
    use tokio::time::timeout;

    const INTERVAL: Duration = Duration::from_secs(10);

    struct RecordingJob {
        started: mpsc::UnboundedSender<(Instant, Vec<ChangeBatch>)>,
        work: Duration,
        active: AtomicUsize,
        max_active: AtomicUsize,
        panic_first: AtomicBool,
        /// Runs the job still owes itself.
        leftover: AtomicUsize,
    }

    type Started = mpsc::UnboundedReceiver<(Instant, Vec<ChangeBatch>)>;

    impl RecordingJob {
        fn new(work: Duration) -> (Arc<Self>, Started) {
            let (started, rx) = mpsc::unbounded_channel();
            let job = Arc::new(Self {
                started,
                work,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                panic_first: AtomicBool::new(false),
                leftover: AtomicUsize::new(0),
            });
            (job, rx)
        }
    }

    #[async_trait::async_trait]
    impl SyncJob for RecordingJob {
        async fn sync(&self, batches: Vec<ChangeBatch>) {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            let batches_were_empty = batches.is_empty();
            let _ = self.started.send((Instant::now(), batches));
            if self.panic_first.swap(false, Ordering::SeqCst) {
                self.active.fetch_sub(1, Ordering::SeqCst);
                panic!("sync blew up");
            }
            tokio::time::sleep(self.work).await;
            if batches_were_empty {
                self.leftover.fetch_sub(1, Ordering::SeqCst);
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
        }

        fn has_pending(&self) -> bool {
            self.leftover.load(Ordering::SeqCst) > 0
        }
    }

    fn batch(subject: &str) -> ChangeBatch {
        ChangeBatch::new(vec![Changeset {
            inserts: vec![DeltaTriple::new(
                subject,
                "http://ex/p",
                DeltaTerm::literal("v"),
            )],
            deletes: Vec::new(),
        }])
    }

    fn subjects(batches: &[ChangeBatch]) -> Vec<String> {
        batches
            .iter()
            .flat_map(ChangeBatch::triples)
            .map(|triple| triple.subject.value.clone())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_runs_after_one_interval() {
        let (job, mut started) = RecordingJob::new(Duration::from_secs(1));
        let (handle, _actor) = Scheduler::spawn(job, INTERVAL);
        let t0 = Instant::now();

        tokio_test::assert_ok!(handle.notify(batch("http://ex/a")));
        tokio_test::assert_ok!(handle.notify(batch("http://ex/b")));

        let (at, batches) = started.recv().await.unwrap();
        assert!(at - t0 >= INTERVAL);
        assert!(at - t0 < INTERVAL + Duration::from_secs(1));
        assert_eq!(subjects(&batches), vec!["http://ex/a", "http://ex/b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_reports_armed_and_pending() {
        let (job, _started) = RecordingJob::new(Duration::ZERO);
        let (handle, _actor) = Scheduler::spawn(job, INTERVAL);

        let idle = handle.snapshot().await.unwrap();
        assert_eq!(
            idle,
            StateSnapshot {
                pending: 0,
                armed: false,
                running: false,
                runs_started: 0
            }
        );

        handle.notify(batch("http://ex/a")).unwrap();
        let queued = handle.snapshot().await.unwrap();
        assert!(queued.armed);
        assert_eq!(queued.pending, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notification_during_run_is_picked_up_later() {
        // Each run outlasts two heartbeats.
        let (job, mut started) = RecordingJob::new(INTERVAL * 5 / 2);
        let (handle, _actor) = Scheduler::spawn(Arc::clone(&job), INTERVAL);

        handle.notify(batch("http://ex/first")).unwrap();
        let (first_at, first) = started.recv().await.unwrap();
        assert_eq!(subjects(&first), vec!["http://ex/first"]);

        handle.notify(batch("http://ex/second")).unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.running);
        assert_eq!(snapshot.pending, 1);

        let (second_at, second) = started.recv().await.unwrap();
        assert_eq!(subjects(&second), vec!["http://ex/second"]);
        assert!(second_at - first_at >= INTERVAL * 5 / 2);
        assert_eq!(job.max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_heartbeat_starts_nothing() {
        let (job, mut started) = RecordingJob::new(Duration::ZERO);
        let (handle, _actor) = Scheduler::spawn(job, INTERVAL);

        handle.notify(batch("http://ex/a")).unwrap();
        started.recv().await.unwrap();

        tokio::time::sleep(INTERVAL * 10).await;
        assert!(started.try_recv().is_err());
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.armed);
        assert_eq!(snapshot.runs_started, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_backlog_runs_without_new_batches() {
        let (job, mut started) = RecordingJob::new(Duration::ZERO);
        job.leftover.store(1, Ordering::SeqCst);
        let (handle, _actor) = Scheduler::spawn(Arc::clone(&job), INTERVAL);
        let t0 = Instant::now();

        // Armed at startup because the job has work of its own.
        assert!(handle.snapshot().await.unwrap().armed);
        let (at, batches) = started.recv().await.unwrap();
        assert!(batches.is_empty());
        assert!(at - t0 >= INTERVAL);

        tokio::time::sleep(INTERVAL * 5).await;
        assert!(started.try_recv().is_err());
        assert_eq!(handle.snapshot().await.unwrap().runs_started, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_run_releases_the_flag() {
        let (job, mut started) = RecordingJob::new(Duration::ZERO);
        job.panic_first.store(true, Ordering::SeqCst);
        let (handle, _actor) = Scheduler::spawn(job, INTERVAL);

        handle.notify(batch("http://ex/a")).unwrap();
        started.recv().await.unwrap();

        handle.notify(batch("http://ex/b")).unwrap();
        let (_, batches) = started.recv().await.unwrap();
        assert_eq!(subjects(&batches), vec!["http://ex/b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_drains_queue_then_stops_when_handles_drop() {
        let (job, mut started) = RecordingJob::new(Duration::from_secs(1));
        let (handle, actor) = Scheduler::spawn(job, INTERVAL);

        handle.notify(batch("http://ex/a")).unwrap();
        drop(handle);

        timeout(INTERVAL * 3, actor).await.unwrap().unwrap();
        let (_, batches) = started.recv().await.unwrap();
        assert_eq!(subjects(&batches), vec!["http://ex/a"]);
    }

    #[tokio::test]
    async fn test_notify_fails_once_actor_is_gone() {
        let (job, _started) = RecordingJob::new(Duration::ZERO);
        let (handle, actor) = Scheduler::spawn(job, INTERVAL);
        actor.abort();
        let _ = actor.await;

        assert!(matches!(
            handle.notify(batch("http://ex/a")),
            Err(SchedulerError::Stopped)
        ));
    }
}
