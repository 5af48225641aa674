use crate::domain::error::{ProbeError, ProbeResult};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// How long to keep polling and how often
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Zero runs exactly one pass
    pub duration: Duration,
    pub interval: Duration,
}

impl PollSchedule {
    pub fn once() -> Self {
        Self {
            duration: Duration::ZERO,
            interval: Duration::ZERO,
        }
    }

    pub fn new(duration: Duration, interval: Duration) -> Self {
        Self { duration, interval }
    }
}

/// One pass of a polling loop
#[derive(Debug)]
pub struct PassRecord<T> {
    pub iteration: u32,
    /// Offset of the pass start from the loop start
    pub started_after: Duration,
    pub result: ProbeResult<T>,
}

impl<T> PassRecord<T> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `pass` repeatedly until the schedule's deadline.
///
/// The first pass always runs. After each pass the loop sleeps for the
/// interval, or for whatever is left of the duration if that is shorter,
/// and stops once the deadline is reached. A duration too large to place on
/// the clock has no deadline. Failed passes are recorded and polling
/// continues.
pub async fn poll<T, F, Fut>(schedule: PollSchedule, mut pass: F) -> Vec<PassRecord<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ProbeResult<T>>,
{
    let start = Instant::now();
    let deadline = start.checked_add(schedule.duration);
    if deadline.is_none() {
        warn!("Run duration {:?} has no reachable deadline; polling until stopped", schedule.duration);
    }
    let mut records = Vec::new();
    let mut iteration = 1;

    loop {
        let started_after = start.elapsed();
        debug!("Pass {} starting at {:?}", iteration, started_after);
        let result = pass(iteration).await;
        if let Err(e) = &result {
            error!("Pass {} failed: {}", iteration, e);
        }
        records.push(PassRecord {
            iteration,
            started_after,
            result,
        });

        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        };
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(schedule.interval.min(remaining)).await;
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
        iteration = iteration.saturating_add(1);
    }

    records
}

/// Everything one simulated user did
#[derive(Debug)]
pub struct UserRun<T> {
    /// 1-based
    pub user: usize,
    /// `Err` when the user never got a session (or the task died)
    pub outcome: ProbeResult<Vec<PassRecord<T>>>,
}

impl<T> UserRun<T> {
    /// Logged in and every pass succeeded
    pub fn succeeded(&self) -> bool {
        match &self.outcome {
            Ok(passes) => passes.iter().all(PassRecord::succeeded),
            Err(_) => false,
        }
    }

    pub fn passes(&self) -> &[PassRecord<T>] {
        match &self.outcome {
            Ok(passes) => passes.as_slice(),
            Err(_) => &[],
        }
    }
}

/// Counts across all users, for the final status line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub users: usize,
    pub users_succeeded: usize,
    pub passes: usize,
    pub passes_failed: usize,
}

impl RunTotals {
    pub fn from_runs<T>(runs: &[UserRun<T>]) -> Self {
        let mut totals = Self {
            users: runs.len(),
            ..Self::default()
        };
        for run in runs {
            if run.succeeded() {
                totals.users_succeeded += 1;
            }
            totals.passes += run.passes().len();
            totals.passes_failed += run.passes().iter().filter(|p| !p.succeeded()).count();
        }
        totals
    }

    pub fn all_succeeded(&self) -> bool {
        self.users_succeeded == self.users
    }
}

/// Spawn `users` independent tasks and wait for all of them.
///
/// Tasks share nothing; each builds its own transport and session. The
/// result is ordered by user number, and a task that panics is reported as
/// a failed user instead of tearing down the others.
pub async fn run_users<T, F, Fut>(users: usize, task: F) -> Vec<UserRun<T>>
where
    T: Send + 'static,
    F: Fn(usize) -> Fut,
    Fut: Future<Output = ProbeResult<Vec<PassRecord<T>>>> + Send + 'static,
{
    let mut set = JoinSet::new();
    let mut task_users = HashMap::with_capacity(users);
    for user in 1..=users {
        let span = tracing::info_span!("user", n = user);
        let handle = set.spawn(task(user).instrument(span));
        task_users.insert(handle.id(), user);
    }

    let mut runs = Vec::with_capacity(users);
    while let Some(joined) = set.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => {
                error!("User task did not complete: {}", e);
                (e.id(), Err(ProbeError::Task(e.to_string())))
            }
        };
        match task_users.get(&id) {
            Some(&user) => runs.push(UserRun { user, outcome }),
            None => error!("Finished task {} belongs to no user", id),
        }
    }

    runs.sort_by_key(|r| r.user);
    let totals = RunTotals::from_runs(&runs);
    info!(
        "{} of {} users completed successfully",
        totals.users_succeeded, totals.users
    );
    runs
}
