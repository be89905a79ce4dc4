//! Daily birthday trigger.
//!
//! # Responsibility
//! - Fire once a day at a fixed wall-clock time in a fixed named time zone.
//! - Resolve tomorrow's honorees and drive the dispatcher over them.
//! - Contain every run failure, including panics, at the run boundary.
//!
//! # Invariants
//! - `start` never blocks; the trigger loop lives on its own task.
//! - Each trigger instant is strictly later than the previous one, so a
//!   timer that wakes a little early cannot fire the same day twice.
//! - Shutdown lets an in-flight run finish before the loop exits.

use crate::db::{lock_shared, SharedConnection};
use crate::notify::dispatcher::{DispatchReport, NotificationDispatcher};
use crate::notify::job::NotificationJob;
use crate::notify::transport::MailTransport;
use crate::repo::user_repo::RepoError;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// When and how the daily run fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Zone in which `fire_at` and "tomorrow" are evaluated.
    pub time_zone: Tz,
    /// Local wall-clock time of the daily trigger.
    pub fire_at: NaiveTime,
    /// Upper bound for a single transport call.
    pub send_timeout: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time_zone: chrono_tz::Europe::Moscow,
            fire_at: NaiveTime::from_hms_opt(12, 15, 0).expect("12:15 is a valid time"),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleConfigError {
    UnknownTimeZone(String),
    InvalidFireAt(String),
    ZeroSendTimeout,
}

impl Display for ScheduleConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTimeZone(value) => write!(f, "unknown time zone `{value}`"),
            Self::InvalidFireAt(value) => {
                write!(f, "invalid trigger time `{value}`; expected HH:MM")
            }
            Self::ZeroSendTimeout => write!(f, "send timeout must be greater than zero"),
        }
    }
}

impl Error for ScheduleConfigError {}

impl ScheduleConfig {
    /// Builds a config from textual settings.
    ///
    /// `time_zone` is an IANA name such as `Europe/Moscow`; `fire_at` is
    /// `HH:MM` in 24-hour form.
    pub fn parse(
        time_zone: &str,
        fire_at: &str,
        send_timeout: Duration,
    ) -> Result<Self, ScheduleConfigError> {
        let time_zone = time_zone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ScheduleConfigError::UnknownTimeZone(time_zone.to_string()))?;
        let fire_at = NaiveTime::parse_from_str(fire_at.trim(), "%H:%M")
            .map_err(|_| ScheduleConfigError::InvalidFireAt(fire_at.to_string()))?;
        if send_timeout.is_zero() {
            return Err(ScheduleConfigError::ZeroSendTimeout);
        }
        Ok(Self {
            time_zone,
            fire_at,
            send_timeout,
        })
    }

    /// Local calendar date of `now` in the configured zone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.time_zone).date_naive()
    }
}

/// Returns the first trigger instant strictly after `after`.
///
/// A wall-clock time skipped by a DST jump resolves one hour later; an
/// ambiguous one resolves to its earlier occurrence.
pub fn next_trigger_after(config: &ScheduleConfig, after: DateTime<Utc>) -> DateTime<Utc> {
    let mut date = config.local_date(after);
    for _ in 0..3 {
        if let Some(candidate) = local_instant(config.time_zone, date.and_time(config.fire_at)) {
            if candidate > after {
                return candidate;
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    after + chrono::Duration::days(1)
}

fn local_instant(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(local + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|instant| instant.with_timezone(&Utc))
}

/// Why a single run was abandoned.
#[derive(Debug)]
pub enum RunError {
    /// Directory or subscription reads failed.
    Store(RepoError),
    /// `trigger_date + 1` is not representable.
    Calendar(NaiveDate),
    /// The blocking read task died.
    Worker(String),
}

impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Calendar(date) => write!(f, "no calendar day after {date}"),
            Self::Worker(message) => write!(f, "resolution task failed: {message}"),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RunError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger_date: NaiveDate,
    pub birthday_date: NaiveDate,
    pub honorees: usize,
    /// Honorees nobody follows; no transport call was made for them.
    pub skipped_without_subscribers: usize,
    pub dispatches: Vec<DispatchReport>,
}

impl RunReport {
    pub fn attempts(&self) -> usize {
        self.dispatches.iter().map(DispatchReport::attempts).sum()
    }

    pub fn delivered(&self) -> usize {
        self.dispatches
            .iter()
            .map(DispatchReport::delivered_count)
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.dispatches.iter().map(DispatchReport::failed_count).sum()
    }
}

/// Lifecycle of the trigger loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next trigger.
    Idle,
    /// Trigger fired; run about to start.
    Triggered,
    Running,
    /// Loop exited after shutdown.
    Stopped,
}

/// Daily birthday reminder job.
pub struct BirthdayScheduler {
    conn: SharedConnection,
    dispatcher: NotificationDispatcher,
    config: ScheduleConfig,
}

impl BirthdayScheduler {
    pub fn new(
        conn: SharedConnection,
        transport: Arc<dyn MailTransport>,
        config: ScheduleConfig,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(transport, config.send_timeout);
        Self {
            conn,
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Spawns the trigger loop on the current tokio runtime and returns at once.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        info!(
            "event=scheduler_start module=notify status=ok time_zone={} fire_at={}",
            self.config.time_zone,
            self.config.fire_at.format("%H:%M")
        );
        let task = tokio::spawn(trigger_loop(Arc::new(self), shutdown_rx, state_tx));
        SchedulerHandle {
            shutdown_tx,
            state_rx,
            task,
        }
    }

    /// Runs the job for the local date of `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunReport, RunError> {
        self.run_for_date(self.config.local_date(now)).await
    }

    /// Announces the birthdays of `trigger_date + 1`.
    ///
    /// # Errors
    /// Storage failures abandon the run; delivery failures never do.
    pub async fn run_for_date(&self, trigger_date: NaiveDate) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let birthday_date = trigger_date
            .checked_add_days(Days::new(1))
            .ok_or(RunError::Calendar(trigger_date))?;
        info!(
            "event=birthday_run module=notify status=start run_id={run_id} trigger_date={trigger_date} birthday_date={birthday_date}"
        );

        let conn = Arc::clone(&self.conn);
        let job = tokio::task::spawn_blocking(move || {
            let conn = lock_shared(&conn);
            NotificationJob::resolve(&conn, trigger_date, birthday_date)
        })
        .await
        .map_err(|err| RunError::Worker(err.to_string()))??;

        let mut report = RunReport {
            run_id,
            trigger_date,
            birthday_date,
            honorees: job.batches.len(),
            skipped_without_subscribers: 0,
            dispatches: Vec::new(),
        };

        if job.is_empty() {
            info!(
                "event=birthday_run module=notify status=ok run_id={run_id} honorees=0 reason=no_birthdays"
            );
            return Ok(report);
        }

        for batch in &job.batches {
            if batch.subscribers.is_empty() {
                info!(
                    "event=honoree_skip module=notify status=ok run_id={run_id} honoree_id={} reason=no_subscribers",
                    batch.honoree.id
                );
                report.skipped_without_subscribers += 1;
                continue;
            }
            let dispatch = self
                .dispatcher
                .notify_honoree(&batch.honoree, &batch.subscribers)
                .await;
            report.dispatches.push(dispatch);
        }

        info!(
            "event=birthday_run module=notify status=ok run_id={run_id} honorees={} skipped={} delivered={} failed={}",
            report.honorees,
            report.skipped_without_subscribers,
            report.delivered(),
            report.failed()
        );
        Ok(report)
    }

    /// Runs the job on its own task so that errors and panics stay inside it.
    ///
    /// Returns `None` when the run was abandoned.
    pub async fn run_isolated(self: &Arc<Self>, now: DateTime<Utc>) -> Option<RunReport> {
        let scheduler = Arc::clone(self);
        match tokio::spawn(async move { scheduler.run_once(now).await }).await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(err)) => {
                error!("event=birthday_run module=notify status=error error={err}");
                None
            }
            Err(join_err) => {
                error!(
                    "event=birthday_run module=notify status=error error_code=run_aborted panicked={} error={}",
                    join_err.is_panic(),
                    join_err
                );
                None
            }
        }
    }
}

async fn trigger_loop(
    scheduler: Arc<BirthdayScheduler>,
    mut shutdown_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<SchedulerState>,
) {
    let mut last_trigger: Option<DateTime<Utc>> = None;
    loop {
        let now = Utc::now();
        let after = last_trigger.map_or(now, |last| last.max(now));
        let next = next_trigger_after(&scheduler.config, after);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(
            "event=scheduler_wait module=notify status=ok next_trigger={} wait_secs={}",
            next.to_rfc3339(),
            wait.as_secs()
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown_rx.changed() => break,
        }

        last_trigger = Some(next);
        state_tx.send_replace(SchedulerState::Triggered);
        state_tx.send_replace(SchedulerState::Running);
        scheduler.run_isolated(next).await;
        state_tx.send_replace(SchedulerState::Idle);
    }

    state_tx.send_replace(SchedulerState::Stopped);
    info!("event=scheduler_stop module=notify status=ok");
}

/// Owner-side handle of a started scheduler.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<SchedulerState>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// Returns a receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state_rx.clone()
    }

    /// Stops the loop, waiting for an in-flight run to finish.
    ///
    /// Returns the final loop state.
    pub async fn shutdown(self) -> SchedulerState {
        // Err only when the loop already exited.
        let _ = self.shutdown_tx.send(true);
        if let Err(err) = self.task.await {
            error!("event=scheduler_stop module=notify status=error error={err}");
        }
        *self.state_rx.borrow()
    }
}
