//! Once-per-trading-day scheduling.
//!
//! The scheduler polls the broker clock and runs the rebalance job on the
//! first poll of each trading day at or after the cutoff time. Dates and
//! times are read at the exchange's own UTC offset, as the clock reports it.

use std::collections::BTreeSet;
use std::time::Duration;

use capweight_broker::{Broker, CalendarDay};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use log::{debug, error, info, warn};
use serde::Deserialize;

use crate::error::Result;
use crate::execution::StopSignal;

/// What to do with a trading day whose rebalance failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Count the day as done; the next attempt is the next trading day.
    #[default]
    MarkAttempted,
    /// Try again on the next poll of the same day.
    Retry,
}

/// Outcome of one scheduler poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Nothing due.
    Idle,
    Rebalanced(NaiveDate),
    Failed(NaiveDate),
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    calendar: BTreeSet<NaiveDate>,
    last_rebalance: Option<NaiveDate>,
    cutoff: NaiveTime,
    policy: FailurePolicy,
}

impl Scheduler {
    pub fn new(
        calendar: impl IntoIterator<Item = NaiveDate>,
        cutoff: NaiveTime,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            calendar: calendar.into_iter().collect(),
            last_rebalance: None,
            cutoff,
            policy,
        }
    }

    pub fn from_calendar(days: &[CalendarDay], cutoff: NaiveTime, policy: FailurePolicy) -> Self {
        Self::new(days.iter().map(|d| d.date), cutoff, policy)
    }

    pub fn last_rebalance(&self) -> Option<NaiveDate> {
        self.last_rebalance
    }

    /// The trading date to rebalance for at `now`, if one is due.
    pub fn due(&self, now: DateTime<FixedOffset>) -> Option<NaiveDate> {
        let local = now.naive_local();
        let date = local.date();
        let due = self.calendar.contains(&date)
            && self.last_rebalance != Some(date)
            && local.time() >= self.cutoff;
        due.then_some(date)
    }

    /// Note the result of a rebalance for `date`.
    pub fn record(&mut self, date: NaiveDate, succeeded: bool) {
        if succeeded || self.policy == FailurePolicy::MarkAttempted {
            self.last_rebalance = Some(date);
        }
    }

    /// Read the clock once and run `job` if a rebalance is due.
    ///
    /// Only a clock read failure is returned as an error; a failed job is
    /// logged and reported as [`Tick::Failed`].
    pub fn poll_once<F>(&mut self, broker: &dyn Broker, job: &mut F) -> Result<Tick>
    where
        F: FnMut() -> Result<()>,
    {
        let clock = broker.clock()?;
        let Some(date) = self.due(clock.timestamp) else {
            return Ok(Tick::Idle);
        };

        info!("Rebalancing for {date}");
        match job() {
            Ok(()) => {
                self.record(date, true);
                Ok(Tick::Rebalanced(date))
            }
            Err(e) => {
                error!("Rebalance for {date} failed: {e}");
                self.record(date, false);
                Ok(Tick::Failed(date))
            }
        }
    }

    /// Poll every `poll_interval` until `stop` is raised.
    pub fn run<F>(
        &mut self,
        broker: &dyn Broker,
        mut job: F,
        stop: &StopSignal,
        poll_interval: Duration,
    ) where
        F: FnMut() -> Result<()>,
    {
        info!(
            "Scheduler started: {} trading day(s), cutoff {}, {:?} on failure",
            self.calendar.len(),
            self.cutoff,
            self.policy
        );
        while !stop.is_stopped() {
            match self.poll_once(broker, &mut job) {
                Ok(tick) => debug!("Scheduler tick: {tick:?}"),
                Err(e) => warn!("Clock read failed: {e}"),
            }
            if !stop.sleep(poll_interval) {
                break;
            }
        }
        info!("Scheduler stopped");
    }
}
