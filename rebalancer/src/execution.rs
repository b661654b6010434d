//! Order execution: sell phase, wait, buy phase, wait.
//!
//! Sells go first so their proceeds are available to the buys. After each
//! phase the broker's open-order list is polled until it is empty; the
//! configured wait limit and the stop signal both cut the wait short. A
//! rejected order is recorded and the phase carries on with the next one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use capweight::{OrderDiff, Symbol};
use capweight_broker::{Broker, BrokerOrder, BrokerSide, OrderId};
use log::{debug, info, warn};

use crate::audit::{self, AuditLog};
use crate::error::{Error, Result};

/// Longest single sleep between stop-signal checks.
const STOP_CHECK: Duration = Duration::from_millis(100);

/// Cloneable cancellation flag shared between the worker and whoever stops it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early if stopped.
    ///
    /// Returns `false` if the signal was raised before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(STOP_CHECK));
        }
    }
}

/// Knobs for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Delay between open-order polls.
    pub poll_interval: Duration,
    /// Give up on a phase after this long; `None` waits indefinitely.
    pub max_wait: Option<Duration>,
    /// Log the orders instead of submitting them.
    pub dry_run: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_wait: Some(Duration::from_secs(600)),
            dry_run: false,
        }
    }
}

/// What happened to one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Submitted(OrderId),
    /// The broker refused the order; the message is the broker's.
    Failed(String),
    /// Not sent: dry run.
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOutcome {
    pub symbol: Symbol,
    pub side: BrokerSide,
    pub quantity: u64,
    pub status: OrderStatus,
}

impl OrderOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, OrderStatus::Failed(_))
    }
}

/// Result of one side's submissions and wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub side: BrokerSide,
    pub outcomes: Vec<OrderOutcome>,
    /// Time spent waiting for open orders to clear.
    pub waited: Duration,
}

impl PhaseReport {
    fn new(side: BrokerSide) -> Self {
        Self {
            side,
            outcomes: Vec::new(),
            waited: Duration::ZERO,
        }
    }

    pub fn submitted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OrderStatus::Submitted(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

/// Both phases of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub sells: PhaseReport,
    pub buys: PhaseReport,
}

impl ExecutionReport {
    /// Orders the broker accepted.
    pub fn submitted(&self) -> usize {
        self.sells.submitted() + self.buys.submitted()
    }

    /// Orders the broker refused.
    pub fn failed(&self) -> usize {
        self.sells.failed() + self.buys.failed()
    }

    /// Every outcome, sells first.
    pub fn outcomes(&self) -> impl Iterator<Item = &OrderOutcome> {
        self.sells.outcomes.iter().chain(&self.buys.outcomes)
    }

    pub fn failures(&self) -> impl Iterator<Item = &OrderOutcome> {
        self.outcomes().filter(|o| o.is_failed())
    }
}

/// Submits an order diff through a broker.
pub struct Executor<'a> {
    broker: &'a dyn Broker,
    options: ExecutionOptions,
    stop: StopSignal,
    audit: Option<&'a mut AuditLog>,
}

impl<'a> Executor<'a> {
    pub fn new(broker: &'a dyn Broker, options: ExecutionOptions) -> Self {
        Self {
            broker,
            options,
            stop: StopSignal::new(),
            audit: None,
        }
    }

    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_audit(mut self, audit: &'a mut AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Run the sell phase, then the buy phase.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if the stop signal is already raised; nothing is submitted
    /// - [`Error::Halted`] if a phase cannot finish, carrying the outcomes so far
    ///   and one of:
    ///   - [`Error::Broker`] if the open-order listing fails
    ///   - [`Error::OrdersDidNotClear`] if a phase outlives `max_wait`
    ///   - [`Error::Cancelled`] if the stop signal is raised mid-wait
    pub fn execute(&mut self, diff: &OrderDiff) -> Result<ExecutionReport> {
        if self.stop.is_stopped() {
            return Err(Error::Cancelled);
        }
        let mut report = ExecutionReport {
            sells: PhaseReport::new(BrokerSide::Sell),
            buys: PhaseReport::new(BrokerSide::Buy),
        };

        let mut phases = self.run_phase(&mut report.sells, &diff.sells());
        if phases.is_ok() {
            phases = self.run_phase(&mut report.buys, &diff.buys());
        }
        match phases {
            Ok(()) => Ok(report),
            Err(source) => {
                warn!(
                    "execution halted with {} submitted, {} failed",
                    report.submitted(),
                    report.failed()
                );
                Err(Error::Halted {
                    report: Box::new(report),
                    source: Box::new(source),
                })
            }
        }
    }

    fn run_phase(&mut self, phase: &mut PhaseReport, orders: &[(Symbol, u64)]) -> Result<()> {
        let side = phase.side;
        info!("{side} phase: {} order(s)", orders.len());

        for &(symbol, quantity) in orders {
            let outcome = self.submit(symbol, side, quantity);
            self.record(|a| audit::log_order(a, &outcome));
            phase.outcomes.push(outcome);
        }

        if self.options.dry_run {
            return Ok(());
        }

        phase.waited = self.wait_for_clear(side)?;
        info!(
            "{side} phase cleared after {:.1}s ({} failed)",
            phase.waited.as_secs_f64(),
            phase.failed()
        );
        self.record(|a| audit::log_phase_cleared(a, phase));
        Ok(())
    }

    fn submit(&self, symbol: Symbol, side: BrokerSide, quantity: u64) -> OrderOutcome {
        let status = if self.options.dry_run {
            info!("[DRY RUN] {side} {quantity} {symbol}");
            OrderStatus::DryRun
        } else {
            let order = BrokerOrder::market_day(symbol, side, quantity);
            match self.broker.submit_order(&order) {
                Ok(id) => {
                    debug!("{side} {quantity} {symbol}: submitted as {id}");
                    OrderStatus::Submitted(id)
                }
                Err(e) => {
                    warn!("{side} {quantity} {symbol} rejected: {e}");
                    OrderStatus::Failed(e.to_string())
                }
            }
        };
        OrderOutcome {
            symbol,
            side,
            quantity,
            status,
        }
    }

    /// Poll until the broker reports no open orders.
    fn wait_for_clear(&self, side: BrokerSide) -> Result<Duration> {
        let start = Instant::now();
        loop {
            let open = self.broker.open_orders()?;
            let waited = start.elapsed();
            if open.is_empty() {
                return Ok(waited);
            }
            if self.options.max_wait.is_some_and(|max| waited >= max) {
                return Err(Error::OrdersDidNotClear {
                    side,
                    open: open.len(),
                    waited_secs: waited.as_secs(),
                });
            }
            debug!("{} open order(s), waiting", open.len());
            if !self.stop.sleep(self.options.poll_interval) {
                return Err(Error::Cancelled);
            }
        }
    }

    /// Audit writes never abort a phase that already has orders in flight.
    fn record(&mut self, write: impl FnOnce(&mut AuditLog) -> Result<()>) {
        if let Some(audit) = self.audit.as_deref_mut() {
            if let Err(e) = write(audit) {
                warn!("audit write failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_signal_shared_between_clones() {
        let stop = StopSignal::new();
        let other = stop.clone();
        assert!(!other.is_stopped());
        stop.stop();
        assert!(other.is_stopped());
    }

    #[test]
    fn sleep_returns_early_when_stopped() {
        let stop = StopSignal::new();
        assert!(stop.sleep(Duration::from_millis(1)));

        stop.stop();
        let start = Instant::now();
        assert!(!stop.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn default_options() {
        let opts = ExecutionOptions::default();
        assert_eq!(opts.poll_interval, Duration::from_secs(1));
        assert_eq!(opts.max_wait, Some(Duration::from_secs(600)));
        assert!(!opts.dry_run);
    }

    #[test]
    fn report_counts() {
        let outcome = |sym: &str, status| OrderOutcome {
            symbol: Symbol::new(sym),
            side: BrokerSide::Sell,
            quantity: 1,
            status,
        };
        let mut sells = PhaseReport::new(BrokerSide::Sell);
        sells
            .outcomes
            .push(outcome("AAA", OrderStatus::Submitted(OrderId("1".into()))));
        sells
            .outcomes
            .push(outcome("BBB", OrderStatus::Failed("no".into())));
        let mut buys = PhaseReport::new(BrokerSide::Buy);
        buys.outcomes.push(outcome("CCC", OrderStatus::DryRun));

        let report = ExecutionReport { sells, buys };
        assert_eq!(report.submitted(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.outcomes().count(), 3);
        let failures: Vec<_> = report.failures().map(|o| o.symbol).collect();
        assert_eq!(failures, vec![Symbol::new("BBB")]);
    }
}
