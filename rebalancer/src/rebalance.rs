//! One rebalance: membership, quotes, account, targets, diff, orders.

use capweight::{
    Holdings, OrderDiff, QuoteTable, Symbol, TargetTable, compute_targets, parse_portfolio_value,
};
use capweight_broker::Broker;
use capweight_marketdata::{MAX_BATCH, MembershipSource, QuoteProvider};
use log::{error, info, warn};

use crate::aggregate::fetch_quotes;
use crate::audit::{self, AuditLog};
use crate::error::Result;
use crate::execution::{ExecutionOptions, ExecutionReport, Executor, StopSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceOptions {
    /// Symbols per quote batch.
    pub batch_size: usize,
    pub execution: ExecutionOptions,
}

impl Default for RebalanceOptions {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH,
            execution: ExecutionOptions::default(),
        }
    }
}

/// Everything computed before the first order goes out.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancePlan {
    /// Index members as the membership source listed them.
    pub symbols: Vec<Symbol>,
    pub quotes: QuoteTable,
    pub portfolio_value: f64,
    pub targets: TargetTable,
    pub diff: OrderDiff,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceSummary {
    pub plan: RebalancePlan,
    pub report: ExecutionReport,
}

/// Wires the three collaborators together for one rebalance.
pub struct Rebalancer<'a> {
    membership: &'a dyn MembershipSource,
    quotes: &'a dyn QuoteProvider,
    broker: &'a dyn Broker,
    options: RebalanceOptions,
    stop: StopSignal,
    audit: Option<&'a mut AuditLog>,
}

impl<'a> Rebalancer<'a> {
    pub fn new(
        membership: &'a dyn MembershipSource,
        quotes: &'a dyn QuoteProvider,
        broker: &'a dyn Broker,
        options: RebalanceOptions,
    ) -> Self {
        Self {
            membership,
            quotes,
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

    /// Compute targets and the order diff without submitting anything.
    pub fn plan(&self) -> Result<RebalancePlan> {
        let symbols = self.membership.index_symbols()?;
        info!("Index has {} member(s)", symbols.len());

        let quotes = fetch_quotes(self.quotes, &symbols, self.options.batch_size)?;

        let account = self.broker.account()?;
        let portfolio_value = parse_portfolio_value(&account.portfolio_value)?;
        let holdings: Holdings = self
            .broker
            .positions()?
            .iter()
            .map(|p| (p.symbol, p.quantity))
            .collect();

        let targets = compute_targets(&quotes, &holdings, portfolio_value)?;
        let diff = targets.diff();
        info!(
            "Portfolio ${portfolio_value:.2}: {} target row(s), {} order(s)",
            targets.len(),
            diff.len()
        );

        Ok(RebalancePlan {
            symbols,
            quotes,
            portfolio_value,
            targets,
            diff,
        })
    }

    /// Plan, then execute the diff: every sell, wait, every buy, wait.
    pub fn rebalance(&mut self) -> Result<RebalanceSummary> {
        let dry_run = self.options.execution.dry_run;
        self.audit_write(|a| audit::log_run_started(a, dry_run));

        let result = self.plan_and_execute();
        match &result {
            Ok(summary) => {
                info!(
                    "Rebalance complete: {} submitted, {} failed",
                    summary.report.submitted(),
                    summary.report.failed()
                );
                self.audit_write(|a| audit::log_run_completed(a, &summary.report));
            }
            Err(e) => {
                error!("Rebalance failed: {e}");
                self.audit_write(|a| audit::log_run_failed(a, e));
            }
        }
        result
    }

    fn plan_and_execute(&mut self) -> Result<RebalanceSummary> {
        let plan = self.plan()?;
        self.audit_write(|a| audit::log_plan(a, &plan));

        let mut executor =
            Executor::new(self.broker, self.options.execution).with_stop(self.stop.clone());
        if let Some(audit) = self.audit.as_deref_mut() {
            executor = executor.with_audit(audit);
        }
        let report = executor.execute(&plan.diff)?;

        Ok(RebalanceSummary { plan, report })
    }

    fn audit_write(&mut self, write: impl FnOnce(&mut AuditLog) -> Result<()>) {
        if let Some(audit) = self.audit.as_deref_mut() {
            if let Err(e) = write(audit) {
                warn!("audit write failed: {e}");
            }
        }
    }
}
