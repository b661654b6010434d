//! CLI command bodies: scheduler loop, one-off rebalance, and read-only views.

use capweight_broker::Broker;
use log::info;

use crate::audit::AuditLog;
use crate::clients::{self, Clients};
use crate::config::Config;
use crate::error::Result;
use crate::execution::{ExecutionReport, OrderStatus, StopSignal};
use crate::rebalance::{RebalanceOptions, RebalancePlan, RebalanceSummary, Rebalancer};
use crate::scheduler::Scheduler;

fn options(config: &Config, dry_run: bool) -> RebalanceOptions {
    let mut execution = config.execution_options();
    execution.dry_run |= dry_run;
    RebalanceOptions {
        batch_size: config.market_data.batch_size,
        execution,
    }
}

fn open_audit(config: &Config) -> Result<Option<AuditLog>> {
    if !config.logging.audit {
        return Ok(None);
    }
    Ok(Some(AuditLog::open(&config.audit_path())?))
}

fn rebalance_once(
    clients: &Clients,
    options: RebalanceOptions,
    audit: Option<&mut AuditLog>,
    stop: &StopSignal,
) -> Result<RebalanceSummary> {
    let mut rebalancer = Rebalancer::new(
        &clients.membership,
        &clients.quotes,
        &clients.broker,
        options,
    )
    .with_stop(stop.clone());
    if let Some(audit) = audit {
        rebalancer = rebalancer.with_audit(audit);
    }
    rebalancer.rebalance().inspect_err(|e| {
        if let Some(report) = e.partial_report() {
            println!("\nOrders placed before the run halted:");
            display_report(report);
        }
    })
}

/// Long-running mode: rebalance once per trading day until stopped.
pub fn run_scheduler(config: &Config, stop: &StopSignal) -> Result<()> {
    let clients = Clients::connect(config)?;
    let calendar = clients.broker.calendar()?;
    let mut scheduler = Scheduler::from_calendar(
        &calendar,
        config.cutoff()?,
        config.schedule.on_failure,
    );
    let mut audit = open_audit(config)?;
    let options = options(config, false);

    scheduler.run(
        &clients.broker,
        || {
            let summary = rebalance_once(&clients, options, audit.as_mut(), stop)?;
            display_report(&summary.report);
            Ok(())
        },
        stop,
        config.schedule_poll_interval(),
    );
    Ok(())
}

/// Rebalance immediately, ignoring the calendar.
pub fn run_once(config: &Config, dry_run: bool, stop: &StopSignal) -> Result<()> {
    let clients = Clients::connect(config)?;
    let mut audit = open_audit(config)?;
    let summary = rebalance_once(&clients, options(config, dry_run), audit.as_mut(), stop)?;

    display_plan(&summary.plan);
    display_report(&summary.report);
    if config.logging.audit {
        println!("Audit logged to {}", config.audit_path().display());
    }
    Ok(())
}

/// Print the target table and diff without trading.
pub fn show_plan(config: &Config) -> Result<()> {
    let clients = Clients::connect(config)?;
    let plan = Rebalancer::new(
        &clients.membership,
        &clients.quotes,
        &clients.broker,
        options(config, true),
    )
    .plan()?;
    display_plan(&plan);
    Ok(())
}

/// Show current broker positions.
pub fn show_positions(config: &Config) -> Result<()> {
    let broker = clients::connect_broker(config)?;
    let account = broker.account()?;
    let positions = broker.positions()?;

    println!(
        "Portfolio value ${}, cash ${}\n",
        account.portfolio_value, account.cash
    );
    if positions.is_empty() {
        println!("No positions.");
        return Ok(());
    }
    println!("CURRENT PORTFOLIO:");
    for pos in &positions {
        println!(
            "  {:8} {:>8} = ${:>12.2}",
            pos.symbol, pos.quantity, pos.market_value
        );
    }
    Ok(())
}

/// Check broker connectivity and the market clock.
pub fn check_status(config: &Config) -> Result<()> {
    print!("Connecting to {}... ", config.broker.base_url);
    let broker = clients::connect_broker(config)?;
    let clock = broker.clock()?;
    println!("OK");

    let account = broker.account()?;
    println!(
        "Market {} at {}",
        if clock.is_open { "open" } else { "closed" },
        clock.timestamp
    );
    println!("Portfolio value ${}", account.portfolio_value);
    info!("Status check complete");
    Ok(())
}

fn display_plan(plan: &RebalancePlan) {
    println!(
        "\nTARGETS ({} members, portfolio ${:.2}):",
        plan.symbols.len(),
        plan.portfolio_value
    );
    println!(
        "  {:8} {:>8} {:>10} {:>8} {:>8} {:>8}",
        "Symbol", "Weight", "Close", "Current", "Target", "Delta"
    );
    for (sym, row) in plan.targets.iter() {
        println!(
            "  {:8} {:>7.3}% ${:>9.2} {:>8} {:>8} {:>+8}",
            sym,
            row.weight * 100.0,
            row.last_close,
            row.current_qty,
            row.target_qty,
            row.delta(),
        );
    }
    println!(
        "\n{} order(s): {} sell, {} buy",
        plan.diff.len(),
        plan.diff.sells().len(),
        plan.diff.buys().len()
    );
}

fn display_report(report: &ExecutionReport) {
    for outcome in report.outcomes() {
        let status = match &outcome.status {
            OrderStatus::Submitted(id) => format!("submitted {id}"),
            OrderStatus::Failed(reason) => format!("FAILED: {reason}"),
            OrderStatus::DryRun => "dry run".to_string(),
        };
        println!(
            "  {} {:>6} {:8} {status}",
            outcome.side, outcome.quantity, outcome.symbol
        );
    }
    println!(
        "\n{} submitted, {} failed",
        report.submitted(),
        report.failed()
    );
}
