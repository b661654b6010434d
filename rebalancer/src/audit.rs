//! JSONL audit trail logging.
//!
//! Each rebalance appends events to an audit.jsonl file, one JSON object per
//! line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::execution::{ExecutionReport, OrderOutcome, OrderStatus, PhaseReport};
use crate::rebalance::RebalancePlan;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log a run start event.
pub fn log_run_started(audit: &mut AuditLog, dry_run: bool) -> Result<()> {
    audit.log("run_started", serde_json::json!({ "dry_run": dry_run }))
}

/// Convenience: log the computed plan (targets and diff).
pub fn log_plan(audit: &mut AuditLog, plan: &RebalancePlan) -> Result<()> {
    let rows: Vec<_> = plan
        .targets
        .iter()
        .map(|(sym, row)| {
            serde_json::json!({
                "symbol": sym,
                "weight": row.weight,
                "close": row.last_close,
                "current": row.current_qty,
                "target": row.target_qty,
            })
        })
        .collect();
    let diff: serde_json::Map<String, serde_json::Value> = plan
        .diff
        .iter()
        .map(|(sym, delta)| (sym.as_str().to_string(), serde_json::json!(delta)))
        .collect();

    audit.log(
        "plan_computed",
        serde_json::json!({
            "members": plan.symbols.len(),
            "portfolio_value": plan.portfolio_value,
            "targets": rows,
            "diff": diff,
        }),
    )
}

/// Convenience: log one order outcome as `order_submitted` or `order_failed`.
pub fn log_order(audit: &mut AuditLog, outcome: &OrderOutcome) -> Result<()> {
    let mut data = serde_json::json!({
        "symbol": outcome.symbol,
        "side": outcome.side,
        "qty": outcome.quantity,
    });
    let event = match &outcome.status {
        OrderStatus::Submitted(id) => {
            data["order_id"] = serde_json::json!(id.0);
            "order_submitted"
        }
        OrderStatus::DryRun => {
            data["dry_run"] = serde_json::json!(true);
            "order_submitted"
        }
        OrderStatus::Failed(reason) => {
            data["reason"] = serde_json::json!(reason);
            "order_failed"
        }
    };
    audit.log(event, data)
}

/// Convenience: log a phase whose open orders have all cleared.
pub fn log_phase_cleared(audit: &mut AuditLog, phase: &PhaseReport) -> Result<()> {
    audit.log(
        "phase_cleared",
        serde_json::json!({
            "side": phase.side,
            "orders": phase.outcomes.len(),
            "failed": phase.failed(),
            "waited_ms": phase.waited.as_millis() as u64,
        }),
    )
}

/// Convenience: log run completion.
pub fn log_run_completed(audit: &mut AuditLog, report: &ExecutionReport) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "submitted": report.submitted(),
            "failed": report.failed(),
        }),
    )
}

/// Convenience: log a run that ended in an error, with the order counts if
/// execution had already started.
pub fn log_run_failed(audit: &mut AuditLog, error: &Error) -> Result<()> {
    let mut data = serde_json::json!({ "error": error.to_string() });
    if let Some(report) = error.partial_report() {
        data["submitted"] = serde_json::json!(report.submitted());
        data["failed"] = serde_json::json!(report.failed());
    }
    audit.log("run_failed", data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capweight::Symbol;
    use capweight_broker::{BrokerSide, OrderId};

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("test_event").unwrap();
            log.log("test_data", serde_json::json!({"key": "value"}))
                .unwrap();
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "test_event");
        assert_eq!(lines[1]["key"], "value");
        assert!(lines[1]["ts"].is_string());
    }

    #[test]
    fn audit_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        AuditLog::open(&path).unwrap().log_simple("first").unwrap();
        AuditLog::open(&path).unwrap().log_simple("second").unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["event"], "second");
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log_simple("test").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn order_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut log = AuditLog::open(&path).unwrap();

        let ok = OrderOutcome {
            symbol: Symbol::new("AAA"),
            side: BrokerSide::Sell,
            quantity: 5,
            status: OrderStatus::Submitted(OrderId("abc".into())),
        };
        let failed = OrderOutcome {
            symbol: Symbol::new("BBB"),
            side: BrokerSide::Buy,
            quantity: 3,
            status: OrderStatus::Failed("insufficient buying power".into()),
        };
        log_order(&mut log, &ok).unwrap();
        log_order(&mut log, &failed).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[0]["event"], "order_submitted");
        assert_eq!(lines[0]["symbol"], "AAA");
        assert_eq!(lines[0]["side"], "sell");
        assert_eq!(lines[0]["order_id"], "abc");
        assert_eq!(lines[1]["event"], "order_failed");
        assert_eq!(lines[1]["reason"], "insufficient buying power");
    }

    #[test]
    fn run_failed_carries_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut log = AuditLog::open(&path).unwrap();

        log_run_failed(&mut log, &Error::Cancelled).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[0]["event"], "run_failed");
        assert_eq!(lines[0]["error"], "stopped before completion");
        assert!(lines[0].get("submitted").is_none());
    }

    #[test]
    fn run_failed_counts_orders_placed_before_halt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut log = AuditLog::open(&path).unwrap();

        let outcome = |symbol: &str, status| OrderOutcome {
            symbol: Symbol::new(symbol),
            side: BrokerSide::Sell,
            quantity: 1,
            status,
        };
        let report = ExecutionReport {
            sells: PhaseReport {
                side: BrokerSide::Sell,
                outcomes: vec![
                    outcome("AAA", OrderStatus::Submitted(OrderId("a1".into()))),
                    outcome("BAD", OrderStatus::Failed("not tradable".into())),
                ],
                waited: std::time::Duration::ZERO,
            },
            buys: PhaseReport {
                side: BrokerSide::Buy,
                outcomes: Vec::new(),
                waited: std::time::Duration::ZERO,
            },
        };
        let err = Error::Halted {
            report: Box::new(report),
            source: Box::new(Error::Cancelled),
        };
        log_run_failed(&mut log, &err).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[0]["submitted"], 1);
        assert_eq!(lines[0]["failed"], 1);
        assert_eq!(
            lines[0]["error"],
            "stopped before completion (1 submitted, 1 failed before halting)"
        );
    }
}
