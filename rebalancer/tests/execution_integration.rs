//! Integration tests for the order executor against the mock broker.

use std::time::Duration;

use capweight::{OrderDiff, Symbol};
use capweight_broker::BrokerSide;
use capweight_broker::mock::{FillMode, MockBroker, MockEvent, RecordedOrder};
use capweight_rebalancer::audit::AuditLog;
use capweight_rebalancer::error::Error;
use capweight_rebalancer::execution::{ExecutionOptions, Executor, OrderStatus, StopSignal};

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

fn fast() -> ExecutionOptions {
    ExecutionOptions {
        poll_interval: Duration::from_millis(1),
        max_wait: Some(Duration::from_secs(5)),
        dry_run: false,
    }
}

fn diff(entries: &[(&str, i64)]) -> OrderDiff {
    entries.iter().map(|&(s, d)| (sym(s), d)).collect()
}

fn submitted(symbol: &str, side: BrokerSide, quantity: u64) -> MockEvent {
    MockEvent::Submitted(RecordedOrder {
        symbol: sym(symbol),
        side,
        quantity,
        accepted: true,
    })
}

// ============================================================================
// Phase ordering
// ============================================================================

#[test]
fn sells_clear_before_any_buy() {
    let broker = MockBroker::builder()
        .fill_mode(FillMode::AfterPolls(1))
        .build();
    let report = Executor::new(&broker, fast())
        .execute(&diff(&[("AAA", 10), ("BBB", -4), ("CCC", -2)]))
        .unwrap();

    assert_eq!(
        broker.journal(),
        vec![
            submitted("BBB", BrokerSide::Sell, 4),
            submitted("CCC", BrokerSide::Sell, 2),
            MockEvent::OpenOrdersListed(2),
            MockEvent::OpenOrdersListed(0),
            submitted("AAA", BrokerSide::Buy, 10),
            MockEvent::OpenOrdersListed(1),
            MockEvent::OpenOrdersListed(0),
        ]
    );
    assert_eq!(report.sells.outcomes.len(), 2);
    assert_eq!(report.buys.outcomes.len(), 1);
    assert_eq!(report.submitted(), 3);
    assert_eq!(report.failed(), 0);
}

#[test]
fn empty_diff_still_waits_both_phases() {
    let broker = MockBroker::builder().build();
    let report = Executor::new(&broker, fast())
        .execute(&OrderDiff::new())
        .unwrap();

    assert_eq!(
        broker.journal(),
        vec![MockEvent::OpenOrdersListed(0), MockEvent::OpenOrdersListed(0)]
    );
    assert_eq!(report.outcomes().count(), 0);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn rejected_order_does_not_abort_phase() {
    let broker = MockBroker::builder().reject_symbol(sym("BBB")).build();
    let report = Executor::new(&broker, fast())
        .execute(&diff(&[("AAA", 3), ("BBB", 5), ("CCC", 1)]))
        .unwrap();

    let statuses: Vec<_> = report
        .buys
        .outcomes
        .iter()
        .map(|o| (o.symbol, matches!(o.status, OrderStatus::Submitted(_))))
        .collect();
    assert_eq!(
        statuses,
        vec![(sym("AAA"), true), (sym("BBB"), false), (sym("CCC"), true)]
    );
    assert_eq!(report.failed(), 1);
    let failed: Vec<_> = report.failures().map(|o| o.symbol).collect();
    assert_eq!(failed, vec![sym("BBB")]);
    assert_eq!(broker.submitted_orders().len(), 3);
}

#[test]
fn stuck_orders_time_out_before_buys() {
    let broker = MockBroker::builder().fill_mode(FillMode::Never).build();
    let opts = ExecutionOptions {
        poll_interval: Duration::from_millis(5),
        max_wait: Some(Duration::from_millis(30)),
        dry_run: false,
    };
    let err = Executor::new(&broker, opts)
        .execute(&diff(&[("AAA", -1), ("BBB", 2)]))
        .unwrap_err();

    assert!(matches!(
        err.root(),
        Error::OrdersDidNotClear {
            side: BrokerSide::Sell,
            open: 1,
            ..
        }
    ));
    let orders = broker.submitted_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].side, BrokerSide::Sell);
}

#[test]
fn timed_out_phase_still_reports_rejections() {
    let broker = MockBroker::builder()
        .fill_mode(FillMode::Never)
        .reject_symbol(sym("BAD"))
        .build();
    let opts = ExecutionOptions {
        poll_interval: Duration::from_millis(5),
        max_wait: Some(Duration::from_millis(30)),
        dry_run: false,
    };
    let err = Executor::new(&broker, opts)
        .execute(&diff(&[("AAA", -5), ("BAD", -3), ("CCC", 4)]))
        .unwrap_err();

    assert!(matches!(
        err.root(),
        Error::OrdersDidNotClear {
            side: BrokerSide::Sell,
            open: 1,
            ..
        }
    ));
    let report = err.partial_report().unwrap();
    let sells: Vec<_> = report
        .sells
        .outcomes
        .iter()
        .map(|o| (o.symbol, o.quantity, o.is_failed()))
        .collect();
    assert_eq!(sells, vec![(sym("AAA"), 5, false), (sym("BAD"), 3, true)]);
    assert!(report.buys.outcomes.is_empty());
    assert_eq!(report.submitted(), 1);
    assert_eq!(report.failed(), 1);
    assert!(err.to_string().contains("1 submitted, 1 failed"));
}

#[test]
fn open_order_listing_failure_is_fatal() {
    let broker = MockBroker::builder().fail_open_orders().build();
    let err = Executor::new(&broker, fast())
        .execute(&diff(&[("AAA", -1), ("BBB", 2)]))
        .unwrap_err();

    assert!(matches!(err.root(), Error::Broker(_)));
    assert_eq!(err.partial_report().unwrap().sells.submitted(), 1);
    assert_eq!(broker.submitted_orders().len(), 1);
}

// ============================================================================
// Stop signal
// ============================================================================

#[test]
fn stopped_before_start_submits_nothing() {
    let broker = MockBroker::builder().build();
    let stop = StopSignal::new();
    stop.stop();

    let err = Executor::new(&broker, fast())
        .with_stop(stop)
        .execute(&diff(&[("AAA", 1)]))
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(err.partial_report().is_none());
    assert!(broker.journal().is_empty());
}

#[test]
fn stop_interrupts_unbounded_wait() {
    let broker = MockBroker::builder().fill_mode(FillMode::Never).build();
    let opts = ExecutionOptions {
        poll_interval: Duration::from_millis(5),
        max_wait: None,
        dry_run: false,
    };
    let stop = StopSignal::new();
    let remote = stop.clone();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        remote.stop();
    });

    let err = Executor::new(&broker, opts)
        .with_stop(stop)
        .execute(&diff(&[("AAA", -1)]))
        .unwrap_err();
    stopper.join().unwrap();

    assert!(matches!(err.root(), Error::Cancelled));
    assert_eq!(err.partial_report().unwrap().sells.submitted(), 1);
}

// ============================================================================
// Dry run and audit
// ============================================================================

#[test]
fn dry_run_touches_nothing() {
    let broker = MockBroker::builder().build();
    let opts = ExecutionOptions {
        dry_run: true,
        ..fast()
    };
    let report = Executor::new(&broker, opts)
        .execute(&diff(&[("AAA", -3), ("BBB", 4)]))
        .unwrap();

    assert!(broker.journal().is_empty());
    assert!(report.outcomes().all(|o| o.status == OrderStatus::DryRun));
    assert_eq!(report.submitted(), 0);
    assert_eq!(report.sells.waited, Duration::ZERO);
}

#[test]
fn audit_records_orders_and_phases() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let broker = MockBroker::builder().reject_symbol(sym("BBB")).build();

    {
        let mut audit = AuditLog::open(&path).unwrap();
        Executor::new(&broker, fast())
            .with_audit(&mut audit)
            .execute(&diff(&[("AAA", -3), ("BBB", 4)]))
            .unwrap();
    }

    let events: Vec<String> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        events,
        vec![
            "order_submitted",
            "phase_cleared",
            "order_failed",
            "phase_cleared"
        ]
    );
}
