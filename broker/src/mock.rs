//! Mock broker for testing: implements the `Broker` trait with scripted behavior.
//!
//! Use this in tests to simulate broker responses without network calls.
//! Every submission and open-order poll is journaled so tests can assert on
//! the exact sequence of calls.
//!
//! ```
//! use capweight::Symbol;
//! use capweight_broker::mock::{FillMode, MockBroker};
//! use capweight_broker::{Broker, BrokerOrder, BrokerSide};
//!
//! let broker = MockBroker::builder()
//!     .fill_mode(FillMode::AfterPolls(1))
//!     .with_position(Symbol::new("AAPL"), 100)
//!     .with_portfolio_value("1000000")
//!     .build();
//!
//! let order = BrokerOrder::market_day(Symbol::new("AAPL"), BrokerSide::Sell, 10);
//! broker.submit_order(&order).unwrap();
//! assert_eq!(broker.open_orders().unwrap().len(), 1);
//! assert!(broker.open_orders().unwrap().is_empty());
//! ```

use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;

use capweight::Symbol;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

use crate::Broker;
use crate::error::BrokerError;
use crate::types::*;

/// How the mock broker handles accepted orders.
#[derive(Clone, Copy, Debug)]
pub enum FillMode {
    /// Orders fill on submission and never show up as open.
    Immediate,
    /// Orders stay open for this many `open_orders` polls.
    AfterPolls(u32),
    /// Orders stay open forever.
    Never,
}

/// A recorded order submission for assertion in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedOrder {
    pub symbol: Symbol,
    pub side: BrokerSide,
    pub quantity: u64,
    pub accepted: bool,
}

/// One call observed by the mock, in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockEvent {
    Submitted(RecordedOrder),
    /// `open_orders` was polled and returned this many orders.
    OpenOrdersListed(usize),
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    fill_mode: FillMode,
    positions: Vec<Position>,
    portfolio_value: String,
    rejected: BTreeSet<Symbol>,
    clocks: VecDeque<DateTime<FixedOffset>>,
    calendar: Vec<CalendarDay>,
    fail_account: bool,
    fail_open_orders: bool,
}

impl MockBrokerBuilder {
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_position(mut self, symbol: Symbol, quantity: i64) -> Self {
        self.positions.push(Position {
            symbol,
            quantity,
            market_value: 0.0,
        });
        self
    }

    pub fn with_portfolio_value(mut self, value: &str) -> Self {
        self.portfolio_value = value.to_string();
        self
    }

    /// Submissions for `symbol` fail with an order error.
    pub fn reject_symbol(mut self, symbol: Symbol) -> Self {
        self.rejected.insert(symbol);
        self
    }

    /// Clock readings returned in order; the last one repeats.
    /// With no readings, `clock` fails with a connection error.
    pub fn with_clock(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.clocks.push_back(timestamp);
        self
    }

    /// Add regular-hours sessions (09:30–16:00) on the given dates.
    pub fn with_trading_days(mut self, dates: &[NaiveDate]) -> Self {
        let open = NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default();
        let close = NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default();
        self.calendar
            .extend(dates.iter().map(|&date| CalendarDay { date, open, close }));
        self
    }

    /// `account` and `positions` fail with a connection error.
    pub fn fail_account(mut self) -> Self {
        self.fail_account = true;
        self
    }

    /// `open_orders` fails with a connection error.
    pub fn fail_open_orders(mut self) -> Self {
        self.fail_open_orders = true;
        self
    }

    pub fn build(self) -> MockBroker {
        MockBroker {
            fill_mode: self.fill_mode,
            positions: self.positions,
            portfolio_value: self.portfolio_value,
            rejected: self.rejected,
            calendar: self.calendar,
            fail_account: self.fail_account,
            fail_open_orders: self.fail_open_orders,
            state: Mutex::new(MockState {
                next_order_id: 1,
                working: Vec::new(),
                journal: Vec::new(),
                clocks: self.clocks,
            }),
        }
    }
}

struct MockState {
    next_order_id: u64,
    /// Open orders and the number of polls each stays listed.
    working: Vec<(OpenOrder, u32)>,
    journal: Vec<MockEvent>,
    clocks: VecDeque<DateTime<FixedOffset>>,
}

/// A mock broker that records calls and returns configurable responses.
pub struct MockBroker {
    fill_mode: FillMode,
    positions: Vec<Position>,
    portfolio_value: String,
    rejected: BTreeSet<Symbol>,
    calendar: Vec<CalendarDay>,
    fail_account: bool,
    fail_open_orders: bool,
    state: Mutex<MockState>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            fill_mode: FillMode::Immediate,
            positions: Vec::new(),
            portfolio_value: "100000".to_string(),
            rejected: BTreeSet::new(),
            clocks: VecDeque::new(),
            calendar: Vec::new(),
            fail_account: false,
            fail_open_orders: false,
        }
    }

    /// Every call observed so far, in order.
    pub fn journal(&self) -> Vec<MockEvent> {
        self.state.lock().unwrap().journal.clone()
    }

    /// All submissions (accepted and rejected), in order.
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        self.journal()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::Submitted(o) => Some(o),
                MockEvent::OpenOrdersListed(_) => None,
            })
            .collect()
    }
}

impl Broker for MockBroker {
    fn account(&self) -> Result<Account, BrokerError> {
        if self.fail_account {
            return Err(BrokerError::Connection("mock: account unavailable".into()));
        }
        Ok(Account {
            portfolio_value: self.portfolio_value.clone(),
            cash: self.portfolio_value.clone(),
            buying_power: self.portfolio_value.clone(),
        })
    }

    fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        if self.fail_account {
            return Err(BrokerError::Connection("mock: account unavailable".into()));
        }
        Ok(self.positions.clone())
    }

    fn submit_order(&self, order: &BrokerOrder) -> Result<OrderId, BrokerError> {
        let mut state = self.state.lock().unwrap();
        let accepted = !self.rejected.contains(&order.symbol);

        state.journal.push(MockEvent::Submitted(RecordedOrder {
            symbol: order.symbol,
            side: order.side,
            quantity: order.quantity,
            accepted,
        }));

        if !accepted {
            return Err(BrokerError::Order(format!(
                "mock: order for {} rejected",
                order.symbol
            )));
        }

        let id = OrderId(format!("mock-{}", state.next_order_id));
        state.next_order_id += 1;

        let polls = match self.fill_mode {
            FillMode::Immediate => 0,
            FillMode::AfterPolls(n) => n,
            FillMode::Never => u32::MAX,
        };
        if polls > 0 {
            state.working.push((
                OpenOrder {
                    id: id.clone(),
                    symbol: order.symbol.as_str().to_string(),
                    side: Some(order.side),
                    status: "new".into(),
                },
                polls,
            ));
        }

        Ok(id)
    }

    fn open_orders(&self) -> Result<Vec<OpenOrder>, BrokerError> {
        if self.fail_open_orders {
            return Err(BrokerError::Connection("mock: orders unavailable".into()));
        }
        let mut state = self.state.lock().unwrap();
        let open: Vec<OpenOrder> = state.working.iter().map(|(o, _)| o.clone()).collect();

        let never = matches!(self.fill_mode, FillMode::Never);
        for (_, polls) in state.working.iter_mut() {
            if !never {
                *polls -= 1;
            }
        }
        state.working.retain(|(_, polls)| *polls > 0);
        state.journal.push(MockEvent::OpenOrdersListed(open.len()));

        Ok(open)
    }

    fn clock(&self) -> Result<Clock, BrokerError> {
        let mut state = self.state.lock().unwrap();
        let timestamp = if state.clocks.len() > 1 {
            state.clocks.pop_front()
        } else {
            state.clocks.front().copied()
        }
        .ok_or_else(|| BrokerError::Connection("mock: clock unavailable".into()))?;

        Ok(Clock {
            timestamp,
            is_open: true,
        })
    }

    fn calendar(&self) -> Result<Vec<CalendarDay>, BrokerError> {
        Ok(self.calendar.clone())
    }
}
