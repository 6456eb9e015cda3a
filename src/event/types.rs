use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain_types::{Candle, Interval, PairKey};

/// 交易方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
            Direction::Hold => write!(f, "HOLD"),
        }
    }
}

/// 訂單類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Market, // 市價單，收取 taker 費率
    Limit,  // 限價單，收取 maker 費率
}

/// 成交狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Filled,
    Rejected,
}

/// 新的市場數據
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEvent {
    pub key: PairKey,
    pub interval: Interval,
    pub candle: Candle,
}

impl DataEvent {
    pub fn new(key: PairKey, interval: Interval, candle: Candle) -> Self {
        Self { key, interval, candle }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.candle.timestamp
    }

    pub fn close(&self) -> Decimal {
        self.candle.close
    }
}

/// 策略決策
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub key: PairKey,
    pub timestamp: DateTime<Utc>,
    /// 產生信號時的收盤價
    pub price: Decimal,
    pub direction: Direction,
    /// 策略指定的數量，為空時由投資組合依資金決定
    pub amount: Option<Decimal>,
    /// 限價，為空時下市價單
    pub limit_price: Option<Decimal>,
    pub reason: String,
}

impl SignalEvent {
    /// 以數據事件為基礎建立信號
    pub fn from_data(data: &DataEvent, direction: Direction) -> Self {
        Self {
            key: data.key.clone(),
            timestamp: data.timestamp(),
            price: data.close(),
            direction,
            amount: None,
            limit_price: None,
            reason: String::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_limit_price(mut self, price: Decimal) -> Self {
        self.limit_price = Some(price);
        self
    }
}

/// 已定量、已通過風控的待執行訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub id: u64,
    pub key: PairKey,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub amount: Decimal,
    pub price: Decimal,
    pub order_type: OrderType,
    pub limit_price: Option<Decimal>,
}

/// 執行結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub order_id: u64,
    pub key: PairKey,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub amount: Decimal,
    pub fill_price: Decimal,
    pub fee: Decimal,
    pub fee_rate: Decimal,
    pub status: OrderStatus,
    pub reason: Option<String>,
}

impl FillEvent {
    /// 成交名義價值（不含手續費）
    pub fn notional(&self) -> Decimal {
        self.amount * self.fill_price
    }
}

/// 事件種類，用於日誌與分派
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Data,
    Signal,
    Order,
    Fill,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Data => "data",
            EventKind::Signal => "signal",
            EventKind::Order => "order",
            EventKind::Fill => "fill",
        }
    }
}

/// 回測事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Data(DataEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    pub fn key(&self) -> &PairKey {
        match self {
            Event::Data(e) => &e.key,
            Event::Signal(e) => &e.key,
            Event::Order(e) => &e.key,
            Event::Fill(e) => &e.key,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::Data(e) => e.timestamp(),
            Event::Signal(e) => e.timestamp,
            Event::Order(e) => e.timestamp,
            Event::Fill(e) => e.timestamp,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Data(_) => EventKind::Data,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }
}

impl From<DataEvent> for Event {
    fn from(e: DataEvent) -> Self {
        Event::Data(e)
    }
}

impl From<SignalEvent> for Event {
    fn from(e: SignalEvent) -> Self {
        Event::Signal(e)
    }
}

impl From<OrderEvent> for Event {
    fn from(e: OrderEvent) -> Self {
        Event::Order(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}
