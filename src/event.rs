// 事件模組
//
// 回測主循環在各組件之間傳遞的事件類型，以及保持到達順序的事件佇列。
// 同一交易對的因果鏈（數據 → 信號 → 訂單 → 成交）依賴佇列的先進先出。

pub mod queue;
pub mod types;

pub use queue::EventQueue;
pub use types::{
    DataEvent, Direction, Event, EventKind, FillEvent, OrderEvent, OrderStatus, OrderType,
    SignalEvent,
};
