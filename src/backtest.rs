//! 回測編排模組
//!
//! 由配置建立回測、運行事件主循環，並提供停止與重置。

pub mod engine;
pub mod error;
pub mod setup;
pub mod stop;

pub use engine::BackTest;
pub use error::{BacktestError, RunState};
pub use stop::StopHandle;
