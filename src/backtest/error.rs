use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;
use crate::data_provider::DataError;
use crate::portfolio::PortfolioError;
use crate::report::ReportError;
use crate::statistics::StatisticsError;
use crate::strategy::StrategyError;

/// 回測運行狀態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RunState {
    #[default]
    Created,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Created => "created",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Stopped => "stopped",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 回測錯誤
#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("nil config received")]
    NilConfig,

    #[error("nil host engine received")]
    NilHost,

    #[error("exchange not found: {0}")]
    ExchangeNotFound(String),

    #[error("回測未配置: 缺少 {0}")]
    NotConfigured(&'static str),

    #[error("回測已經運行過，目前狀態: {0}")]
    AlreadyRun(RunState),

    #[error("只有已停止的回測可以結算部分結果，目前狀態: {0}")]
    NotStopped(RunState),

    #[error("沒有 {0} 的最新數據")]
    MissingData(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    #[error(transparent)]
    Statistics(#[from] StatisticsError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
