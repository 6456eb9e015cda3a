pub mod csv_source;
pub mod handler;
pub mod kline;
pub mod live;
pub mod loader;
pub mod trades;

pub use handler::{DataHandler, HandlerPerCurrency};
pub use kline::KlineData;
pub use live::LiveDataHandler;
pub use loader::{load_api_data, load_csv_data, load_data, load_database_data, load_live_data};
pub use trades::convert_trades_to_candles;

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::domain_types::{DataType, DomainError};

/// Errors raised while loading or streaming market data
#[derive(Debug, Error)]
pub enum DataError {
    #[error("nil arguments received: {0}")]
    NilArguments(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("data range error: {0}")]
    Range(#[from] DomainError),

    #[error("exchange, base, quote, asset, interval, start & end cannot be empty")]
    IncompleteRequest,

    #[error("database support is disabled")]
    DatabaseDisabled,

    #[error("unable to retrieve data from database: {0}")]
    Database(#[source] anyhow::Error),

    #[error("unable to retrieve data from exchange {exchange}: {source}")]
    Exchange {
        exchange: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("unable to read csv file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid csv record at line {line}: {reason}")]
    CsvRecord { line: u64, reason: String },

    #[error("data type {data_type} is not supported by the {source_name} data source")]
    UnsupportedDataType {
        data_type: DataType,
        source_name: &'static str,
    },

    #[error("no data available for {0}")]
    NoData(String),
}
