use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::error::ConfigError;
use crate::config::types::BacktestConfig;

/// 未指定路徑時使用的配置文件
const DEFAULT_CONFIG_PATH: &str = "config/backtest.toml";

/// 配置加載器，從文件加載回測配置，並以環境變數覆蓋
pub struct ConfigLoader;

impl ConfigLoader {
    /// 默認配置路徑，可由 BACKTEST_CONFIG 環境變數指定
    pub fn default_path() -> PathBuf {
        env::var("BACKTEST_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// 載入指定路徑的配置，格式由副檔名決定（toml / json）
    pub fn load(path: &Path) -> Result<BacktestConfig, ConfigError> {
        debug!("從文件加載回測配置: {}", path.display());

        let config = Config::builder()
            .add_source(File::from(path))
            // 從環境變數加載配置（優先級高於文件配置）
            .add_source(
                Environment::with_prefix("BACKTEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
