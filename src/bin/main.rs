use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use event_backtester::backtest::{BackTest, RunState};
use event_backtester::config::ConfigLoader;
use event_backtester::host::{HostEngine, OfflineExchange, StaticHost};
use event_backtester::logging::init_logging;

#[derive(Parser)]
#[command(name = "backtester", about = "事件驅動回測工具，使用離線交易所與 CSV 數據")]
struct Cli {
    /// 回測配置文件 (toml / json)，預設讀取 BACKTEST_CONFIG 或 config/backtest.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 報告輸出路徑，`.json` 結尾時寫入該文件，否則視為目錄
    #[arg(short, long, default_value = "")]
    report_output: String,

    /// 主機配置路徑
    #[arg(long, default_value = "")]
    host_config: String,

    /// 覆蓋配置中的日誌級別
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行參數
    let cli = Cli::parse();

    // 加載配置
    let config_path = cli.config.unwrap_or_else(ConfigLoader::default_path);
    let mut cfg = ConfigLoader::load(&config_path)
        .with_context(|| format!("無法加載配置文件 {}", config_path.display()))?;
    if let Some(level) = cli.log_level {
        cfg.log.level = level;
    }

    // 初始化日誌系統
    let _guard = init_logging(&cfg.log)?;

    // 每個配置中的交易所都以離線交易所提供
    let exchanges: BTreeSet<String> = cfg
        .currency_settings
        .iter()
        .map(|cs| cs.exchange_name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    let host: Arc<dyn HostEngine> = Arc::new(exchanges.iter().fold(StaticHost::new(), |host, name| {
        host.with_exchange(Arc::new(OfflineExchange::new(name)))
    }));

    let mut bt = BackTest::new_from_config(
        Some(&cfg),
        &cli.host_config,
        &cli.report_output,
        Some(host),
    )
    .await
    .context("無法建立回測")?;

    // 接收到關閉信號時停止回測
    let stop = bt.stop_handle();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("接收到關閉信號，正在停止回測...");
                stop.stop();
            }
            Err(err) => error!("無法監聽關閉信號: {}", err),
        }
    });

    let state = bt.run().await.context("回測運行失敗")?;
    if state == RunState::Stopped {
        bt.finalize_partial().context("無法結算已停止的回測")?;
    }
    match (state, bt.statistics().and_then(|s| s.final_statistics())) {
        (RunState::Completed | RunState::Stopped, Some(stats)) => {
            for pair in &stats.pairs {
                info!(
                    pair = %pair.key,
                    total_return = %pair.total_return,
                    max_drawdown = %pair.max_drawdown.percentage,
                    orders = pair.buy_orders + pair.sell_orders,
                    rejected = pair.rejected_orders,
                    "交易對結果"
                );
            }
            info!(
                total_return = %stats.total_return,
                final_value = %stats.total_final_value,
                state = %state,
                "回測結束"
            );
        }
        (state, _) => info!(state = %state, events = bt.events_processed(), "回測結束"),
    }

    Ok(())
}
