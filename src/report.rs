//! 回測報告輸出

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

use crate::statistics::FinalStatistics;

/// 報告錯誤
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("無法寫入報告 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("報告序列化失敗: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 接收最終統計的報告輸出
#[cfg_attr(test, mockall::automock)]
pub trait ReportSink: Send + Sync {
    fn write_report(&self, stats: &FinalStatistics) -> Result<(), ReportError>;
}

/// 將最終統計寫成 JSON 文件
///
/// 路徑以 `.json` 結尾時直接寫入該文件，否則視為目錄並寫入
/// `<nickname>_report.json`。
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    path: PathBuf,
}

impl JsonReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn output_path(&self, stats: &FinalStatistics) -> PathBuf {
        let is_file = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_file {
            return self.path.clone();
        }

        let stem = if stats.nickname.trim().is_empty() {
            "backtest".to_string()
        } else {
            stats
                .nickname
                .trim()
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
                .collect()
        };
        self.path.join(format!("{}_report.json", stem))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ReportSink for JsonReportSink {
    fn write_report(&self, stats: &FinalStatistics) -> Result<(), ReportError> {
        let path = self.output_path(stats);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let body = serde_json::to_string_pretty(stats)?;
        fs::write(&path, body).map_err(|e| io_error(&path, e))?;
        info!(path = %path.display(), "報告已寫入");
        Ok(())
    }
}

/// 保存在記憶體中的報告
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    reports: Mutex<Vec<FinalStatistics>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<FinalStatistics> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl ReportSink for MemoryReportSink {
    fn write_report(&self, stats: &FinalStatistics) -> Result<(), ReportError> {
        let mut reports = self
            .reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        reports.push(stats.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn stats(nickname: &str) -> FinalStatistics {
        FinalStatistics {
            nickname: nickname.to_string(),
            goal: String::new(),
            strategy_name: "dollarcostaverage".to_string(),
            strategy_description: String::new(),
            pairs: Vec::new(),
            total_initial_funds: Decimal::ONE,
            total_final_value: Decimal::ONE,
            total_return: Decimal::ZERO,
            total_orders: 0,
            total_rejections: 0,
            best_pair: None,
            worst_pair: None,
        }
    }

    #[test]
    fn test_json_sink_writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonReportSink::new(dir.path().join("reports"));

        sink.write_report(&stats("my run")).unwrap();

        let path = dir.path().join("reports").join("my_run_report.json");
        let written: FinalStatistics =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, stats("my run"));
    }

    #[test]
    fn test_json_sink_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.json");
        let sink = JsonReportSink::new(&file);

        assert_eq!(sink.output_path(&stats("")), file);
        sink.write_report(&stats("")).unwrap();
        assert!(file.exists());
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemoryReportSink::new();
        sink.write_report(&stats("a")).unwrap();
        sink.write_report(&stats("b")).unwrap();
        assert_eq!(sink.reports().len(), 2);
    }
}
