/// 配置管理模組
///
/// 本模組負責回測配置的結構定義、加載與語義驗證。
/// 驗證順序由回測引擎的建構流程決定，這裡只提供各項獨立檢查。
// 宣告子模組
pub mod error;
pub mod loader;
pub mod types;
pub mod validation;

// 重新導出常用組件
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::*;
pub use validation::{validate_config, ValidationError, ValidationUtils, Validator};
