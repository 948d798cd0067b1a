use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

use crate::error::ConfigError;

/// 默认配置文件名（位于工作目录）
pub const DEFAULT_CONFIG_FILE: &str = "question_sheet.toml";

/// 程序配置
///
/// 优先级：默认值 < 配置文件 < 环境变量。API Key 只会被读取，从不写回磁盘。
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 采样温度，解析题目需要接近确定性的输出
    pub llm_temperature: f32,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 导出配置 ---
    /// Excel 保存目录
    pub export_dir: String,
    /// 是否在日志中输出完整的提示词和模型返回
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai"
                .to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            llm_temperature: 0.2,
            request_timeout_secs: 120,
            export_dir: ".".to_string(),
            verbose_logging: false,
        }
    }
}

// API Key 不进日志
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("llm_api_key", &if self.llm_api_key.is_empty() { "<unset>" } else { "<set>" })
            .field("llm_api_base_url", &self.llm_api_base_url)
            .field("llm_model_name", &self.llm_model_name)
            .field("llm_temperature", &self.llm_temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("export_dir", &self.export_dir)
            .field("verbose_logging", &self.verbose_logging)
            .finish()
    }
}

impl Config {
    /// 只使用默认值和环境变量
    pub fn from_env() -> Self {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// 加载配置文件（如果存在），再用环境变量覆盖
    ///
    /// 配置文件路径取自 `QUESTION_SHEET_CONFIG`，未设置时使用工作目录下的
    /// `question_sheet.toml`。
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("QUESTION_SHEET_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let base = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        Ok(base.overlay(|name| std::env::var(name).ok()))
    }

    /// 从 TOML 文件读取，缺失的字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 用 `lookup` 提供的变量覆盖当前配置
    pub fn overlay(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let llm_api_key = lookup("LLM_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .unwrap_or(self.llm_api_key);

        Self {
            llm_api_key,
            llm_api_base_url: lookup("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: lookup("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_temperature: parse_or(&lookup, "LLM_TEMPERATURE", self.llm_temperature),
            request_timeout_secs: parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                self.request_timeout_secs,
            ),
            export_dir: lookup("EXPORT_DIR").unwrap_or(self.export_dir),
            verbose_logging: parse_or(&lookup, "VERBOSE_LOGGING", self.verbose_logging),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, current: T) -> T {
    match lookup(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("环境变量 {} 解析失败: 值 '{}' 无法识别，保留原配置", name, raw);
                current
            }
        },
        None => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_overlay_env_values() {
        let config = Config::default().overlay(lookup_from(&[
            ("LLM_API_KEY", "secret"),
            ("LLM_MODEL_NAME", "gemini-2.5-pro"),
            ("LLM_TEMPERATURE", "0.5"),
            ("EXPORT_DIR", "out"),
        ]));
        assert_eq!(config.llm_api_key, "secret");
        assert_eq!(config.llm_model_name, "gemini-2.5-pro");
        assert_eq!(config.llm_temperature, 0.5);
        assert_eq!(config.export_dir, "out");
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn test_api_key_fallback_variable() {
        let config = Config::default().overlay(lookup_from(&[("API_KEY", "k2")]));
        assert_eq!(config.llm_api_key, "k2");
    }

    #[test]
    fn test_bad_number_keeps_previous_value() {
        let config = Config::default().overlay(lookup_from(&[
            ("REQUEST_TIMEOUT_SECS", "soon"),
            ("VERBOSE_LOGGING", "true"),
        ]));
        assert_eq!(config.request_timeout_secs, 120);
        assert!(config.verbose_logging);
    }

    #[test]
    fn test_toml_partial_file() {
        let config = Config::from_toml_str(
            "llm_model_name = \"qwen-plus\"\nexport_dir = \"exports\"\n",
            Path::new("question_sheet.toml"),
        )
        .unwrap();
        assert_eq!(config.llm_model_name, "qwen-plus");
        assert_eq!(config.export_dir, "exports");
        assert_eq!(config.llm_temperature, 0.2);
    }

    #[test]
    fn test_toml_malformed() {
        let result = Config::from_toml_str("llm_temperature = [", Path::new("bad.toml"));
        assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
    }

    #[test]
    fn test_debug_hides_key() {
        let mut config = Config::default();
        config.llm_api_key = "top-secret".to_string();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("<set>"));
    }
}
