//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::env::{rewrite, EnvVar};
use crate::rewrite::error::{RewriteError, RewriteResult};

/// 改写配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// 改写服务地址
    pub api_url: String,
    /// 每批最多片段数
    pub batch_size: usize,
    /// 同时在途的最大请求数
    pub max_concurrency: usize,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 整次改写共用的引导语
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            api_url: constants::DEFAULT_API_URL.to_string(),
            batch_size: constants::DEFAULT_BATCH_SIZE,
            max_concurrency: constants::DEFAULT_MAX_CONCURRENCY,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            directive: None,
        }
    }
}

impl RewriteConfig {
    /// 创建带指定服务地址的默认配置
    pub fn default_with_api_url(api_url: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }
        config
    }

    /// 验证配置
    pub fn validate(&self) -> RewriteResult<()> {
        if self.batch_size == 0 {
            return Err(RewriteError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.batch_size > constants::MAX_SERVICE_SEGMENTS {
            return Err(RewriteError::ConfigError(format!(
                "批次大小 {} 超过服务端上限 {}",
                self.batch_size,
                constants::MAX_SERVICE_SEGMENTS
            )));
        }

        if self.max_concurrency == 0 {
            return Err(RewriteError::ConfigError("最大并发数不能为0".to_string()));
        }

        if self.request_timeout_secs == 0
            || self.request_timeout_secs > constants::MAX_REQUEST_TIMEOUT.as_secs()
        {
            return Err(RewriteError::ConfigError(format!(
                "请求超时必须在 1 到 {} 秒之间",
                constants::MAX_REQUEST_TIMEOUT.as_secs()
            )));
        }

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(RewriteError::ConfigError(format!(
                "服务地址必须以 http:// 或 https:// 开头: {}",
                self.api_url
            )));
        }

        if matches!(self.directive.as_deref(), Some(d) if d.trim().is_empty()) {
            return Err(RewriteError::ConfigError("引导语不能为空白".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    ///
    /// 设置了但无法解析的变量记录警告后忽略。
    pub fn apply_env_overrides(&mut self) {
        match rewrite::ApiUrl::get_if_set() {
            Ok(Some(api_url)) => {
                self.api_url = api_url;
                tracing::info!("环境变量覆盖 API URL: {}", self.api_url);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略环境变量: {}", e),
        }

        match rewrite::BatchSize::get_if_set() {
            Ok(Some(batch_size)) => self.batch_size = batch_size,
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略环境变量: {}", e),
        }

        match rewrite::MaxConcurrency::get_if_set() {
            Ok(Some(max_concurrency)) => self.max_concurrency = max_concurrency,
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略环境变量: {}", e),
        }

        match rewrite::RequestTimeout::get_if_set() {
            Ok(Some(timeout)) => self.request_timeout_secs = timeout.as_secs(),
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略环境变量: {}", e),
        }

        match rewrite::Directive::get_if_set() {
            Ok(Some(directive)) => self.directive = Some(directive),
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略环境变量: {}", e),
        }
    }

    /// 转换为Duration类型
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 简化的配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    config: RewriteConfig,
    source: Option<String>,
}

impl ConfigManager {
    /// 创建新的配置管理器
    ///
    /// 依次加载 .env 文件、搜索配置文件、应用环境变量覆盖，最后验证。
    pub fn new() -> RewriteResult<Self> {
        let manager = Self::load(None)?;
        manager.config.validate()?;
        Ok(manager)
    }

    /// 从指定文件加载配置（同样应用环境变量覆盖）
    pub fn from_file<P: AsRef<Path>>(path: P) -> RewriteResult<Self> {
        let manager = Self::load(Some(path.as_ref()))?;
        manager.config.validate()?;
        Ok(manager)
    }

    /// 加载配置但不验证
    ///
    /// 指定了文件时只读该文件，否则按搜索路径查找。文件读取或解析失败直接返回错误；
    /// 调用方在叠加自己的覆盖项之后再调用 [`RewriteConfig::validate`]。
    pub fn load(path: Option<&Path>) -> RewriteResult<Self> {
        Self::load_dotenv();

        let (mut config, source) = match path {
            Some(path) => (
                Self::load_from_file(path)?,
                Some(path.display().to_string()),
            ),
            None => Self::load_config()?,
        };
        config.apply_env_overrides();

        Ok(Self { config, source })
    }

    /// 获取配置
    pub fn get_config(&self) -> &RewriteConfig {
        &self.config
    }

    /// 取出配置
    pub fn into_config(self) -> RewriteConfig {
        self.config
    }

    /// 配置来源文件，None 表示只用了默认值和环境变量
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// 返回替换服务地址后的配置
    pub fn with_api_url(&self, api_url: Option<&str>) -> RewriteConfig {
        let mut config = self.config.clone();
        if let Some(url) = api_url {
            config.api_url = url.to_string();
        }
        config
    }

    /// 从搜索路径加载配置
    fn load_config() -> RewriteResult<(RewriteConfig, Option<String>)> {
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let candidate = Path::new(expanded_path.as_ref());
            if candidate.exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                let config = Self::load_from_file(candidate)?;
                return Ok((config, Some(expanded_path.into_owned())));
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok((RewriteConfig::default(), None))
    }

    /// 从指定文件加载配置，按扩展名选择 TOML 或 JSON
    fn load_from_file(path: &Path) -> RewriteResult<RewriteConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RewriteError::ConfigError(format!("读取配置文件失败 {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| RewriteError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| RewriteError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> RewriteResult<()> {
        let config = RewriteConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| RewriteError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| RewriteError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RewriteConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(25));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let too_big = RewriteConfig {
            batch_size: constants::MAX_SERVICE_SEGMENTS + 1,
            ..Default::default()
        };
        assert!(too_big.validate().is_err());

        let no_workers = RewriteConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(no_workers.validate().is_err());

        let bad_url = RewriteConfig::default_with_api_url(Some("localhost:8787"));
        assert!(bad_url.validate().is_err());

        let blank_directive = RewriteConfig {
            directive: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank_directive.validate().is_err());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: RewriteConfig = toml::from_str("batch_size = 15\n").unwrap();
        assert_eq!(config.batch_size, 15);
        assert_eq!(config.max_concurrency, constants::DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.api_url, constants::DEFAULT_API_URL);
    }

    #[test]
    fn loads_json_and_generated_toml() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("reprose.json");
        std::fs::write(
            &json_path,
            r#"{"batch_size": 12, "directive": "Stay neutral"}"#,
        )
        .unwrap();
        let manager = ConfigManager::from_file(&json_path).unwrap();
        assert_eq!(manager.get_config().batch_size, 12);
        assert_eq!(manager.source(), Some(json_path.display().to_string().as_str()));

        let toml_path = dir.path().join("reprose.toml");
        ConfigManager::generate_example_config(&toml_path).unwrap();
        let generated = ConfigManager::from_file(&toml_path).unwrap().into_config();
        assert_eq!(generated.batch_size, constants::DEFAULT_BATCH_SIZE);
        assert_eq!(generated.max_concurrency, constants::DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn load_defers_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reprose.toml");
        std::fs::write(
            &path,
            "batch_size = 100\napi_url = \"http://10.0.0.2:9000/rewrite\"\n",
        )
        .unwrap();

        assert!(ConfigManager::from_file(&path).is_err());

        let mut config = ConfigManager::load(Some(&path)).unwrap().into_config();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.api_url, "http://10.0.0.2:9000/rewrite");

        config.batch_size = 20;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "batch_size = \"many\"").unwrap();

        let error = ConfigManager::from_file(&path).unwrap_err();
        assert!(matches!(error, RewriteError::ConfigError(_)));

        let error = ConfigManager::load(Some(&path)).unwrap_err();
        assert!(matches!(error, RewriteError::ConfigError(_)));
    }
}
