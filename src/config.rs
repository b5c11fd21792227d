use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// 页面渲染方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// 无头浏览器（执行页面脚本）
    Chromium,
    /// 直接 HTTP 抓取（不执行脚本）
    Http,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "browser" => Ok(RenderMode::Chromium),
            "http" => Ok(RenderMode::Http),
            other => Err(format!("未知的渲染方式: {}", other)),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务监听地址
    pub bind_addr: String,
    /// 同时处理的报告数量
    pub max_concurrent_reports: usize,
    /// 允许抓取的房源站点（精确匹配主机名）
    pub allowed_hosts: Vec<String>,
    /// 地址提交时使用的搜索地址前缀
    pub address_search_base: String,
    pub render_mode: RenderMode,
    /// 连接已有浏览器的调试端口；为空时启动无头浏览器
    pub browser_debug_port: Option<u16>,
    pub chrome_executable: Option<String>,
    // --- 超时（秒） ---
    pub render_timeout_secs: u64,
    pub analysis_timeout_secs: u64,
    pub lookup_timeout_secs: u64,
    pub imagery_timeout_secs: u64,
    /// 图片数量上限
    pub max_images: usize,
    /// 建议客户端的轮询间隔
    pub poll_interval_ms: u64,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 图像服务 ---
    pub imagery_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_concurrent_reports: 8,
            allowed_hosts: [
                "www.zillow.com",
                "zillow.com",
                "www.redfin.com",
                "redfin.com",
                "www.realtor.com",
                "realtor.com",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            address_search_base: "https://www.zillow.com/homes/".to_string(),
            render_mode: RenderMode::Chromium,
            browser_debug_port: None,
            chrome_executable: None,
            render_timeout_secs: 45,
            analysis_timeout_secs: 120,
            lookup_timeout_secs: 60,
            imagery_timeout_secs: 10,
            max_images: 20,
            poll_interval_ms: 2000,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            imagery_api_key: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// 从 TOML 文件加载，再用环境变量覆盖
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            AppError::Internal(format!("无法解析配置文件 {}: {}", path.display(), e))
        })?;
        Ok(config.with_env())
    }

    fn with_env(self) -> Self {
        let base = self;
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(base.bind_addr),
            max_concurrent_reports: env_parse("MAX_CONCURRENT_REPORTS").unwrap_or(base.max_concurrent_reports),
            allowed_hosts: std::env::var("ALLOWED_HOSTS")
                .ok()
                .map(|v| split_list(&v))
                .filter(|hosts| !hosts.is_empty())
                .unwrap_or(base.allowed_hosts),
            address_search_base: std::env::var("ADDRESS_SEARCH_BASE").unwrap_or(base.address_search_base),
            render_mode: env_parse("RENDER_MODE").unwrap_or(base.render_mode),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(base.browser_debug_port),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(base.chrome_executable),
            render_timeout_secs: env_parse("RENDER_TIMEOUT_SECS").unwrap_or(base.render_timeout_secs),
            analysis_timeout_secs: env_parse("ANALYSIS_TIMEOUT_SECS").unwrap_or(base.analysis_timeout_secs),
            lookup_timeout_secs: env_parse("LOOKUP_TIMEOUT_SECS").unwrap_or(base.lookup_timeout_secs),
            imagery_timeout_secs: env_parse("IMAGERY_TIMEOUT_SECS").unwrap_or(base.imagery_timeout_secs),
            max_images: env_parse("MAX_IMAGES").unwrap_or(base.max_images),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS").unwrap_or(base.poll_interval_ms),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(base.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(base.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(base.llm_model_name),
            imagery_api_key: std::env::var("IMAGERY_API_KEY").ok().or(base.imagery_api_key),
        }
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn imagery_timeout(&self) -> Duration {
        Duration::from_secs(self.imagery_timeout_secs)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_fills_missing_fields_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            max_concurrent_reports = 2
            render_mode = "http"
            allowed_hosts = ["www.redfin.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_concurrent_reports, 2);
        assert_eq!(config.render_mode, RenderMode::Http);
        assert_eq!(config.allowed_hosts, vec!["www.redfin.com".to_string()]);
        assert_eq!(config.max_images, 20);
        assert_eq!(config.poll_interval_ms, 2000);
    }

    #[test]
    fn test_render_mode_parse() {
        assert_eq!("Chromium".parse::<RenderMode>(), Ok(RenderMode::Chromium));
        assert_eq!("http".parse::<RenderMode>(), Ok(RenderMode::Http));
        assert!("ftp".parse::<RenderMode>().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" www.zillow.com, ,www.redfin.com "),
            vec!["www.zillow.com".to_string(), "www.redfin.com".to_string()]
        );
    }
}
