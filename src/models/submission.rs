//! 提交请求与域名白名单校验
//!
//! 任何抓取发生之前，目标地址的主机名都必须精确命中白名单。

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::{AppError, AppResult};

/// 地址最大长度
const MAX_ADDRESS_LEN: usize = 200;

/// 提交请求：`{url}` 或 `{address}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl Submission {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            address: None,
        }
    }

    pub fn from_address(address: impl Into<String>) -> Self {
        Self {
            url: None,
            address: Some(address.into()),
        }
    }

    /// 解析出要渲染的目标地址
    ///
    /// - 同时提供时以 `url` 为准
    /// - `address` 会被转换成 `search_base` 下的搜索地址
    /// - 结果必须通过白名单校验
    pub fn resolve_target(&self, allowed_hosts: &[String], search_base: &str) -> AppResult<Url> {
        let url = match (non_blank(&self.url), non_blank(&self.address)) {
            (Some(raw), _) => Url::parse(raw)
                .map_err(|e| AppError::Validation(format!("无法解析 URL '{}': {}", raw, e)))?,
            (None, Some(address)) => address_search_url(address, search_base)?,
            (None, None) => {
                return Err(AppError::Validation("必须提供 url 或 address".to_string()));
            }
        };

        ensure_allowed(&url, allowed_hosts)?;
        Ok(url)
    }
}

/// 校验 URL 是否指向白名单内的房源站点
pub fn ensure_allowed(url: &Url, allowed_hosts: &[String]) -> AppResult<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(format!(
            "不支持的协议: {}",
            url.scheme()
        )));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(AppError::Validation("URL 不能包含用户凭据".to_string()));
    }
    if url.port().is_some() {
        return Err(AppError::Validation("URL 不能指定端口".to_string()));
    }
    if !is_allowed_host(url, allowed_hosts) {
        return Err(AppError::Validation(format!(
            "不支持的房源站点: {}",
            url.host_str().unwrap_or("<none>")
        )));
    }
    Ok(())
}

/// 主机名是否精确命中白名单（忽略大小写和末尾的点）
pub fn is_allowed_host(url: &Url, allowed_hosts: &[String]) -> bool {
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.trim_end_matches('.').to_ascii_lowercase(),
        _ => return false,
    };

    allowed_hosts
        .iter()
        .any(|allowed| allowed.trim().trim_end_matches('.').eq_ignore_ascii_case(&host))
}

/// 站点名（zillow / redfin / realtor …）
pub fn source_name(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 2 {
        Some(labels[labels.len() - 2].to_ascii_lowercase())
    } else {
        None
    }
}

fn address_search_url(address: &str, search_base: &str) -> AppResult<Url> {
    if address.chars().count() > MAX_ADDRESS_LEN {
        return Err(AppError::Validation("地址过长".to_string()));
    }

    let mut url = Url::parse(search_base)
        .map_err(|e| AppError::Internal(format!("搜索地址配置无效 '{}': {}", search_base, e)))?;
    url.path_segments_mut()
        .map_err(|_| AppError::Internal(format!("搜索地址不能拼接路径: {}", search_base)))?
        .pop_if_empty()
        .push(&format!("{}_rb", address))
        .push("");
    Ok(url)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
