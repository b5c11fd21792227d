use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::{RenderedDocument, SourceRenderer};
use crate::error::{AppError, AppResult};
use crate::models::submission::is_allowed_host;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const MAX_REDIRECTS: usize = 10;

/// 直接 HTTP 抓取（不执行页面脚本）
///
/// 只跟随目标主机在白名单内的跳转。
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(allowed_hosts: Vec<String>, timeout: Duration) -> AppResult<Self> {
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.stop()
            } else if is_allowed_host(attempt.url(), &allowed_hosts) {
                attempt.follow()
            } else {
                attempt.stop()
            }
        });

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(policy)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SourceRenderer for HttpRenderer {
    async fn render(&self, url: &Url) -> AppResult<RenderedDocument> {
        info!("🌐 正在抓取页面: {}", url);

        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            warn!("拒绝跟随跳转: {} → {}", url, location);
            return Err(AppError::render_failed(
                url.as_str(),
                format!("redirected to a host that is not allowed: {}", location),
            ));
        }
        if !status.is_success() {
            return Err(AppError::render_failed(url.as_str(), format!("HTTP {}", status)));
        }

        let final_url = response.url().to_string();
        let html = response.text().await?;

        info!("✓ 页面抓取完成: {} ({} 字节)", final_url, html.len());
        Ok(RenderedDocument::new(final_url, html))
    }
}
