use async_trait::async_trait;
use chromiumoxide::Browser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{RenderedDocument, SourceRenderer};
use crate::error::{AnalysisError, AppError, AppResult};
use crate::infrastructure::JsExecutor;
use crate::models::submission::is_allowed_host;
use crate::models::Stage;

/// 基于 chromiumoxide 的渲染器
///
/// 每次渲染开一个新标签页，读取完成或超时后关闭。
/// 渲染在独立任务中进行，调用方放弃等待时标签页依然会被关闭。
pub struct ChromiumRenderer {
    browser: Arc<Browser>,
    allowed_hosts: Arc<Vec<String>>,
    timeout: Duration,
}

impl ChromiumRenderer {
    pub fn new(browser: Arc<Browser>, allowed_hosts: Vec<String>, timeout: Duration) -> Self {
        Self {
            browser,
            allowed_hosts: Arc::new(allowed_hosts),
            timeout,
        }
    }
}

#[async_trait]
impl SourceRenderer for ChromiumRenderer {
    async fn render(&self, url: &Url) -> AppResult<RenderedDocument> {
        info!("🌐 正在渲染页面: {}", url);

        let browser = self.browser.clone();
        let allowed_hosts = self.allowed_hosts.clone();
        let timeout = self.timeout;
        let target = url.clone();
        let task = tokio::spawn(async move {
            render_in_tab(&browser, &allowed_hosts, &target, timeout).await
        });

        let document = task
            .await
            .map_err(|e| AppError::render_failed(url.as_str(), format!("渲染任务异常结束: {}", e)))??;
        info!(
            "✓ 页面渲染完成: {} ({} 字节, {} 个内嵌状态)",
            document.url,
            document.html.len(),
            document.state_payloads.len()
        );
        Ok(document)
    }
}

async fn render_in_tab(
    browser: &Browser,
    allowed_hosts: &[String],
    url: &Url,
    timeout: Duration,
) -> AppResult<RenderedDocument> {
    let timed_out = || {
        AppError::Analysis(AnalysisError::Timeout {
            stage: Stage::Extraction,
            secs: timeout.as_secs(),
        })
    };

    // 先开空白页，截止时间只约束导航与读取，超时后手上总有可关闭的页面
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| AppError::render_failed(url.as_str(), e))?;
    let executor = JsExecutor::new(page);

    let result = match tokio::time::timeout(timeout, read_page(&executor, allowed_hosts, url)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("⚠️ 页面渲染超时: {}", url);
            Err(timed_out())
        }
    };

    if let Err(e) = executor.close().await {
        debug!("关闭页面失败: {}", e);
    }

    result
}

async fn read_page(
    executor: &JsExecutor,
    allowed_hosts: &[String],
    url: &Url,
) -> AppResult<RenderedDocument> {
    executor.goto(url.as_str()).await?;
    executor.wait_for_navigation().await?;

    // 跳转后的最终地址必须仍在白名单内
    let final_url = executor
        .current_url()
        .await?
        .unwrap_or_else(|| url.to_string());
    let parsed = Url::parse(&final_url)
        .map_err(|e| AppError::render_failed(url.as_str(), format!("无效的最终地址: {}", e)))?;
    if !is_allowed_host(&parsed, allowed_hosts) {
        warn!("页面跳转到了不受支持的站点: {}", final_url);
        return Err(AppError::render_failed(
            url.as_str(),
            format!("redirected to a host that is not allowed: {}", final_url),
        ));
    }

    let html = executor.content().await?;
    let title = executor.title().await.unwrap_or_else(|e| {
        debug!("读取页面标题失败: {}", e);
        None
    });
    let state_payloads = executor.state_payloads().await.unwrap_or_else(|e| {
        debug!("读取内嵌状态失败: {}", e);
        Vec::new()
    });

    Ok(RenderedDocument {
        url: final_url,
        html,
        title,
        state_payloads,
    })
}
