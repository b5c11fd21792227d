//! 页面渲染
//!
//! 提取层只依赖 `RenderedDocument` 这个输出形状，不关心页面是如何获得的。

pub mod chromium;
pub mod http;

use async_trait::async_trait;
use url::Url;

use crate::error::AppResult;

pub use chromium::ChromiumRenderer;
pub use http::HttpRenderer;

/// 渲染后的页面
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocument {
    /// 最终 URL（跟随跳转之后）
    pub url: String,
    pub html: String,
    pub title: Option<String>,
    /// 渲染器从页面全局对象直接读到的内嵌状态（JSON 文本）
    pub state_payloads: Vec<String>,
}

impl RenderedDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            title: None,
            state_payloads: Vec::new(),
        }
    }
}

/// 渲染器
#[async_trait]
pub trait SourceRenderer: Send + Sync {
    /// 渲染给定 URL；调用方负责超时控制
    async fn render(&self, url: &Url) -> AppResult<RenderedDocument>;
}
