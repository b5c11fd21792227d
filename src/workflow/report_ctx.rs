//! 报告处理上下文
//!
//! 封装"我正在处理哪份报告、抓取哪个地址"这一信息

use std::fmt::Display;
use url::Url;
use uuid::Uuid;

/// 报告处理上下文
#[derive(Debug, Clone)]
pub struct ReportCtx {
    pub report_id: Uuid,
    /// 已通过白名单校验的目标地址
    pub target: Url,
}

impl ReportCtx {
    pub fn new(report_id: Uuid, target: Url) -> Self {
        Self { report_id, target }
    }
}

impl Display for ReportCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[报告 {}]", self.report_id)
    }
}
