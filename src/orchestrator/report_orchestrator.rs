//! 报告编排器
//!
//! - 提交：校验目标地址 → 创建待处理报告 → 后台任务处理
//! - 查询：返回报告的只读快照
//! - 并发：Semaphore 限制同时处理的报告数量

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Report, ReportStatus, Submission};
use crate::orchestrator::store::ReportStore;
use crate::workflow::{ReportCtx, ReportFlow};

/// 提交成功后的返回
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub report_id: Uuid,
    pub status: ReportStatus,
    /// 建议的轮询间隔
    pub poll_interval_ms: u64,
}

pub struct ReportOrchestrator {
    store: ReportStore,
    flow: Arc<ReportFlow>,
    semaphore: Arc<Semaphore>,
    allowed_hosts: Vec<String>,
    search_base: String,
    poll_interval_ms: u64,
}

impl ReportOrchestrator {
    pub fn new(
        flow: ReportFlow,
        max_concurrent: usize,
        allowed_hosts: Vec<String>,
        search_base: impl Into<String>,
        poll_interval_ms: u64,
    ) -> Self {
        Self {
            store: ReportStore::new(),
            flow: Arc::new(flow),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            allowed_hosts,
            search_base: search_base.into(),
            poll_interval_ms,
        }
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// 提交一份报告请求
    ///
    /// 校验失败时直接返回错误，不创建报告，也不发起任何抓取。
    pub async fn submit(&self, submission: Submission) -> AppResult<SubmitResponse> {
        let target = match submission.resolve_target(&self.allowed_hosts, &self.search_base) {
            Ok(url) => url,
            Err(e) => {
                warn!("⚠️ 拒绝提交: {}", e);
                return Err(e);
            }
        };

        let report = Report::new(target.as_str());
        let report_id = report.id;
        let status = report.status;
        self.store.insert(report).await;

        let ctx = ReportCtx::new(report_id, target);
        info!("{} 📥 已创建报告: {}", ctx, ctx.target);

        let store = self.store.clone();
        let flow = self.flow.clone();
        let semaphore = self.semaphore.clone();
        tokio::spawn(async move {
            process_report(ctx, store, flow, semaphore).await;
        });

        Ok(SubmitResponse {
            report_id,
            status,
            poll_interval_ms: self.poll_interval_ms,
        })
    }

    /// 查询报告快照
    pub async fn query(&self, report_id: Uuid) -> Option<Report> {
        self.store.get(report_id).await
    }
}

/// 后台处理单份报告，结束时报告必定处于终态
async fn process_report(
    ctx: ReportCtx,
    store: ReportStore,
    flow: Arc<ReportFlow>,
    semaphore: Arc<Semaphore>,
) {
    // 排队期间保持 Pending；拿不到许可时也先进入 Processing 再标记失败
    let permit = semaphore.acquire_owned().await;

    if let Err(e) = store
        .update(ctx.report_id, |r| r.transition_to(ReportStatus::Processing))
        .await
    {
        error!("{} ❌ 无法开始处理: {}", ctx, e);
        return;
    }

    let outcome = match permit {
        Ok(permit) => {
            info!("{} 🚀 开始处理", ctx);
            run_isolated(&ctx, &store, flow, permit).await
        }
        Err(e) => Err(AppError::Internal(format!("无法获取处理许可: {}", e))),
    };

    let outcome = match outcome {
        Ok(()) => {
            store
                .update(ctx.report_id, |r| r.transition_to(ReportStatus::Completed))
                .await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => info!("{} ✅ 报告已完成", ctx),
        Err(e) => {
            let reason = e.failure_reason();
            error!("{} ❌ 处理失败: {}", ctx, reason);
            if let Err(e) = store.update(ctx.report_id, |r| r.fail(reason)).await {
                error!("{} ❌ 无法标记失败: {}", ctx, e);
            }
        }
    }
}

/// 在独立任务中运行流程；流程 panic 时转换为内部错误
async fn run_isolated(
    ctx: &ReportCtx,
    store: &ReportStore,
    flow: Arc<ReportFlow>,
    permit: OwnedSemaphorePermit,
) -> AppResult<()> {
    let task_ctx = ctx.clone();
    let task_store = store.clone();
    let handle = tokio::spawn(async move {
        let _permit = permit;
        flow.run(&task_ctx, &task_store).await
    });

    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(AppError::Internal("report processing panicked".to_string())),
        Err(e) => Err(AppError::Internal(format!("report processing was aborted: {}", e))),
    }
}
