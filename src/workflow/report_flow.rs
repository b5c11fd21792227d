//! 报告处理流程 - 流程层
//!
//! 核心职责：定义"一份报告"的完整处理流程
//!
//! 流程顺序（严格串行，后一阶段使用前一阶段的结果）：
//! 1. 提取：渲染 → 提取候选值 → 合并为房源记录（随后尝试获取地图图片，失败只降级）
//! 2. 翻新分析
//! 3. 财务计算
//! 4. 可比房源
//! 5. 承包商
//!
//! 每个阶段成功后立即写入存储，轮询方能看到逐步出现的结果。
//! 任何阶段出错都直接返回错误，由编排层把报告标记为失败。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AnalysisError, AppResult};
use crate::extraction::Extractor;
use crate::merge::{FieldMerger, MergeInput};
use crate::models::{PropertyRecord, Stage};
use crate::orchestrator::store::ReportStore;
use crate::render::SourceRenderer;
use crate::services::{financial, ImageryService, ResearchService};
use crate::workflow::report_ctx::ReportCtx;

/// 各类外部调用的超时
#[derive(Debug, Clone, Copy)]
pub struct StageTimeouts {
    pub render: Duration,
    pub analysis: Duration,
    pub lookup: Duration,
    pub imagery: Duration,
}

impl StageTimeouts {
    pub fn from_config(config: &Config) -> Self {
        Self {
            render: config.render_timeout(),
            analysis: config.analysis_timeout(),
            lookup: config.lookup_timeout(),
            imagery: config.imagery_timeout(),
        }
    }
}

/// 报告处理流程
///
/// - 编排单份报告的五个阶段
/// - 不持有报告状态，只通过 `ReportStore` 写入
/// - 只依赖能力接口（渲染器、研究服务、图片服务）
pub struct ReportFlow {
    renderer: Arc<dyn SourceRenderer>,
    research: Arc<dyn ResearchService>,
    imagery: Arc<dyn ImageryService>,
    extractor: Extractor,
    merger: FieldMerger,
    timeouts: StageTimeouts,
}

impl ReportFlow {
    pub fn new(
        renderer: Arc<dyn SourceRenderer>,
        research: Arc<dyn ResearchService>,
        imagery: Arc<dyn ImageryService>,
        max_images: usize,
        timeouts: StageTimeouts,
    ) -> Self {
        Self {
            renderer,
            research,
            imagery,
            extractor: Extractor::new(max_images),
            merger: FieldMerger::new(max_images),
            timeouts,
        }
    }

    pub async fn run(&self, ctx: &ReportCtx, store: &ReportStore) -> AppResult<()> {
        let id = ctx.report_id;

        // ========== 阶段 1: 提取 ==========
        store.update(id, |r| r.begin_stage(Stage::Extraction)).await?;
        info!("{} 🔍 正在提取房源数据: {}", ctx, ctx.target);

        let property = self.acquire_property(ctx).await?;
        info!(
            "{} ✓ 房源数据提取完成: {} (价格 {})",
            ctx, property.address, property.price
        );
        store
            .update(id, |r| r.set_property_data(property.clone()))
            .await?;

        self.attach_imagery(ctx, store, &property.address).await?;

        // ========== 阶段 2: 翻新分析 ==========
        store
            .update(id, |r| r.begin_stage(Stage::RenovationAnalysis))
            .await?;
        info!("{} 🛠️ 正在进行翻新分析...", ctx);

        let analysis = with_timeout(
            Stage::RenovationAnalysis,
            self.timeouts.analysis,
            self.research.analyze_renovations(&property),
        )
        .await?;
        info!("{} ✓ 翻新分析完成，共 {} 个项目", ctx, analysis.projects.len());

        let projects = analysis.projects.clone();
        store
            .update(id, |r| {
                r.set_renovation_analysis(
                    analysis.projects,
                    analysis.market_summary,
                    analysis.additional_suggestions,
                )
            })
            .await?;

        // ========== 阶段 3: 财务计算 ==========
        store.update(id, |r| r.begin_stage(Stage::Financials)).await?;

        let summary = financial::summarize(&projects, property.price)?;
        info!(
            "{} ✓ 财务计算完成，机会分: {:?}",
            ctx, summary.opportunity_score
        );
        let top = financial::top_project(&projects, &summary).cloned();
        store
            .update(id, |r| r.set_financial_summary(summary))
            .await?;

        // ========== 阶段 4: 可比房源 ==========
        store.update(id, |r| r.begin_stage(Stage::Comparables)).await?;
        info!("{} 🏘️ 正在查找可比房源...", ctx);

        let comps = with_timeout(
            Stage::Comparables,
            self.timeouts.lookup,
            self.research.find_comparables(&property),
        )
        .await?;
        info!("{} ✓ 找到 {} 个可比房源", ctx, comps.len());
        store.update(id, |r| r.set_comparables(comps)).await?;

        // ========== 阶段 5: 承包商 ==========
        store.update(id, |r| r.begin_stage(Stage::Contractors)).await?;

        let contractors = match top {
            Some(project) => {
                info!("{} 👷 正在为 '{}' 查找承包商...", ctx, project.name);
                with_timeout(
                    Stage::Contractors,
                    self.timeouts.lookup,
                    self.research.find_contractors(&project.name, &property.address),
                )
                .await?
            }
            None => {
                info!("{} 没有翻新项目，跳过承包商查询", ctx);
                Vec::new()
            }
        };
        info!("{} ✓ 找到 {} 个承包商", ctx, contractors.len());
        store
            .update(id, |r| r.set_contractors(contractors))
            .await?;

        Ok(())
    }

    /// 渲染并提取房源记录
    async fn acquire_property(&self, ctx: &ReportCtx) -> AppResult<PropertyRecord> {
        let rendered = with_timeout(
            Stage::Extraction,
            self.timeouts.render,
            self.renderer.render(&ctx.target),
        )
        .await?;

        // 解析后的 DOM 不是 Send，提取与合并在这里同步完成，不跨越 await
        let output = self.extractor.extract(&rendered);
        self.merger.merge(
            &output.candidates,
            MergeInput {
                source_url: &rendered.url,
                title: output.title.as_deref(),
            },
        )
    }

    /// 地图图片：失败或超时只记录警告
    async fn attach_imagery(&self, ctx: &ReportCtx, store: &ReportStore, address: &str) -> AppResult<()> {
        let result = with_timeout(
            Stage::Extraction,
            self.timeouts.imagery,
            self.imagery.imagery_for(address),
        )
        .await;

        match result {
            Ok(urls) if !urls.is_empty() => {
                info!("{} 🗺️ 已获取 {} 张地图图片", ctx, urls.len());
                store.update(ctx.report_id, |r| r.set_imagery(urls)).await
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("{} ⚠️ 地图图片获取失败，跳过: {}", ctx, e);
                Ok(())
            }
        }
    }
}

/// 为外部调用加超时；超时视为该阶段失败
pub async fn with_timeout<T, F>(stage: Stage, limit: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AnalysisError::Timeout {
            stage,
            secs: limit.as_secs(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn test_with_timeout_maps_elapsed_to_stage_error() {
        let result: AppResult<()> = with_timeout(Stage::Comparables, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            AppError::Analysis(AnalysisError::Timeout {
                stage: Stage::Comparables,
                ..
            })
        ));
        assert!(err.failure_reason().contains("comparables timed out"));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through() {
        let value = with_timeout(Stage::Extraction, Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
