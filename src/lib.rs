//! # Listing Report
//!
//! 把一个房源页面（或一个地址）变成一份逐步填充的投资分析报告
//!
//! ## 架构设计
//!
//! 本系统采用分层架构，依赖只能自上而下：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `browser/` - 启动无头浏览器或连接已有浏览器
//!
//! ### ② 提取层（Render / Extraction / Merge）
//! - `render/` - 把目标地址变成 `RenderedDocument`（浏览器或 HTTP）
//! - `extraction/` - 四种策略产出带来源标记的候选值
//! - `merge/` - 按来源优先级合并为 `PropertyRecord`，价格和地址必须可靠
//!
//! ### ③ 业务能力层（Services）
//! - `LlmService` - 翻新分析、可比房源、承包商（实现 `ResearchService`）
//! - `financial` - ROI 与机会分
//! - `imagery` - 地图 / 街景图片（失败只降级）
//!
//! ### ④ 流程层（Workflow）
//! - `ReportCtx` - 上下文封装（report_id + 目标地址）
//! - `ReportFlow` - 流程编排（提取 → 翻新 → 财务 → 可比房源 → 承包商）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `ReportStore` - 以 id 为键的报告存储
//! - `ReportOrchestrator` - 提交校验、并发控制、后台处理
//!
//! ### ⑥ 接口层（API）
//! - `api/` - axum 路由
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod extraction;
pub mod infrastructure;
pub mod merge;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AnalysisError, AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{PropertyRecord, Report, ReportStatus, Stage, Submission};
pub use orchestrator::{ReportOrchestrator, ReportStore, SubmitResponse};
pub use workflow::{ReportCtx, ReportFlow, StageTimeouts};
