//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 接收提交、保存报告、调度后台处理，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `store` - 报告存储
//! - 以报告 id 为键保存报告
//! - 查询返回快照，写入在锁内完成
//!
//! ### `report_orchestrator` - 报告编排器
//! - 校验提交（白名单）并创建报告
//! - 控制并发数量（Semaphore）
//! - 为每份报告启动后台任务，保证最终进入终态
//!
//! ## 层次关系
//!
//! ```text
//! api (HTTP 路由)
//!     ↓
//! report_orchestrator (submit / query)
//!     ↓
//! workflow::ReportFlow (处理单份报告)
//!     ↓
//! render / extraction / merge / services
//!     ↓
//! infrastructure (JsExecutor)
//! ```

pub mod report_orchestrator;
pub mod store;

pub use report_orchestrator::{ReportOrchestrator, SubmitResponse};
pub use store::ReportStore;
