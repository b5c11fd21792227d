//! HTTP 接口层

pub mod error;
pub mod health;
pub mod reports;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::orchestrator::ReportOrchestrator;

pub use error::{ApiError, ApiResult};

/// 构建路由
pub fn router(orchestrator: Arc<ReportOrchestrator>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/reports", post(reports::submit_report))
        .route("/api/reports/:id", get(reports::get_report))
        .with_state(orchestrator)
}
