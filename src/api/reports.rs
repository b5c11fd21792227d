//! 报告接口
//!
//! - `POST /api/reports`：提交 `{url}` 或 `{address}`，返回 202
//! - `GET /api/reports/:id`：查询报告快照（只读）

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::models::{Report, Submission};
use crate::orchestrator::{ReportOrchestrator, SubmitResponse};

/// POST /api/reports
pub async fn submit_report(
    State(orchestrator): State<Arc<ReportOrchestrator>>,
    Json(submission): Json<Submission>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let response = orchestrator.submit(submission).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/reports/:id
pub async fn get_report(
    State(orchestrator): State<Arc<ReportOrchestrator>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Report>> {
    // 无法解析的 id 与不存在的 id 一样返回 404
    let report_id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::NotFound(format!("报告 {} 不存在", id)))?;

    orchestrator
        .query(report_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("报告 {} 不存在", id)))
}
