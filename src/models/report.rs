//! 报告及其状态机
//!
//! 状态只能向前推进：`Pending → Processing → {Completed | Failed}`。
//! 结果字段只写一次；进入终态后报告不可再修改。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::property::PropertyRecord;
use crate::models::renovation::{
    ComparableProperty, Contractor, FinancialSummary, RenovationProject, RenovationSuggestion,
};

/// 报告状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    /// 是否允许从当前状态转移到 `next`
    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Processing)
                | (ReportStatus::Processing, ReportStatus::Completed)
                | (ReportStatus::Processing, ReportStatus::Failed)
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Processing => "processing",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// 处理阶段（固定顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    RenovationAnalysis,
    Financials,
    Comparables,
    Contractors,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extraction => "extraction",
            Stage::RenovationAnalysis => "renovation_analysis",
            Stage::Financials => "financials",
            Stage::Comparables => "comparables",
            Stage::Contractors => "contractors",
        };
        f.write_str(name)
    }
}

/// 报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub status: ReportStatus,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_data: Option<PropertyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imagery: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renovation_projects: Option<Vec<RenovationProject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_suggestions: Option<Vec<RenovationSuggestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_summary: Option<FinancialSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparable_properties: Option<Vec<ComparableProperty>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractors: Option<Vec<Contractor>>,
}

impl Report {
    /// 新建待处理报告
    pub fn new(source_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: ReportStatus::Pending,
            source_url: source_url.into(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            failure_reason: None,
            current_stage: None,
            property_data: None,
            imagery: None,
            renovation_projects: None,
            market_summary: None,
            additional_suggestions: None,
            financial_summary: None,
            comparable_properties: None,
            contractors: None,
        }
    }

    /// 状态转移（只能向前）
    pub fn transition_to(&mut self, next: ReportStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Internal(format!(
                "非法状态转移: {} -> {}",
                self.status, next
            )));
        }

        let now = Utc::now();
        self.status = next;
        self.updated_at = now;

        if next.is_terminal() {
            self.current_stage = None;
        }
        if next == ReportStatus::Completed {
            self.completed_at = Some(now);
        }

        Ok(())
    }

    /// 标记失败并记录原因
    pub fn fail(&mut self, reason: impl Into<String>) -> AppResult<()> {
        self.transition_to(ReportStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// 记录当前阶段（仅 Processing 时有效）
    pub fn begin_stage(&mut self, stage: Stage) -> AppResult<()> {
        self.ensure_processing()?;
        self.current_stage = Some(stage);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_property_data(&mut self, record: PropertyRecord) -> AppResult<()> {
        self.ensure_processing()?;
        write_once(&mut self.property_data, record, "propertyData")?;
        self.touch();
        Ok(())
    }

    pub fn set_imagery(&mut self, imagery: Vec<String>) -> AppResult<()> {
        self.ensure_processing()?;
        write_once(&mut self.imagery, imagery, "imagery")?;
        self.touch();
        Ok(())
    }

    pub fn set_renovation_analysis(
        &mut self,
        projects: Vec<RenovationProject>,
        market_summary: Option<String>,
        suggestions: Vec<RenovationSuggestion>,
    ) -> AppResult<()> {
        self.ensure_processing()?;
        write_once(&mut self.renovation_projects, projects, "renovationProjects")?;
        if let Some(summary) = market_summary {
            write_once(&mut self.market_summary, summary, "marketSummary")?;
        }
        if !suggestions.is_empty() {
            write_once(&mut self.additional_suggestions, suggestions, "additionalSuggestions")?;
        }
        self.touch();
        Ok(())
    }

    pub fn set_financial_summary(&mut self, summary: FinancialSummary) -> AppResult<()> {
        self.ensure_processing()?;
        write_once(&mut self.financial_summary, summary, "financialSummary")?;
        self.touch();
        Ok(())
    }

    pub fn set_comparables(&mut self, comps: Vec<ComparableProperty>) -> AppResult<()> {
        self.ensure_processing()?;
        write_once(&mut self.comparable_properties, comps, "comparableProperties")?;
        self.touch();
        Ok(())
    }

    pub fn set_contractors(&mut self, contractors: Vec<Contractor>) -> AppResult<()> {
        self.ensure_processing()?;
        write_once(&mut self.contractors, contractors, "contractors")?;
        self.touch();
        Ok(())
    }

    fn ensure_processing(&self) -> AppResult<()> {
        if self.status == ReportStatus::Processing {
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "报告 {} 当前状态为 {}，不能写入结果",
                self.id, self.status
            )))
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// 结果字段只允许写入一次
fn write_once<T>(slot: &mut Option<T>, value: T, name: &str) -> AppResult<()> {
    if slot.is_some() {
        return Err(AppError::Internal(format!("字段 {} 已写入，不能覆盖", name)));
    }
    *slot = Some(value);
    Ok(())
}
