//! 分析阶段的产出：翻新项目、可比房源、承包商、财务汇总

use serde::{Deserialize, Serialize};

/// 翻新项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenovationProject {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub cost_range_low: i64,
    pub cost_range_high: i64,
    pub value_add: i64,
    pub timeline: Option<String>,
    /// 当地市场对该项目的需求（High / Medium / Low）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_demand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_profile: Option<String>,
}

impl RenovationProject {
    /// 成本取区间中点（在 f64 中计算，不会溢出）
    pub fn cost(&self) -> f64 {
        (self.cost_range_low as f64 + self.cost_range_high as f64) / 2.0
    }

    /// ROI = (valueAdd − cost) / cost × 100，成本非正时没有意义
    pub fn roi(&self) -> Option<f64> {
        let cost = self.cost();
        if cost > 0.0 {
            Some((self.value_add as f64 - cost) / cost * 100.0)
        } else {
            None
        }
    }
}

/// 从照片中额外发现的翻新建议（没有成本估计，不参与财务计算）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenovationSuggestion {
    pub name: String,
    pub description: Option<String>,
    pub reason: Option<String>,
}

/// 可比房源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparableProperty {
    pub address: String,
    pub sale_price: Option<i64>,
    pub price_per_sqft: Option<f64>,
    pub summary: Option<String>,
    pub url: Option<String>,
}

/// 承包商
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contractor {
    pub name: String,
    pub specialty: Option<String>,
    pub contact_info: Option<String>,
    pub url: Option<String>,
}

/// 单个项目的收益
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReturn {
    pub project_id: String,
    pub name: String,
    pub cost: f64,
    pub value_add: i64,
    pub roi: f64,
}

/// 财务汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub project_returns: Vec<ProjectReturn>,
    /// 各项目 ROI 的算术平均值
    pub average_roi: Option<f64>,
    /// 平均 ROI 四舍五入
    pub opportunity_score: Option<i64>,
    pub total_cost_low: i64,
    pub total_cost_high: i64,
    pub total_value_add: i64,
    /// 使用挂牌价作为当前价值
    pub property_value: i64,
    pub projected_value: i64,
    pub quick_insights: QuickInsights,
}

/// 快速概览：ROI 最高的几个项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickInsights {
    /// 1 到 10 分：前几个项目增值 / 预算 × 3，保留一位小数；没有项目时为空
    pub potential_score: Option<f64>,
    /// 前几个项目成本中点之和
    pub estimated_budget: f64,
    pub potential_value_add: i64,
    pub top_opportunities: Vec<ProjectReturn>,
}
