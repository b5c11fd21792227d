//! 财务计算
//!
//! 每个项目：成本 = 区间中点，ROI = (增值 − 成本) / 成本 × 100。
//! 机会分 = 各项目 ROI 算术平均值四舍五入；没有项目时为空。

use crate::error::{AppError, AppResult};
use crate::models::{FinancialSummary, ProjectReturn, QuickInsights, RenovationProject, Stage};

/// 快速概览取 ROI 最高的项目数
pub const TOP_OPPORTUNITIES: usize = 3;

/// 计算财务汇总
///
/// `property_value` 使用挂牌价。成本非正的项目无法计算 ROI，整个阶段失败；
/// 金额累加溢出同样视为无效结果。
pub fn summarize(projects: &[RenovationProject], property_value: i64) -> AppResult<FinancialSummary> {
    let project_returns = projects
        .iter()
        .map(|p| {
            let roi = p.roi().filter(|r| r.is_finite()).ok_or_else(|| {
                AppError::bad_response(
                    Stage::Financials,
                    format!("project '{}' has a non-positive cost", p.name),
                )
            })?;
            Ok(ProjectReturn {
                project_id: p.id.clone(),
                name: p.name.clone(),
                cost: p.cost(),
                value_add: p.value_add,
                roi,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let average_roi = if project_returns.is_empty() {
        None
    } else {
        Some(project_returns.iter().map(|r| r.roi).sum::<f64>() / project_returns.len() as f64)
    };

    let total_cost_low = checked_total(projects.iter().map(|p| p.cost_range_low), "total cost")?;
    let total_cost_high = checked_total(projects.iter().map(|p| p.cost_range_high), "total cost")?;
    let total_value_add = checked_total(projects.iter().map(|p| p.value_add), "total value add")?;
    let projected_value = property_value
        .checked_add(total_value_add)
        .ok_or_else(|| overflow("projected value"))?;

    Ok(FinancialSummary {
        average_roi,
        opportunity_score: average_roi.map(|avg| avg.round() as i64),
        total_cost_low,
        total_cost_high,
        total_value_add,
        property_value,
        projected_value,
        quick_insights: quick_insights(&project_returns)?,
        project_returns,
    })
}

/// ROI 最高的几个项目及其预算、增值与潜力分
pub fn quick_insights(returns: &[ProjectReturn]) -> AppResult<QuickInsights> {
    let mut ranked: Vec<&ProjectReturn> = returns.iter().collect();
    // 稳定排序，同分保持原顺序
    ranked.sort_by(|a, b| b.roi.total_cmp(&a.roi));
    let top: Vec<ProjectReturn> = ranked.into_iter().take(TOP_OPPORTUNITIES).cloned().collect();

    let estimated_budget: f64 = top.iter().map(|r| r.cost).sum();
    let potential_value_add = checked_total(top.iter().map(|r| r.value_add), "potential value add")?;
    let potential_score = if estimated_budget > 0.0 {
        let raw = potential_value_add as f64 / estimated_budget * 3.0;
        Some(((raw * 10.0).round() / 10.0).min(10.0))
    } else {
        None
    };

    Ok(QuickInsights {
        potential_score,
        estimated_budget,
        potential_value_add,
        top_opportunities: top,
    })
}

fn checked_total<I>(values: I, what: &str) -> AppResult<i64>
where
    I: IntoIterator<Item = i64>,
{
    values
        .into_iter()
        .try_fold(0i64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| overflow(what))
}

fn overflow(what: &str) -> AppError {
    AppError::bad_response(Stage::Financials, format!("{} is out of range", what))
}

/// ROI 最高的项目（同分取先出现的）
pub fn top_project<'a>(
    projects: &'a [RenovationProject],
    summary: &FinancialSummary,
) -> Option<&'a RenovationProject> {
    let best = summary
        .project_returns
        .iter()
        .fold(None::<&ProjectReturn>, |best, r| match best {
            Some(b) if b.roi >= r.roi => Some(b),
            _ => Some(r),
        })?;
    projects.iter().find(|p| p.id == best.project_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, low: i64, high: i64, value_add: i64) -> RenovationProject {
        RenovationProject {
            id: id.to_string(),
            name: format!("Project {}", id),
            description: None,
            cost_range_low: low,
            cost_range_high: high,
            value_add,
            timeline: None,
            market_demand: None,
            buyer_profile: None,
        }
    }

    #[test]
    fn test_roi_of_reference_project() {
        let projects = vec![project("a", 100000, 100000, 150000)];
        let summary = summarize(&projects, 500000).unwrap();
        assert!((summary.project_returns[0].roi - 50.0).abs() < 1e-9);
        assert_eq!(summary.opportunity_score, Some(50));
    }

    #[test]
    fn test_huge_amounts_fail_instead_of_overflowing() {
        let projects = vec![project("a", i64::MAX, i64::MAX, i64::MAX)];
        let err = summarize(&projects, 450000).unwrap_err();
        assert!(err.failure_reason().contains("financials"), "{}", err.failure_reason());

        let projects = vec![project("a", 10, 10, 20), project("b", 10, 10, i64::MAX)];
        assert!(summarize(&projects, 1).is_err());
    }

    #[test]
    fn test_quick_insights_take_top_three_by_roi() {
        let projects = vec![
            project("a", 10000, 10000, 11000), // ROI 10
            project("b", 10000, 10000, 20000), // ROI 100
            project("c", 10000, 10000, 15000), // ROI 50
            project("d", 10000, 10000, 13000), // ROI 30
        ];
        let insights = summarize(&projects, 1).unwrap().quick_insights;

        let ids: Vec<&str> = insights
            .top_opportunities
            .iter()
            .map(|r| r.project_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
        assert_eq!(insights.estimated_budget, 30000.0);
        assert_eq!(insights.potential_value_add, 48000);
        // 48000 / 30000 × 3 = 4.8
        assert_eq!(insights.potential_score, Some(4.8));
    }

    #[test]
    fn test_quick_insights_score_is_capped() {
        let projects = vec![project("a", 1000, 1000, 100000)];
        let insights = summarize(&projects, 1).unwrap().quick_insights;
        assert_eq!(insights.potential_score, Some(10.0));
    }

    #[test]
    fn test_roi_and_score() {
        let projects = vec![
            project("a", 20000, 40000, 45000), // cost 30000 → ROI 50
            project("b", 5000, 15000, 12000),  // cost 10000 → ROI 20
        ];
        let summary = summarize(&projects, 450000).unwrap();

        assert_eq!(summary.project_returns[0].cost, 30000.0);
        assert!((summary.project_returns[0].roi - 50.0).abs() < 1e-9);
        assert!((summary.project_returns[1].roi - 20.0).abs() < 1e-9);
        assert!((summary.average_roi.unwrap() - 35.0).abs() < 1e-9);
        assert_eq!(summary.opportunity_score, Some(35));
        assert_eq!(summary.total_cost_low, 25000);
        assert_eq!(summary.total_cost_high, 55000);
        assert_eq!(summary.total_value_add, 57000);
        assert_eq!(summary.projected_value, 507000);
    }

    #[test]
    fn test_score_rounds_half_away_from_zero() {
        let projects = vec![project("a", 10000, 10000, 10250)]; // ROI 2.5
        assert_eq!(summarize(&projects, 1).unwrap().opportunity_score, Some(3));
    }

    #[test]
    fn test_no_projects_means_no_score() {
        let summary = summarize(&[], 300000).unwrap();
        assert_eq!(summary.average_roi, None);
        assert_eq!(summary.opportunity_score, None);
        assert_eq!(summary.projected_value, 300000);
        assert_eq!(summary.quick_insights.potential_score, None);
        assert!(summary.quick_insights.top_opportunities.is_empty());
    }

    #[test]
    fn test_non_positive_cost_fails() {
        let err = summarize(&[project("a", 0, 0, 1000)], 1).unwrap_err();
        assert!(err.failure_reason().contains("financials"));
    }

    #[test]
    fn test_top_project() {
        let projects = vec![
            project("a", 10000, 10000, 12000),
            project("b", 10000, 10000, 15000),
            project("c", 10000, 10000, 15000),
        ];
        let summary = summarize(&projects, 1).unwrap();
        assert_eq!(top_project(&projects, &summary).map(|p| p.id.as_str()), Some("b"));
        assert!(top_project(&[], &summarize(&[], 1).unwrap()).is_none());
    }
}
