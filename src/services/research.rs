//! AI 研究能力 - 业务能力层
//!
//! `ResearchService` 是流程层看到的唯一接口：翻新分析、可比房源、承包商查询。
//! 回复解析与校验也放在这里，无论背后是哪个模型，规则都一样：
//! 回复必须是 JSON（可以包在 ```json 代码块里），否则视为无效结果。

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::extraction::numeric::parse_float;
use crate::models::{
    ComparableProperty, Contractor, PropertyRecord, RenovationProject, RenovationSuggestion, Stage,
};

/// 回复中单个金额的上限；超出视为无效结果
pub const MAX_AMOUNT: f64 = 1e12;

/// 翻新分析结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenovationAnalysis {
    pub projects: Vec<RenovationProject>,
    pub market_summary: Option<String>,
    pub additional_suggestions: Vec<RenovationSuggestion>,
}

/// AI 研究服务
#[async_trait]
pub trait ResearchService: Send + Sync {
    /// 根据房源记录给出翻新项目
    async fn analyze_renovations(&self, property: &PropertyRecord) -> AppResult<RenovationAnalysis>;

    /// 查找可比房源
    async fn find_comparables(&self, property: &PropertyRecord) -> AppResult<Vec<ComparableProperty>>;

    /// 为某个翻新项目查找当地承包商
    async fn find_contractors(&self, project_name: &str, address: &str) -> AppResult<Vec<Contractor>>;
}

/// 从回复中取出 JSON：整体解析，失败时找 ```json 代码块
pub fn extract_json(reply: &str, stage: Stage) -> AppResult<Value> {
    let trimmed = reply.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    fenced_block(trimmed)
        .and_then(|block| serde_json::from_str::<Value>(block).ok())
        .ok_or_else(|| AppError::bad_response(stage, "reply is not valid JSON"))
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```json").map(|i| i + "```json".len()).or_else(|| {
        text.find("```").map(|i| i + 3)
    })?;
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// 解析翻新分析回复
///
/// 每个项目必须有名称、成本区间（low ≤ high，中点 > 0）和增值估计；
/// 任何一项不满足都让整个回复无效，不做修补。
pub fn parse_renovation_reply(reply: &str) -> AppResult<RenovationAnalysis> {
    let stage = Stage::RenovationAnalysis;
    let root = extract_json(reply, stage)?;

    let items = list_at(
        &root,
        &["renovation_ideas", "renovationProjects", "renovation_projects", "projects"],
    )
    .ok_or_else(|| AppError::bad_response(stage, "missing renovation project list"))?;

    let projects = items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_project(i, item))
        .collect::<AppResult<Vec<_>>>()?;

    let market_summary = ["market_summary", "marketSummary"]
        .iter()
        .find_map(|k| root.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let additional_suggestions = list_at_key(&root, &["additional_suggestions", "additionalSuggestions"])
        .map(|items| items.iter().filter_map(parse_suggestion).collect())
        .unwrap_or_default();

    Ok(RenovationAnalysis {
        projects,
        market_summary,
        additional_suggestions,
    })
}

/// 额外建议只是补充信息，缺少名称的条目直接跳过
fn parse_suggestion(item: &Value) -> Option<RenovationSuggestion> {
    Some(RenovationSuggestion {
        name: str_field(item, &["name", "title"])?,
        description: str_field(item, &["description"]),
        reason: str_field(item, &["reason"]),
    })
}

fn parse_project(index: usize, item: &Value) -> AppResult<RenovationProject> {
    let stage = Stage::RenovationAnalysis;
    let bad = |msg: String| AppError::bad_response(stage, format!("project #{}: {}", index + 1, msg));

    let name = str_field(item, &["name", "title"]).ok_or_else(|| bad("missing name".into()))?;

    let cost = item
        .get("estimated_cost")
        .or_else(|| item.get("estimatedCost"))
        .or_else(|| item.get("cost"));
    let (low, high) = match cost {
        Some(range @ Value::Object(_)) => (
            range.get("low").and_then(number),
            range.get("high").and_then(number),
        ),
        Some(single) => {
            let v = number(single);
            (v, v)
        }
        None => (
            item.get("costRangeLow").and_then(number),
            item.get("costRangeHigh").and_then(number),
        ),
    };
    let (low, high) = match (low, high) {
        (Some(l), Some(h)) => (l, h),
        _ => return Err(bad("missing cost range".into())),
    };
    if low < 0.0 || high < low {
        return Err(bad(format!("invalid cost range {}..{}", low, high)));
    }
    if low + high <= 0.0 {
        return Err(bad("cost must be positive".into()));
    }
    if high > MAX_AMOUNT {
        return Err(bad(format!("cost {} is out of range", high)));
    }

    let value = item
        .get("estimated_value_add")
        .or_else(|| item.get("estimatedValueAdd"))
        .or_else(|| item.get("valueAdd"))
        .or_else(|| item.get("value_add"));
    let value_add = match value {
        Some(range @ Value::Object(_)) => range.get("medium").and_then(number).or_else(|| {
            match (range.get("low").and_then(number), range.get("high").and_then(number)) {
                (Some(l), Some(h)) => Some((l + h) / 2.0),
                (one, other) => one.or(other),
            }
        }),
        Some(single) => number(single),
        None => None,
    }
    .ok_or_else(|| bad("missing value add".into()))?;
    if value_add.abs() > MAX_AMOUNT {
        return Err(bad(format!("value add {} is out of range", value_add)));
    }

    Ok(RenovationProject {
        id: format!("proj-{}", index + 1),
        name,
        description: str_field(item, &["description"]),
        cost_range_low: low.round() as i64,
        cost_range_high: high.round() as i64,
        value_add: value_add.round() as i64,
        timeline: str_field(item, &["timeline"]),
        market_demand: str_field(item, &["market_demand", "marketDemand"]),
        buyer_profile: str_field(item, &["buyer_profile", "buyerProfile"]),
    })
}

/// 解析可比房源回复；缺少地址的条目视为无效
pub fn parse_comparables_reply(reply: &str) -> AppResult<Vec<ComparableProperty>> {
    let stage = Stage::Comparables;
    let root = extract_json(reply, stage)?;
    let items = list_at(&root, &["comparable_properties", "comparableProperties", "comps"])
        .ok_or_else(|| AppError::bad_response(stage, "missing comparable list"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let address = str_field(item, &["address"]).ok_or_else(|| {
                AppError::bad_response(stage, format!("comparable #{}: missing address", i + 1))
            })?;
            let sale_price = item
                .get("sale_price")
                .or_else(|| item.get("salePrice"))
                .and_then(number);
            if sale_price.is_some_and(|p| p.abs() > MAX_AMOUNT) {
                return Err(AppError::bad_response(
                    stage,
                    format!("comparable #{}: sale price out of range", i + 1),
                ));
            }
            Ok(ComparableProperty {
                address,
                sale_price: sale_price.map(|p| p.round() as i64),
                price_per_sqft: item
                    .get("price_per_sqft")
                    .or_else(|| item.get("pricePerSqft"))
                    .and_then(number),
                summary: str_field(item, &["brief_summary", "summary"]),
                url: str_field(item, &["url"]),
            })
        })
        .collect()
}

/// 解析承包商回复；缺少名称的条目视为无效
pub fn parse_contractors_reply(reply: &str) -> AppResult<Vec<Contractor>> {
    let stage = Stage::Contractors;
    let root = extract_json(reply, stage)?;
    let items = list_at(&root, &["recommended_contractors", "contractors"])
        .ok_or_else(|| AppError::bad_response(stage, "missing contractor list"))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let name = str_field(item, &["name"]).ok_or_else(|| {
                AppError::bad_response(stage, format!("contractor #{}: missing name", i + 1))
            })?;
            Ok(Contractor {
                name,
                specialty: str_field(item, &["specialty"]),
                contact_info: str_field(item, &["contact_info", "contactInfo"]),
                url: str_field(item, &["url"]),
            })
        })
        .collect()
}

/// 顶层数组，或对象中的第一个匹配键
fn list_at<'v>(root: &'v Value, keys: &[&str]) -> Option<&'v Vec<Value>> {
    if let Value::Array(items) = root {
        return Some(items);
    }
    list_at_key(root, keys)
}

fn list_at_key<'v>(root: &'v Value, keys: &[&str]) -> Option<&'v Vec<Value>> {
    keys.iter().find_map(|k| root.get(*k).and_then(Value::as_array))
}

fn str_field(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float(s),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}
