//! 字段合并
//!
//! 对每个字段，在非空候选值中选出来源优先级最高的一个
//! （embedded_state > table > heuristic > meta），同级保留先出现的值。
//!
//! 合并后校验：
//! - 价格缺失或 ≤ 0 → `AppError::Extraction("no valid price found")`
//! - 地址缺失 → 从页面标题推断（来源记为 meta），标题也不可用时才失败
//!
//! 其它字段缺失时保持 `None`，绝不填充占位值。

use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::extraction::{images, CandidateSet, ExtractionCandidate};
use crate::models::submission::source_name;
use crate::models::{Field, FieldValue, PropertyRecord, Provenance};

/// 合并所需的页面信息
#[derive(Debug, Clone, Default)]
pub struct MergeInput<'a> {
    pub source_url: &'a str,
    pub title: Option<&'a str>,
}

pub struct FieldMerger {
    max_images: usize,
}

impl FieldMerger {
    pub fn new(max_images: usize) -> Self {
        Self { max_images }
    }

    /// 合并候选值为房源记录
    pub fn merge(&self, candidates: &CandidateSet, input: MergeInput<'_>) -> AppResult<PropertyRecord> {
        let mut chosen: BTreeMap<Field, &ExtractionCandidate> = BTreeMap::new();
        for field in Field::ALL {
            if let Some(best) = select(candidates.get(field)) {
                debug!("字段 {} 采用来源 {}", field, best.provenance);
                chosen.insert(field, best);
            }
        }

        let mut provenance: BTreeMap<Field, Provenance> = BTreeMap::new();
        let mut take = |field: Field| -> Option<FieldValue> {
            chosen.get(&field).map(|c| {
                provenance.insert(field, c.provenance);
                c.value.clone()
            })
        };

        let price = take(Field::Price).and_then(|v| integer(&v));
        let address = take(Field::Address).and_then(|v| text(&v));
        let beds = take(Field::Beds).and_then(|v| float(&v));
        let baths = take(Field::Baths).and_then(|v| float(&v));
        let sqft = take(Field::Sqft).and_then(|v| integer(&v));
        let year_built = take(Field::YearBuilt).and_then(|v| integer(&v));
        let lot_size_sqft = take(Field::LotSizeSqft).and_then(|v| integer(&v));
        let home_type = take(Field::HomeType).and_then(|v| text(&v));
        let description = take(Field::Description).and_then(|v| text(&v));
        let images = match take(Field::Images) {
            Some(FieldValue::Images(urls)) => images::normalize_urls(urls, self.max_images),
            _ => Vec::new(),
        };
        let price_per_sqft = take(Field::PricePerSqft).and_then(|v| integer(&v));
        let parking = take(Field::Parking).and_then(|v| text(&v));
        let hoa_fee = take(Field::HoaFee).and_then(|v| integer(&v));

        let price = match price {
            Some(p) if p > 0 => p,
            other => {
                warn!("价格无效: {:?}", other);
                return Err(AppError::Extraction("no valid price found".to_string()));
            }
        };

        let address = match address {
            Some(a) => a,
            None => {
                let fallback = input.title.and_then(address_from_title).ok_or_else(|| {
                    AppError::Extraction("no address found".to_string())
                })?;
                warn!("未提取到地址，使用页面标题推断: {}", fallback);
                provenance.insert(Field::Address, Provenance::Meta);
                fallback
            }
        };

        Ok(PropertyRecord {
            address,
            price,
            beds,
            baths,
            sqft,
            year_built,
            lot_size_sqft,
            home_type,
            description,
            images,
            price_per_sqft,
            parking,
            hoa_fee,
            source: url::Url::parse(input.source_url)
                .ok()
                .as_ref()
                .and_then(source_name),
            source_url: input.source_url.to_string(),
            provenance,
            extracted_at: Utc::now(),
        })
    }
}

/// 优先级最高的非空候选值；同级保留先出现的
fn select(candidates: &[ExtractionCandidate]) -> Option<&ExtractionCandidate> {
    candidates
        .iter()
        .filter(|c| !c.value.is_empty())
        .fold(None, |best: Option<&ExtractionCandidate>, c| match best {
            Some(b) if b.provenance.rank() >= c.provenance.rank() => Some(b),
            _ => Some(c),
        })
}

fn integer(value: &FieldValue) -> Option<i64> {
    match value {
        FieldValue::Integer(i) => Some(*i),
        FieldValue::Float(f) if f.is_finite() => Some(f.round() as i64),
        FieldValue::Text(s) => crate::extraction::numeric::parse_integer(s),
        _ => None,
    }
}

fn float(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Text(s) => crate::extraction::numeric::parse_float(s),
        other => other.as_float().filter(|f| f.is_finite()),
    }
}

fn text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        FieldValue::Integer(i) => Some(i.to_string()),
        FieldValue::Float(f) => Some(f.to_string()),
        FieldValue::Images(_) => None,
    }
}

/// 从页面标题推断地址
///
/// "123 Main St, Seattle, WA 98101 | MLS #123 | Zillow" → "123 Main St, Seattle, WA 98101"。
/// 第一段不含数字时认为标题里没有地址。
pub fn address_from_title(title: &str) -> Option<String> {
    let first = title
        .split(" | ")
        .next()
        .unwrap_or(title)
        .split(" - ")
        .next()
        .unwrap_or(title);

    let mut candidate = first.trim().to_string();
    for suffix in ["For Sale", "for sale", "For Rent", "for rent"] {
        if let Some(stripped) = candidate.strip_suffix(suffix) {
            candidate = stripped.trim_end_matches([' ', ',']).to_string();
        }
    }

    let plausible = candidate.len() >= 5 && candidate.chars().any(|c| c.is_ascii_digit());
    plausible.then_some(candidate)
}
