//! 内嵌状态提取
//!
//! 房源页面通常把完整的房源数据以 JSON 形式嵌入页面
//! （`__NEXT_DATA__`、`window.__INITIAL_STATE__ = {...};` 等），
//! 其中部分子节点本身又是字符串化的 JSON。
//!
//! 流程：按内容特征定位载荷 → 解析并展开字符串化 JSON →
//! 沿已知路径定位房源节点（找不到时做通用搜索）→ 逐字段读取。
//! 任何路径缺失都只会让对应字段没有候选值。

use serde_json::Value;
use tracing::debug;

use super::images::normalize_images;
use super::numeric::{lot_size_from_parts, normalize_lot_size, parse_float, parse_integer};
use super::{collapse_whitespace, ExtractionCandidate, ExtractionStrategy, ParsedDocument};
use crate::models::{Field, FieldValue, Provenance};

/// 内嵌状态的内容特征
const SIGNATURES: &[&str] = &[
    "gdpClientCache",
    "\"homeInfo\"",
    "\"propertyDetails\"",
    "\"streetAddress\"",
    "\"livingArea\"",
    "\"listingPrice\"",
];

/// 已知的房源节点位置；`*` 表示遍历对象的所有值
const KNOWN_PATHS: &[&[&str]] = &[
    &["props", "pageProps", "componentProps", "gdpClientCache", "*", "property"],
    &["props", "pageProps", "gdpClientCache", "*", "property"],
    &["props", "pageProps", "initialReduxState", "gdp", "building"],
    &["props", "pageProps", "property"],
    &["propertyDetails"],
    &["homeInfo"],
    &["property"],
];

/// 通用搜索时用来识别房源节点的键
const PROPERTY_KEYS: &[&str] = &[
    "streetAddress",
    "address",
    "price",
    "listPrice",
    "bedrooms",
    "bathrooms",
    "livingArea",
    "yearBuilt",
    "zpid",
];

const MAX_DEPTH: usize = 24;

pub struct EmbeddedStateStrategy;

impl ExtractionStrategy for EmbeddedStateStrategy {
    fn name(&self) -> &'static str {
        "embedded_state"
    }

    fn provenance(&self) -> Provenance {
        Provenance::EmbeddedState
    }

    fn extract(&self, doc: &ParsedDocument<'_>) -> Vec<ExtractionCandidate> {
        let mut candidates = Vec::new();

        for payload in locate_payloads(doc) {
            let Some(root) = parse_payload(&payload) else {
                continue;
            };
            let root = expand_embedded_json(root, 0);

            let Some(node) = locate_property(&root) else {
                debug!("内嵌状态中未找到房源节点");
                continue;
            };

            for field in Field::ALL {
                if let Some(value) = read_field(node, field) {
                    candidates.push(ExtractionCandidate::new(
                        field,
                        value,
                        Provenance::EmbeddedState,
                    ));
                }
            }
        }

        candidates
    }
}

/// 渲染器提供的载荷 + 页面中带特征的脚本
fn locate_payloads(doc: &ParsedDocument<'_>) -> Vec<String> {
    let mut payloads: Vec<String> = doc.source.state_payloads.clone();

    for (script_type, text) in doc.scripts() {
        if script_type.is_some_and(|t| t.eq_ignore_ascii_case("application/ld+json")) {
            continue;
        }
        if SIGNATURES.iter().any(|sig| text.contains(sig)) && !payloads.contains(&text) {
            payloads.push(text);
        }
    }

    payloads
}

/// 解析载荷，兼容 `window.X = {...};` 形式
fn parse_payload(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// 展开字符串化的 JSON 子节点
fn expand_embedded_json(value: Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return value;
    }
    match value {
        Value::String(s) => {
            let t = s.trim();
            let looks_like_json = (t.starts_with('{') && t.ends_with('}'))
                || (t.starts_with('[') && t.ends_with(']'));
            if looks_like_json {
                if let Ok(inner) = serde_json::from_str::<Value>(t) {
                    return expand_embedded_json(inner, depth + 1);
                }
            }
            Value::String(s)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| expand_embedded_json(v, depth + 1))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, expand_embedded_json(v, depth + 1)))
                .collect(),
        ),
        other => other,
    }
}

fn locate_property(root: &Value) -> Option<&Value> {
    KNOWN_PATHS
        .iter()
        .find_map(|path| walk(root, path))
        .or_else(|| search_property(root, 0))
}

fn walk<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    let Some((head, rest)) = path.split_first() else {
        return value.is_object().then_some(value);
    };

    if *head == "*" {
        return value
            .as_object()?
            .values()
            .find_map(|child| walk(child, rest));
    }
    walk(value.get(*head)?, rest)
}

/// 通用搜索：找第一个同时带有地址与价格/面积类键的对象
fn search_property(value: &Value, depth: usize) -> Option<&Value> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            let hits = PROPERTY_KEYS.iter().filter(|k| map.contains_key(**k)).count();
            let has_address = map.contains_key("streetAddress") || map.contains_key("address");
            if has_address && hits >= 3 {
                return Some(value);
            }
            map.values().find_map(|v| search_property(v, depth + 1))
        }
        Value::Array(items) => items.iter().find_map(|v| search_property(v, depth + 1)),
        _ => None,
    }
}

fn read_field(node: &Value, field: Field) -> Option<FieldValue> {
    match field {
        Field::Address => read_address(node).map(FieldValue::Text),
        Field::Price => {
            first_integer(node, &["/price", "/listPrice", "/listingPrice", "/priceInfo/amount"])
                .map(FieldValue::Integer)
        }
        Field::Beds => first_float(node, &["/bedrooms", "/beds", "/numBeds"]).map(FieldValue::Float),
        Field::Baths => first_float(node, &["/bathrooms", "/baths", "/bathroomsFloat", "/numBaths"])
            .map(FieldValue::Float),
        Field::Sqft => first_integer(node, &["/livingArea", "/livingAreaValue", "/sqFt", "/sqft"])
            .map(FieldValue::Integer),
        Field::YearBuilt => first_integer(node, &["/yearBuilt", "/resoFacts/yearBuilt"])
            .map(FieldValue::Integer),
        Field::LotSizeSqft => read_lot_size(node).map(FieldValue::Integer),
        Field::HomeType => first_text(node, &["/homeType", "/propertyType", "/resoFacts/homeType"])
            .map(|t| FieldValue::Text(humanize(&t))),
        Field::Description => {
            first_text(node, &["/description", "/listingRemarks", "/remarks"]).map(FieldValue::Text)
        }
        Field::Images => read_images(node).map(FieldValue::Images),
        Field::PricePerSqft => first_integer(
            node,
            &["/resoFacts/pricePerSquareFoot", "/pricePerSquareFoot", "/pricePerSqFt"],
        )
        .map(FieldValue::Integer),
        Field::Parking => read_parking(node).map(FieldValue::Text),
        Field::HoaFee => first_integer(node, &["/monthlyHoaFee", "/hoaFee", "/resoFacts/hoaFee"])
            .map(FieldValue::Integer),
    }
}

/// 地址：对象形式拼接为 "街道, 城市, 州 邮编"，字符串形式直接使用
fn read_address(node: &Value) -> Option<String> {
    let composed = match node.get("address") {
        Some(Value::String(s)) => Some(collapse_whitespace(s)),
        Some(obj @ Value::Object(_)) => compose_address(obj),
        _ => None,
    };
    composed
        .or_else(|| compose_address(node))
        .filter(|a| !a.is_empty())
}

fn compose_address(obj: &Value) -> Option<String> {
    let street = text_at(obj, "/streetAddress").or_else(|| text_at(obj, "/streetLine"))?;
    let city = text_at(obj, "/city");
    let state = text_at(obj, "/state");
    let zip = text_at(obj, "/zipcode").or_else(|| text_at(obj, "/zip"));

    let region = match (state, zip) {
        (Some(s), Some(z)) => Some(format!("{} {}", s, z)),
        (Some(s), None) => Some(s),
        (None, Some(z)) => Some(z),
        (None, None) => None,
    };

    let parts: Vec<String> = [Some(street), city, region].into_iter().flatten().collect();
    Some(parts.join(", "))
}

fn read_lot_size(node: &Value) -> Option<i64> {
    if let Some(value) = node.pointer("/lotAreaValue").and_then(number_of) {
        let units = node.pointer("/lotAreaUnits").and_then(Value::as_str);
        if let Some(sqft) = lot_size_from_parts(value, units) {
            return Some(sqft);
        }
    }

    ["/lotSize", "/resoFacts/lotSize", "/lotSqFt"]
        .iter()
        .filter_map(|p| node.pointer(p))
        .find_map(|v| match v {
            Value::Number(n) => n.as_f64().and_then(|f| lot_size_from_parts(f, None)),
            Value::String(s) => normalize_lot_size(s),
            Value::Object(_) => v.get("value").and_then(number_of).and_then(|f| {
                lot_size_from_parts(f, v.get("units").and_then(Value::as_str))
            }),
            _ => None,
        })
}

fn read_parking(node: &Value) -> Option<String> {
    ["/resoFacts/parkingFeatures", "/parkingFeatures", "/parking"]
        .iter()
        .filter_map(|p| node.pointer(p))
        .find_map(|v| match v {
            Value::String(s) => Some(collapse_whitespace(s)),
            Value::Array(items) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            _ => None,
        })
        .filter(|s| !s.is_empty())
}

/// 图片：`responsivePhotos` / `photos` / `originalPhotos`，
/// 每张照片取所有尺寸，再交给去重逻辑挑出最大的版本
fn read_images(node: &Value) -> Option<Vec<String>> {
    let mut entries: Vec<(String, Option<u32>)> = Vec::new();

    for key in ["/responsivePhotos", "/photos", "/originalPhotos", "/photoUrls"] {
        if let Some(Value::Array(items)) = node.pointer(key) {
            for item in items {
                collect_photo(item, &mut entries);
            }
        }
    }

    if entries.is_empty() {
        return None;
    }
    let urls = normalize_images(entries, usize::MAX);
    (!urls.is_empty()).then_some(urls)
}

fn collect_photo(item: &Value, out: &mut Vec<(String, Option<u32>)>) {
    match item {
        Value::String(s) => out.push((s.clone(), None)),
        Value::Object(map) => {
            if let Some(sources) = map.get("mixedSources").and_then(Value::as_object) {
                for variants in sources.values().filter_map(Value::as_array) {
                    for variant in variants {
                        if let Some(url) = variant.get("url").and_then(Value::as_str) {
                            let width = variant
                                .get("width")
                                .and_then(Value::as_u64)
                                .and_then(|w| u32::try_from(w).ok());
                            out.push((url.to_string(), width));
                        }
                    }
                }
            }
            for key in ["url", "fullScreenPhotoUrl", "nonFullScreenPhotoUrl"] {
                if let Some(url) = map.get(key).and_then(Value::as_str) {
                    let width = map
                        .get("width")
                        .and_then(Value::as_u64)
                        .and_then(|w| u32::try_from(w).ok());
                    out.push((url.to_string(), width));
                }
            }
        }
        _ => {}
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float(s),
        Value::Object(_) => value.get("value").and_then(number_of),
        _ => None,
    }
}

fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => parse_integer(s),
        Value::Object(_) => value.get("value").and_then(integer_of),
        _ => None,
    }
}

fn first_integer(node: &Value, pointers: &[&str]) -> Option<i64> {
    pointers
        .iter()
        .filter_map(|p| node.pointer(p))
        .find_map(integer_of)
}

fn first_float(node: &Value, pointers: &[&str]) -> Option<f64> {
    pointers
        .iter()
        .filter_map(|p| node.pointer(p))
        .find_map(number_of)
        .filter(|f| f.is_finite())
}

fn text_at(node: &Value, pointer: &str) -> Option<String> {
    node.pointer(pointer)
        .and_then(Value::as_str)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn first_text(node: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| text_at(node, p))
}

/// "SINGLE_FAMILY" → "Single Family"
fn humanize(raw: &str) -> String {
    if !raw.contains('_') && raw.chars().any(|c| c.is_lowercase()) {
        return raw.to_string();
    }
    raw.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let lower = w.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
