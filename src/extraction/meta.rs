//! 页面元数据提取
//!
//! Open Graph / Twitter 卡片标签、`product:price:amount` 以及
//! `application/ld+json` 结构化数据。置信度最低，只用来补缺。

use serde_json::Value;

use super::{collapse_whitespace, text_value, ExtractionCandidate, ExtractionStrategy, ParsedDocument};
use crate::models::{Field, FieldValue, Provenance};

const ADDRESS_TAGS: &[&str] = &[
    r#"meta[name="twitter:text:street_address"]"#,
    r#"meta[property="og:street-address"]"#,
];
const LOCALITY_TAGS: &[&str] = &[r#"meta[property="og:locality"]"#];
const REGION_TAGS: &[&str] = &[r#"meta[property="og:region"]"#];
const POSTAL_TAGS: &[&str] = &[r#"meta[property="og:postal-code"]"#];

/// 单值字段 → meta 标签
const FIELD_TAGS: &[(Field, &[&str])] = &[
    (
        Field::Price,
        &[
            r#"meta[property="product:price:amount"]"#,
            r#"meta[name="twitter:text:price"]"#,
            r#"meta[property="og:price:amount"]"#,
        ],
    ),
    (Field::Beds, &[r#"meta[name="twitter:text:beds"]"#]),
    (Field::Baths, &[r#"meta[name="twitter:text:baths"]"#]),
    (
        Field::Sqft,
        &[r#"meta[name="twitter:text:sqft"]"#, r#"meta[name="twitter:text:sq_ft"]"#],
    ),
    (
        Field::Description,
        &[
            r#"meta[property="og:description"]"#,
            r#"meta[name="description"]"#,
        ],
    ),
];

const IMAGE_TAGS: &[&str] = &[
    r#"meta[property="og:image"]"#,
    r#"meta[property="og:image:url"]"#,
    r#"meta[name="twitter:image"]"#,
    r#"meta[name="twitter:image:src"]"#,
];

pub struct MetaStrategy;

impl ExtractionStrategy for MetaStrategy {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn provenance(&self) -> Provenance {
        Provenance::Meta
    }

    fn extract(&self, doc: &ParsedDocument<'_>) -> Vec<ExtractionCandidate> {
        let mut candidates = Vec::new();
        let mut push = |field: Field, value: Option<FieldValue>| {
            if let Some(value) = value {
                candidates.push(ExtractionCandidate::new(field, value, Provenance::Meta));
            }
        };

        push(Field::Address, meta_address(doc).map(FieldValue::Text));
        for (field, tags) in FIELD_TAGS {
            push(
                *field,
                doc.meta_content(tags).and_then(|raw| text_value(*field, &raw)),
            );
        }
        push(Field::Images, meta_images(doc).map(FieldValue::Images));

        for ld in json_ld_listings(doc) {
            push(Field::Address, ld_address(&ld).map(FieldValue::Text));
            push(
                Field::Price,
                ld_text(&ld, &["/offers/price", "/offers/0/price", "/price"])
                    .and_then(|raw| text_value(Field::Price, &raw)),
            );
            push(
                Field::Beds,
                ld_text(&ld, &["/numberOfBedrooms", "/numberOfRooms"])
                    .and_then(|raw| text_value(Field::Beds, &raw)),
            );
            push(
                Field::Baths,
                ld_text(&ld, &["/numberOfBathroomsTotal", "/numberOfFullBathrooms"])
                    .and_then(|raw| text_value(Field::Baths, &raw)),
            );
            push(
                Field::Sqft,
                ld_text(&ld, &["/floorSize/value", "/floorSize"])
                    .and_then(|raw| text_value(Field::Sqft, &raw)),
            );
            push(
                Field::YearBuilt,
                ld_text(&ld, &["/yearBuilt"]).and_then(|raw| text_value(Field::YearBuilt, &raw)),
            );
            push(Field::Images, ld_images(&ld).map(FieldValue::Images));
        }

        candidates
    }
}

/// twitter/og 地址标签拼接为 "街道, 城市, 州 邮编"
fn meta_address(doc: &ParsedDocument<'_>) -> Option<String> {
    let street = doc.meta_content(ADDRESS_TAGS)?;
    let mut parts = vec![street];
    if let Some(city) = doc.meta_content(LOCALITY_TAGS) {
        parts.push(city);
    }
    let region = [doc.meta_content(REGION_TAGS), doc.meta_content(POSTAL_TAGS)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !region.is_empty() {
        parts.push(region);
    }
    Some(parts.join(", "))
}

fn meta_images(doc: &ParsedDocument<'_>) -> Option<Vec<String>> {
    let urls: Vec<String> = IMAGE_TAGS
        .iter()
        .flat_map(|css| doc.select_all(css))
        .filter_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    (!urls.is_empty()).then_some(urls)
}

/// 类型像房源的 JSON-LD 节点（含 `@graph` 展开）
fn json_ld_listings(doc: &ParsedDocument<'_>) -> Vec<Value> {
    const LISTING_TYPES: &[&str] = &[
        "SingleFamilyResidence",
        "Residence",
        "House",
        "Apartment",
        "RealEstateListing",
        "Product",
        "Place",
    ];

    let mut nodes = Vec::new();
    for el in doc.select_all(r#"script[type="application/ld+json"]"#) {
        let text = el.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(text.trim()) else {
            continue;
        };
        flatten_ld(value, &mut nodes);
    }

    nodes
        .into_iter()
        .filter(|node| {
            let types: Vec<&str> = match node.get("@type") {
                Some(Value::String(t)) => vec![t.as_str()],
                Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            types.iter().any(|t| LISTING_TYPES.contains(t))
        })
        .collect()
}

fn flatten_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| flatten_ld(v, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_ld(graph, out);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

fn ld_text(node: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().filter_map(|p| node.pointer(p)).find_map(|v| match v {
        Value::String(s) => Some(collapse_whitespace(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn ld_address(node: &Value) -> Option<String> {
    let address = node.get("address")?;
    if let Some(s) = address.as_str() {
        return Some(collapse_whitespace(s)).filter(|s| !s.is_empty());
    }

    let street = ld_text(address, &["/streetAddress"])?;
    let region = [
        ld_text(address, &["/addressRegion"]),
        ld_text(address, &["/postalCode"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    let mut parts = vec![street];
    if let Some(city) = ld_text(address, &["/addressLocality"]) {
        parts.push(city);
    }
    if !region.is_empty() {
        parts.push(region);
    }
    Some(parts.join(", "))
}

fn ld_images(node: &Value) -> Option<Vec<String>> {
    let urls: Vec<String> = match node.get("image") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                other => other.get("url").and_then(Value::as_str).map(str::to_string),
            })
            .collect(),
        Some(obj @ Value::Object(_)) => obj
            .get("url")
            .and_then(Value::as_str)
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    (!urls.is_empty()).then_some(urls)
}
