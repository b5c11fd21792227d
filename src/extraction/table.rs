//! 标签/值表格提取
//!
//! 收集页面上所有"标签 → 值"行（`<tr>`、`<dt>/<dd>`、`<li>标签: 值</li>`），
//! 标签按同义词做大小写不敏感的子串匹配。每个字段取第一个可用的匹配行。

use scraper::ElementRef;

use super::document::element_text;
use super::{text_value, ExtractionCandidate, ExtractionStrategy, ParsedDocument};
use crate::models::{Field, Provenance};

/// 字段同义词（小写）
const SYNONYMS: &[(Field, &[&str])] = &[
    (Field::YearBuilt, &["year built", "built in", "yr built"]),
    (Field::LotSizeSqft, &["lot size", "lot area", "lot sq"]),
    (
        Field::HomeType,
        &["property type", "home type", "building type", "style"],
    ),
    (
        Field::PricePerSqft,
        &["price/sqft", "price/sq", "price per sq", "$/sqft", "$/sq"],
    ),
    (Field::Parking, &["parking", "garage"]),
    (Field::HoaFee, &["hoa dues", "hoa fee", "hoa"]),
];

pub struct TableStrategy;

impl ExtractionStrategy for TableStrategy {
    fn name(&self) -> &'static str {
        "table"
    }

    fn provenance(&self) -> Provenance {
        Provenance::Table
    }

    fn extract(&self, doc: &ParsedDocument<'_>) -> Vec<ExtractionCandidate> {
        let rows = collect_rows(doc);

        SYNONYMS
            .iter()
            .filter_map(|(field, synonyms)| {
                rows.iter()
                    .filter(|(label, _)| matches_label(label, synonyms))
                    .find_map(|(_, value)| text_value(*field, value))
                    .map(|value| ExtractionCandidate::new(*field, value, Provenance::Table))
            })
            .collect()
    }
}

fn matches_label(label: &str, synonyms: &[&str]) -> bool {
    let label = label.to_lowercase();
    synonyms.iter().any(|s| label.contains(s))
}

/// 按文档顺序收集 (标签, 值)
fn collect_rows(doc: &ParsedDocument<'_>) -> Vec<(String, String)> {
    let mut rows = Vec::new();

    for tr in doc.select_all("tr") {
        let cells: Vec<String> = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| matches!(el.value().name(), "th" | "td"))
            .map(|el| element_text(&el))
            .collect();
        if let [label, value, ..] = cells.as_slice() {
            rows.push((label.trim_end_matches(':').to_string(), value.clone()));
        }
    }

    for dt in doc.select_all("dt") {
        let dd = dt
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .filter(|el| el.value().name() == "dd");
        if let Some(dd) = dd {
            let label = element_text(&dt);
            rows.push((label.trim_end_matches(':').to_string(), element_text(&dd)));
        }
    }

    for li in doc.select_all("li") {
        let text = element_text(&li);
        if let Some((label, value)) = text.split_once(':') {
            let (label, value) = (label.trim(), value.trim());
            if !label.is_empty() && !value.is_empty() && label.len() <= 40 {
                rows.push((label.to_string(), value.to_string()));
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use crate::render::RenderedDocument;

    fn extract(html: &str) -> Vec<ExtractionCandidate> {
        let rendered = RenderedDocument::new("https://www.redfin.com/x", html);
        TableStrategy.extract(&ParsedDocument::parse(&rendered))
    }

    fn value_of(cands: &[ExtractionCandidate], field: Field) -> Option<FieldValue> {
        cands.iter().find(|c| c.field == field).map(|c| c.value.clone())
    }

    #[test]
    fn test_table_rows() {
        let cands = extract(
            r#"<table>
                <tr><th>Year Built</th><td>1985</td></tr>
                <tr><th>Lot Size</th><td>0.5 acres</td></tr>
                <tr><th>Property Type</th><td>Single Family Residential</td></tr>
                <tr><th>Price/Sq.Ft.</th><td>$250</td></tr>
                <tr><th>Parking</th><td>2 Car Garage</td></tr>
            </table>"#,
        );

        assert_eq!(value_of(&cands, Field::YearBuilt), Some(FieldValue::Integer(1985)));
        assert_eq!(value_of(&cands, Field::LotSizeSqft), Some(FieldValue::Integer(21780)));
        assert_eq!(
            value_of(&cands, Field::HomeType),
            Some(FieldValue::Text("Single Family Residential".to_string()))
        );
        assert_eq!(value_of(&cands, Field::PricePerSqft), Some(FieldValue::Integer(250)));
        assert_eq!(
            value_of(&cands, Field::Parking),
            Some(FieldValue::Text("2 Car Garage".to_string()))
        );
        assert!(cands.iter().all(|c| c.provenance == Provenance::Table));
    }

    #[test]
    fn test_definition_lists_and_list_items() {
        let cands = extract(
            r#"<dl><dt>Home type:</dt><dd>Condo</dd></dl>
               <ul><li>Year built: 2001</li><li>HOA: $350/mo</li></ul>"#,
        );

        assert_eq!(
            value_of(&cands, Field::HomeType),
            Some(FieldValue::Text("Condo".to_string()))
        );
        assert_eq!(value_of(&cands, Field::YearBuilt), Some(FieldValue::Integer(2001)));
        assert_eq!(value_of(&cands, Field::HoaFee), Some(FieldValue::Integer(350)));
    }

    #[test]
    fn test_first_usable_row_wins() {
        let cands = extract(
            r#"<table>
                <tr><td>Year Built</td><td>—</td></tr>
                <tr><td>Year Built</td><td>1990</td></tr>
                <tr><td>Year built (renovated)</td><td>2015</td></tr>
            </table>"#,
        );
        assert_eq!(value_of(&cands, Field::YearBuilt), Some(FieldValue::Integer(1990)));
    }

    #[test]
    fn test_no_rows() {
        assert!(extract("<p>Nothing here</p>").is_empty());
    }
}
