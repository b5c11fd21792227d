//! 相邻元素启发式
//!
//! 找到文本恰好等于某个标签（如 "Year Built"）的元素，读取其后一个兄弟元素的文本。

use scraper::ElementRef;

use super::document::element_text;
use super::{text_value, ExtractionCandidate, ExtractionStrategy, ParsedDocument};
use crate::models::{Field, Provenance};

/// 字段 → 标签（比较时忽略 ASCII 大小写）
const LABELS: &[(Field, &[&str])] = &[
    (Field::Price, &["Price", "List Price", "Listing Price"]),
    (Field::Beds, &["Beds", "Bedrooms", "bd"]),
    (Field::Baths, &["Baths", "Bathrooms", "ba"]),
    (Field::Sqft, &["Sq Ft", "Sq. Ft.", "sqft", "Square Feet", "Living Area"]),
    (Field::YearBuilt, &["Year Built", "Built"]),
    (Field::LotSizeSqft, &["Lot Size", "Lot"]),
    (Field::HomeType, &["Home Type", "Property Type", "Type"]),
    (Field::PricePerSqft, &["Price/Sq.Ft.", "Price/Sqft", "Price per Sq Ft"]),
    (Field::Parking, &["Parking"]),
    (Field::HoaFee, &["HOA", "HOA Dues", "HOA Fee"]),
];

pub struct HeuristicStrategy;

impl ExtractionStrategy for HeuristicStrategy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn provenance(&self) -> Provenance {
        Provenance::Heuristic
    }

    fn extract(&self, doc: &ParsedDocument<'_>) -> Vec<ExtractionCandidate> {
        let labelled: Vec<(String, ElementRef<'_>)> = doc
            .select_all("body *")
            .into_iter()
            .filter(|el| !matches!(el.value().name(), "script" | "style" | "noscript"))
            .map(|el| (element_text(&el), el))
            .filter(|(text, _)| !text.is_empty() && text.len() <= 40)
            .collect();

        LABELS
            .iter()
            .filter_map(|(field, labels)| {
                labelled
                    .iter()
                    .filter(|(text, _)| labels.iter().any(|l| l.eq_ignore_ascii_case(text)))
                    .find_map(|(_, el)| {
                        next_sibling_text(el).and_then(|raw| text_value(*field, &raw))
                    })
                    .map(|value| ExtractionCandidate::new(*field, value, Provenance::Heuristic))
            })
            .collect()
    }
}

fn next_sibling_text(el: &ElementRef<'_>) -> Option<String> {
    el.next_siblings()
        .find_map(ElementRef::wrap)
        .map(|sibling| element_text(&sibling))
        .filter(|text| !text.is_empty())
}
