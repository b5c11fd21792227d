//! 结构化数据提取
//!
//! 对渲染后的页面依次运行一组提取策略，每个策略为各字段产出带来源标记的候选值。
//! 策略之间互不短路，字段之间互不影响；优先级只在合并阶段（`merge`）使用。
//!
//! 默认策略顺序：
//! 1. `EmbeddedStateStrategy` - 页面内嵌的结构化状态
//! 2. `TableStrategy` - 标签/值表格
//! 3. `HeuristicStrategy` - 相邻元素启发式
//! 4. `MetaStrategy` - 页面元数据

pub mod document;
pub mod embedded_state;
pub mod heuristic;
pub mod images;
pub mod meta;
pub mod numeric;
pub mod table;

use std::collections::BTreeMap;
use tracing::debug;

use crate::models::{Field, FieldValue, Provenance};
use crate::render::RenderedDocument;

pub use document::ParsedDocument;
pub use embedded_state::EmbeddedStateStrategy;
pub use heuristic::HeuristicStrategy;
pub use meta::MetaStrategy;
pub use table::TableStrategy;

/// 单个策略产出的候选值
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionCandidate {
    pub field: Field,
    pub value: FieldValue,
    pub provenance: Provenance,
}

impl ExtractionCandidate {
    pub fn new(field: Field, value: FieldValue, provenance: Provenance) -> Self {
        Self {
            field,
            value,
            provenance,
        }
    }
}

/// 字段 → 候选值列表
///
/// 始终包含全部字段，没有候选的字段对应空列表。
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    by_field: BTreeMap<Field, Vec<ExtractionCandidate>>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self {
            by_field: Field::ALL.iter().map(|f| (*f, Vec::new())).collect(),
        }
    }

    /// 追加候选值，空值直接丢弃
    pub fn push(&mut self, candidate: ExtractionCandidate) {
        if candidate.value.is_empty() {
            return;
        }
        self.by_field
            .entry(candidate.field)
            .or_default()
            .push(candidate);
    }

    pub fn get(&self, field: Field) -> &[ExtractionCandidate] {
        self.by_field.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.by_field.keys().copied()
    }

    pub fn total(&self) -> usize {
        self.by_field.values().map(Vec::len).sum()
    }
}

impl Default for CandidateSet {
    fn default() -> Self {
        Self::new()
    }
}

/// 提取策略
pub trait ExtractionStrategy: Send + Sync {
    /// 策略名（日志用）
    fn name(&self) -> &'static str;

    /// 本策略产出的候选值来源
    fn provenance(&self) -> Provenance;

    /// 从页面中提取候选值；找不到就返回空列表，不报错
    fn extract(&self, doc: &ParsedDocument<'_>) -> Vec<ExtractionCandidate>;
}

/// 一次提取的结果
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub candidates: CandidateSet,
    /// 页面标题，地址缺失时用于推断
    pub title: Option<String>,
}

/// 有序策略流水线
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    max_images: usize,
}

impl Extractor {
    /// 默认四个策略
    pub fn new(max_images: usize) -> Self {
        Self::with_strategies(
            vec![
                Box::new(EmbeddedStateStrategy),
                Box::new(TableStrategy),
                Box::new(HeuristicStrategy),
                Box::new(MetaStrategy),
            ],
            max_images,
        )
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>, max_images: usize) -> Self {
        Self {
            strategies,
            max_images,
        }
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    /// 运行全部策略
    pub fn extract(&self, rendered: &RenderedDocument) -> ExtractionOutput {
        let doc = ParsedDocument::parse(rendered);
        let mut set = CandidateSet::new();

        for strategy in &self.strategies {
            let candidates = strategy.extract(&doc);
            debug!(
                "策略 {} ({}) 产出 {} 个候选",
                strategy.name(),
                strategy.provenance(),
                candidates.len()
            );

            for mut candidate in candidates {
                if let FieldValue::Images(urls) = candidate.value {
                    candidate.value =
                        FieldValue::Images(images::normalize_urls(urls, self.max_images));
                }
                set.push(candidate);
            }
        }

        debug!("共 {} 个候选值", set.total());
        ExtractionOutput {
            candidates: set,
            title: doc.title(),
        }
    }
}

/// 压缩空白
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按字段类型把原始文本转换为候选值
pub(crate) fn text_value(field: Field, raw: &str) -> Option<FieldValue> {
    use crate::models::FieldKind;

    let raw = collapse_whitespace(raw);
    if raw.is_empty() {
        return None;
    }

    match field {
        Field::LotSizeSqft => numeric::normalize_lot_size(&raw).map(FieldValue::Integer),
        _ => match field.kind() {
            FieldKind::Integer => numeric::parse_integer(&raw).map(FieldValue::Integer),
            FieldKind::Float => numeric::parse_float(&raw).map(FieldValue::Float),
            FieldKind::Text => Some(FieldValue::Text(raw)),
            FieldKind::Images => Some(FieldValue::Images(vec![raw])),
        },
    }
}
