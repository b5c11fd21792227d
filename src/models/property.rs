//! 房源记录
//!
//! 合并后的规范化房源属性，每个字段都带有来源标记（provenance）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 字段来源
///
/// 优先级：`EmbeddedState` > `Table` > `Heuristic` > `Meta`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// 页面内嵌的结构化状态
    EmbeddedState,
    /// 标签/值表格
    Table,
    /// 相邻元素启发式
    Heuristic,
    /// 页面元数据
    Meta,
}

impl Provenance {
    /// 合并优先级，数值越大越优先
    pub fn rank(self) -> u8 {
        match self {
            Provenance::EmbeddedState => 4,
            Provenance::Table => 3,
            Provenance::Heuristic => 2,
            Provenance::Meta => 1,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provenance::EmbeddedState => "embedded_state",
            Provenance::Table => "table",
            Provenance::Heuristic => "heuristic",
            Provenance::Meta => "meta",
        };
        f.write_str(name)
    }
}

/// 可提取的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Address,
    Price,
    Beds,
    Baths,
    Sqft,
    YearBuilt,
    LotSizeSqft,
    HomeType,
    Description,
    Images,
    PricePerSqft,
    Parking,
    HoaFee,
}

/// 字段值的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Images,
}

impl Field {
    /// 全部字段（提取结果必须覆盖这些字段）
    pub const ALL: [Field; 13] = [
        Field::Address,
        Field::Price,
        Field::Beds,
        Field::Baths,
        Field::Sqft,
        Field::YearBuilt,
        Field::LotSizeSqft,
        Field::HomeType,
        Field::Description,
        Field::Images,
        Field::PricePerSqft,
        Field::Parking,
        Field::HoaFee,
    ];

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Address | Field::HomeType | Field::Description | Field::Parking => {
                FieldKind::Text
            }
            Field::Price
            | Field::Sqft
            | Field::YearBuilt
            | Field::LotSizeSqft
            | Field::PricePerSqft
            | Field::HoaFee => FieldKind::Integer,
            Field::Beds | Field::Baths => FieldKind::Float,
            Field::Images => FieldKind::Images,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Address => "address",
            Field::Price => "price",
            Field::Beds => "beds",
            Field::Baths => "baths",
            Field::Sqft => "sqft",
            Field::YearBuilt => "yearBuilt",
            Field::LotSizeSqft => "lotSizeSqft",
            Field::HomeType => "homeType",
            Field::Description => "description",
            Field::Images => "images",
            Field::PricePerSqft => "pricePerSqft",
            Field::Parking => "parking",
            Field::HoaFee => "hoaFee",
        };
        f.write_str(name)
    }
}

/// 单个候选值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Images(Vec<String>),
}

impl FieldValue {
    /// 空字符串、空图片列表视为没有值
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Images(v) => v.is_empty(),
            FieldValue::Float(f) => !f.is_finite(),
            FieldValue::Integer(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// 规范化的房源记录
///
/// `address` 与 `price` 是必填字段，其余字段缺失时保持 `null`，
/// 绝不使用占位值填充。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    pub address: String,
    /// 整数货币单位
    pub price: i64,
    pub beds: Option<f64>,
    pub baths: Option<f64>,
    pub sqft: Option<i64>,
    pub year_built: Option<i64>,
    pub lot_size_sqft: Option<i64>,
    pub home_type: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub price_per_sqft: Option<i64>,
    pub parking: Option<String>,
    /// 每月 HOA 费用
    pub hoa_fee: Option<i64>,
    /// 来源站点（如 "zillow"）
    pub source: Option<String>,
    pub source_url: String,
    pub provenance: BTreeMap<Field, Provenance>,
    pub extracted_at: DateTime<Utc>,
}

impl PropertyRecord {
    /// 某字段的来源
    pub fn provenance_of(&self, field: Field) -> Option<Provenance> {
        self.provenance.get(&field).copied()
    }
}
