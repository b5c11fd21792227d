//! 数值解析
//!
//! 整数：去掉所有非数字字符；浮点：只保留第一个小数点。
//! 去掉后为空的一律返回 `None`，不会变成 0。

/// 1 英亩 = 43560 平方英尺
pub const SQFT_PER_ACRE: f64 = 43560.0;

/// 解析整数（"$450,000" → 450000）
pub fn parse_integer(text: &str) -> Option<i64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// 解析浮点数（"2.5 baths" → 2.5）
pub fn parse_float(text: &str) -> Option<f64> {
    let mut seen_point = false;
    let mut cleaned = String::new();

    for c in text.chars() {
        if c.is_ascii_digit() {
            cleaned.push(c);
        } else if c == '.' && !seen_point {
            seen_point = true;
            cleaned.push(c);
        }
    }

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

/// 占地面积统一为平方英尺
///
/// "X acres" → round(X × 43560)；其它按整数平方英尺解析。
pub fn normalize_lot_size(text: &str) -> Option<i64> {
    if text.to_ascii_lowercase().contains("acre") {
        let acres = parse_float(text)?;
        return Some((acres * SQFT_PER_ACRE).round() as i64);
    }
    parse_integer(text)
}

/// 数值 + 单位（结构化数据里常见的 lotAreaValue / lotAreaUnits）
pub fn lot_size_from_parts(value: f64, units: Option<&str>) -> Option<i64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    match units {
        Some(u) if u.to_ascii_lowercase().contains("acre") => {
            Some((value * SQFT_PER_ACRE).round() as i64)
        }
        _ => Some(value.round() as i64),
    }
}
