//! 零件毛利率輸入模型
//!
//! 編輯中的原始字串與驗證後的數值分開保存：
//! - `raw`：使用者目前輸入的文字，允許 "12." 這類中途狀態
//! - `committed`：僅在 `raw` 可轉為 >= 0 的數值時存在

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// 毛利率輸入
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarginInput {
    raw: String,
    committed: Option<Decimal>,
}

impl MarginInput {
    /// 由原始輸入建立，立即驗證
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let committed = parse_non_negative(&raw);
        Self { raw, committed }
    }

    /// 由已驗證數值建立
    pub fn committed(value: Decimal) -> Self {
        Self {
            raw: value.normalize().to_string(),
            committed: (value >= Decimal::ZERO).then_some(value),
        }
    }

    /// 由文件庫中存放的值建立
    ///
    /// 文件庫可能存數字、數字字串、空字串或 null；
    /// 空值、null 與非數值一律視為無效。
    pub fn from_stored(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::default(),
            Some(Value::String(s)) => Self::parse(s.as_str()),
            Some(Value::Number(n)) => Self::parse(n.to_string()),
            Some(other) => Self {
                raw: other.to_string(),
                committed: None,
            },
        }
    }

    /// 使用者輸入的原始文字
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// 驗證後的毛利率（百分比）
    pub fn value(&self) -> Option<Decimal> {
        self.committed
    }

    pub fn is_valid(&self) -> bool {
        self.committed.is_some()
    }
}

/// 將文字轉為 >= 0 的數值，失敗回傳 None
pub fn parse_non_negative(raw: &str) -> Option<Decimal> {
    parse_decimal(raw).filter(|v| *v >= Decimal::ZERO)
}

/// 將文字轉為數值（允許前後空白與科學記號），空字串為 None
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("25", Some(Decimal::from(25)))]
    #[case(" 12.5 ", Some(Decimal::new(125, 1)))]
    #[case("0", Some(Decimal::ZERO))]
    #[case("", None)]
    #[case("   ", None)]
    #[case("abc", None)]
    #[case("-5", None)]
    #[case("1e2", Some(Decimal::from(100)))]
    fn test_parse_margin(#[case] raw: &str, #[case] expected: Option<Decimal>) {
        let input = MarginInput::parse(raw);
        assert_eq!(input.value(), expected);
        assert_eq!(input.raw(), raw);
        assert_eq!(input.is_valid(), expected.is_some());
    }

    #[test]
    fn test_from_stored_values() {
        assert!(!MarginInput::from_stored(None).is_valid());
        assert!(!MarginInput::from_stored(Some(&Value::Null)).is_valid());
        assert!(!MarginInput::from_stored(Some(&Value::String(String::new()))).is_valid());
        assert!(!MarginInput::from_stored(Some(&Value::Bool(true))).is_valid());

        let numeric = MarginInput::from_stored(Some(&serde_json::json!(30)));
        assert_eq!(numeric.value(), Some(Decimal::from(30)));

        let text = MarginInput::from_stored(Some(&serde_json::json!("17.5")));
        assert_eq!(text.value(), Some(Decimal::new(175, 1)));
    }

    #[test]
    fn test_committed_negative_is_invalid() {
        assert!(!MarginInput::committed(Decimal::from(-1)).is_valid());
        assert_eq!(MarginInput::committed(Decimal::from(40)).raw(), "40");
    }
}
