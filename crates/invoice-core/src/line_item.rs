//! 工單明細模型（工時服務與零件）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::margin::MarginInput;

/// 工時服務明細
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLineItem {
    /// 明細ID
    pub id: String,

    /// 服務說明
    pub description: String,

    /// 工時（未提供時為 1）
    pub labor_hours: Decimal,
}

impl ServiceLineItem {
    /// 創建新的服務明細，工時預設為 1
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            labor_hours: Decimal::ONE,
        }
    }

    /// 建構器模式：設置工時
    pub fn with_labor_hours(mut self, hours: Decimal) -> Self {
        self.labor_hours = hours;
        self
    }

    /// 工時費 = 工時 × 工時費率，超出 `Decimal` 範圍時為 None
    pub fn labor_charge(&self, labor_rate: Decimal) -> Option<Decimal> {
        self.labor_hours.checked_mul(labor_rate)
    }
}

/// 零件明細
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartLineItem {
    /// 明細ID
    pub id: String,

    /// 零件說明
    pub description: String,

    /// 單位成本
    pub unit_cost: Decimal,

    /// 數量
    pub quantity: i64,

    /// 毛利率（百分比）
    pub margin: MarginInput,
}

impl PartLineItem {
    /// 創建新的零件明細，毛利率初始為空（無效）
    pub fn new(id: impl Into<String>, description: impl Into<String>, unit_cost: Decimal) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            unit_cost,
            quantity: 1,
            margin: MarginInput::default(),
        }
    }

    /// 建構器模式：設置數量
    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    /// 建構器模式：設置已驗證的毛利率
    pub fn with_margin(mut self, margin: Decimal) -> Self {
        self.margin = MarginInput::committed(margin);
        self
    }

    /// 建構器模式：設置原始毛利率輸入
    pub fn with_margin_input(mut self, raw: impl Into<String>) -> Self {
        self.margin = MarginInput::parse(raw);
        self
    }

    /// 計價用數量，<= 0 視為 0
    pub fn billable_quantity(&self) -> Decimal {
        if self.quantity > 0 {
            Decimal::from(self.quantity)
        } else {
            Decimal::ZERO
        }
    }
}

/// 明細參照（用於說明欄位編輯）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum LineRef {
    Service(String),
    Part(String),
}

impl LineRef {
    pub fn id(&self) -> &str {
        match self {
            LineRef::Service(id) | LineRef::Part(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_defaults_to_one_hour() {
        let service = ServiceLineItem::new("S1", "Oil change");
        assert_eq!(service.labor_hours, Decimal::ONE);
        assert_eq!(service.labor_charge(Decimal::from(150)), Some(Decimal::from(150)));
    }

    #[test]
    fn test_labor_charge_overflow_is_none() {
        let service = ServiceLineItem::new("S1", "Oil change").with_labor_hours(Decimal::MAX);
        assert_eq!(service.labor_charge(Decimal::from(2)), None);
    }

    #[test]
    fn test_part_builder() {
        let part = PartLineItem::new("P1", "Brake pads", Decimal::from(80))
            .with_quantity(4)
            .with_margin(Decimal::from(20));

        assert_eq!(part.quantity, 4);
        assert_eq!(part.margin.value(), Some(Decimal::from(20)));
        assert_eq!(part.billable_quantity(), Decimal::from(4));
    }

    #[test]
    fn test_non_positive_quantity_is_not_billable() {
        let zero = PartLineItem::new("P2", "Filter", Decimal::from(10)).with_quantity(0);
        let negative = PartLineItem::new("P3", "Filter", Decimal::from(10)).with_quantity(-3);

        assert_eq!(zero.billable_quantity(), Decimal::ZERO);
        assert_eq!(negative.billable_quantity(), Decimal::ZERO);
    }

    #[test]
    fn test_new_part_has_invalid_margin() {
        let part = PartLineItem::new("P4", "Wiper", Decimal::from(15));
        assert!(!part.margin.is_valid());
    }
}
