//! 明細計價結果（套用毛利率與費率後的金額）

use invoice_core::{PartLineItem, ServiceLineItem};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::part_pricing::{compute_part_amount, compute_part_price};

/// 工時明細計價
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCharge {
    pub id: String,
    pub description: String,
    pub labor_hours: Decimal,
    pub labor_rate: Decimal,
    pub amount: Decimal,
}

impl ServiceCharge {
    /// 計算工時金額，溢位時回傳 None
    pub fn resolve(service: &ServiceLineItem, labor_rate: Decimal) -> Option<Self> {
        let amount = service.labor_charge(labor_rate)?;
        Some(Self {
            amount,
            ..Self::unpriced(service, labor_rate)
        })
    }

    /// 不計價（金額為 0）
    pub fn unpriced(service: &ServiceLineItem, labor_rate: Decimal) -> Self {
        Self {
            id: service.id.clone(),
            description: service.description.clone(),
            labor_hours: service.labor_hours,
            labor_rate,
            amount: Decimal::ZERO,
        }
    }
}

/// 零件明細計價
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartCharge {
    pub id: String,
    pub description: String,
    pub unit_cost: Decimal,

    /// 毛利率無效時為 None
    pub margin_percent: Option<Decimal>,

    /// 套用毛利率後的單價
    pub unit_price: Decimal,
    pub quantity: i64,
    pub amount: Decimal,
}

impl PartCharge {
    /// 計算零件單價與金額，溢位時回傳 None
    pub fn resolve(part: &PartLineItem) -> Option<Self> {
        Some(Self {
            unit_price: compute_part_price(part)?,
            amount: compute_part_amount(part)?,
            ..Self::unpriced(part)
        })
    }

    /// 不計價（單價與金額為 0）
    pub fn unpriced(part: &PartLineItem) -> Self {
        Self {
            id: part.id.clone(),
            description: part.description.clone(),
            unit_cost: part.unit_cost,
            margin_percent: part.margin.value(),
            unit_price: Decimal::ZERO,
            quantity: part.quantity,
            amount: Decimal::ZERO,
        }
    }
}
