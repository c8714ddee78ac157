//! 工單輸入資料（來自明細來源）
//!
//! 欄位名稱沿用文件庫的 camelCase 命名。數值欄位可能是數字、
//! 字串或空值，解析時採寬鬆轉換：無法轉換的值視為未提供。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::line_item::{PartLineItem, ServiceLineItem};
use crate::margin::{parse_decimal, MarginInput};

/// 單一工單讀取結果
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// 工單本身的設定欄位
    pub order: OrderSettings,

    #[serde(default)]
    pub services: Vec<ServiceRecord>,

    /// 零件/採購明細
    #[serde(default)]
    pub expenses: Vec<ExpenseRecord>,

    #[serde(default)]
    pub deposits: Vec<DepositRecord>,

    #[serde(default)]
    pub customer: CustomerRecord,

    #[serde(default)]
    pub vehicle: Option<VehicleRecord>,
}

impl OrderRecord {
    /// 由 JSON 文件解析
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 轉為工時服務明細
    pub fn service_items(&self) -> Vec<ServiceLineItem> {
        self.services.iter().map(ServiceRecord::to_line_item).collect()
    }

    /// 轉為零件明細
    pub fn part_items(&self) -> Vec<PartLineItem> {
        self.expenses.iter().map(ExpenseRecord::to_line_item).collect()
    }

    /// 指定類型的訂金合計（超出範圍時取上下限）
    pub fn deposits_of_kind(&self, kind: &str) -> Decimal {
        self.deposits
            .iter()
            .filter(|d| d.kind == kind)
            .fold(Decimal::ZERO, |acc, d| acc.saturating_add(d.amount))
    }
}

/// 工單設定欄位（全部可選）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSettings {
    /// 工單ID
    pub id: String,

    #[serde(default)]
    pub selected_service_ids: Option<Vec<String>>,

    #[serde(default)]
    pub selected_part_ids: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub labor_rate: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub shop_supplies_rate: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub waste_fee: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub discount: Option<Decimal>,

    #[serde(default)]
    pub tax_enabled: Option<bool>,
}

/// 工時服務紀錄
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRecord {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// 工時
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub time: Option<Decimal>,
}

impl ServiceRecord {
    pub fn to_line_item(&self) -> ServiceLineItem {
        ServiceLineItem {
            id: self.id.clone(),
            description: self.name.clone(),
            labor_hours: self.time.unwrap_or(Decimal::ONE),
        }
    }
}

/// 零件/採購紀錄
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseRecord {
    pub id: String,

    #[serde(default)]
    pub memo: String,

    /// 單位成本
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Option<Decimal>,

    #[serde(default, deserialize_with = "lenient_decimal")]
    pub quantity: Option<Decimal>,

    /// 原始毛利率值，保留原樣交由 [`MarginInput`] 判斷
    #[serde(default)]
    pub margin: Option<Value>,
}

impl ExpenseRecord {
    pub fn to_line_item(&self) -> PartLineItem {
        // 非整數數量取整數部分；未提供時為 1
        let quantity = self
            .quantity
            .map(|q| q.trunc().to_i64().unwrap_or(0))
            .unwrap_or(1);

        PartLineItem {
            id: self.id.clone(),
            description: self.memo.clone(),
            unit_cost: self.amount.unwrap_or(Decimal::ZERO).max(Decimal::ZERO),
            quantity,
            margin: MarginInput::from_stored(self.margin.as_ref()),
        }
    }
}

/// 訂金紀錄
#[derive(Debug, Clone, Deserialize)]
pub struct DepositRecord {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, deserialize_with = "lenient_decimal_or_zero")]
    pub amount: Decimal,
}

/// 客戶識別資料
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

/// 車輛識別資料
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    #[serde(default)]
    pub vin: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,

    #[serde(default)]
    pub make: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub stock_number: Option<String>,
}

fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_decimal))
}

fn lenient_decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_decimal(deserializer)?.unwrap_or(Decimal::ZERO))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "order": {
            "id": "RO-1001",
            "laborRate": "140",
            "shopSuppliesRate": 0.05,
            "wasteFee": "",
            "taxEnabled": false,
            "selectedPartIds": ["E1"]
        },
        "services": [
            { "id": "S1", "name": "Diagnose", "time": 1.5 },
            { "id": "S2", "name": "Alignment" }
        ],
        "expenses": [
            { "id": "E1", "memo": "Rotor", "amount": "60", "quantity": 2, "margin": 30 },
            { "id": "E2", "memo": "Shop rag", "amount": 4, "margin": "" }
        ],
        "deposits": [
            { "type": "service", "amount": 100 },
            { "type": "sale", "amount": 5000 },
            { "type": "service", "amount": "25.50" }
        ],
        "customer": { "id": "C-9", "name": "Pat Doe" },
        "vehicle": { "vin": "1HGCM82633A004352", "year": 2019, "make": "Honda" }
    }"#;

    #[test]
    fn test_decode_order_record() {
        let record = OrderRecord::from_json_str(SAMPLE).unwrap();

        assert_eq!(record.order.id, "RO-1001");
        assert_eq!(record.order.labor_rate, Some(Decimal::from(140)));
        assert_eq!(record.order.shop_supplies_rate, Some(Decimal::new(5, 2)));
        assert_eq!(record.order.waste_fee, None);
        assert_eq!(record.order.tax_enabled, Some(false));
        assert_eq!(record.order.selected_service_ids, None);
        assert_eq!(record.order.selected_part_ids, Some(vec!["E1".to_string()]));
        assert_eq!(record.vehicle.unwrap().year.as_deref(), Some("2019"));
    }

    #[test]
    fn test_line_item_conversion() {
        let record = OrderRecord::from_json_str(SAMPLE).unwrap();

        let services = record.service_items();
        assert_eq!(services[0].labor_hours, Decimal::new(15, 1));
        // 未提供工時預設為 1
        assert_eq!(services[1].labor_hours, Decimal::ONE);

        let parts = record.part_items();
        assert_eq!(parts[0].unit_cost, Decimal::from(60));
        assert_eq!(parts[0].quantity, 2);
        assert_eq!(parts[0].margin.value(), Some(Decimal::from(30)));
        // 未提供數量預設為 1，空白毛利率為無效
        assert_eq!(parts[1].quantity, 1);
        assert!(!parts[1].margin.is_valid());
    }

    #[test]
    fn test_service_deposits_only() {
        let record = OrderRecord::from_json_str(SAMPLE).unwrap();
        assert_eq!(record.deposits_of_kind("service"), Decimal::new(12550, 2));
    }

    #[test]
    fn test_deposit_sum_saturates() {
        let record = OrderRecord::from_json_str(
            r#"{
                "order": { "id": "RO-9" },
                "deposits": [
                    { "type": "service", "amount": "79228162514264337593543950335" },
                    { "type": "service", "amount": 10 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(record.deposits_of_kind("service"), Decimal::MAX);
    }

    #[test]
    fn test_missing_order_is_decode_error() {
        let err = OrderRecord::from_json_str("{}").unwrap_err();
        assert!(matches!(err, crate::InvoiceError::Decode(_)));
    }
}
