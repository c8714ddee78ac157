//! 計價參數配置

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::margin::parse_decimal;
use crate::order::{CustomerRecord, OrderSettings};

/// 系統預設計價常數
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PricingDefaults {
    /// 工時費率（每小時）
    pub labor_rate: Decimal,

    /// 耗材費率（小計的比例，例如 0.03）
    pub shop_supplies_rate: Decimal,

    /// 廢料處理費（每張工單固定）
    pub waste_fee: Decimal,

    /// 折扣（固定金額）
    pub discount: Decimal,

    /// 是否課稅
    pub tax_enabled: bool,

    /// 稅率（小數，例如 0.06）
    pub tax_rate: Decimal,

    /// 計入已付款項的訂金類型
    pub deposit_kind: String,

    /// 免費率客戶ID
    ///
    /// 此客戶的工時費率、耗材費率、廢料處理費與稅率預設為 0
    pub exempt_customer_id: Option<String>,
}

impl Default for PricingDefaults {
    fn default() -> Self {
        Self {
            labor_rate: Decimal::from(150),
            shop_supplies_rate: Decimal::new(3, 2),
            waste_fee: Decimal::from(50),
            discount: Decimal::ZERO,
            tax_enabled: true,
            tax_rate: Decimal::new(6, 2),
            deposit_kind: "service".to_string(),
            exempt_customer_id: None,
        }
    }
}

impl PricingDefaults {
    /// 由 JSON 設定檔載入，未列出的欄位使用內建預設值
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 建構器模式：設置工時費率
    pub fn with_labor_rate(mut self, rate: Decimal) -> Self {
        self.labor_rate = rate;
        self
    }

    /// 建構器模式：設置耗材費率
    pub fn with_shop_supplies_rate(mut self, rate: Decimal) -> Self {
        self.shop_supplies_rate = rate;
        self
    }

    /// 建構器模式：設置廢料處理費
    pub fn with_waste_fee(mut self, fee: Decimal) -> Self {
        self.waste_fee = fee;
        self
    }

    /// 建構器模式：設置稅率
    pub fn with_tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = rate;
        self
    }

    /// 建構器模式：設置免費率客戶
    pub fn with_exempt_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.exempt_customer_id = Some(customer_id.into());
        self
    }

    /// 檢查客戶是否屬於免費率類別
    pub fn is_exempt(&self, customer: &CustomerRecord) -> bool {
        self.exempt_customer_id
            .as_deref()
            .is_some_and(|id| !customer.id.is_empty() && id == customer.id)
    }

    /// 套用免費率後的預設值
    fn for_customer(&self, customer: &CustomerRecord) -> Self {
        if !self.is_exempt(customer) {
            return self.clone();
        }

        Self {
            labor_rate: Decimal::ZERO,
            shop_supplies_rate: Decimal::ZERO,
            waste_fee: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            ..self.clone()
        }
    }
}

/// 單一工單的計價參數
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    pub labor_rate: Decimal,
    pub shop_supplies_rate: Decimal,
    pub waste_fee: Decimal,
    pub discount: Decimal,
    pub tax_enabled: bool,

    /// 稅率不存於工單，僅由系統常數與客戶類別決定
    pub tax_rate: Decimal,
}

impl PricingConfig {
    /// 合併工單已存值與系統預設
    ///
    /// 工單有存值時優先使用；否則使用（依客戶類別調整後的）預設值。
    pub fn resolve(
        settings: &OrderSettings,
        customer: &CustomerRecord,
        defaults: &PricingDefaults,
    ) -> Self {
        let base = defaults.for_customer(customer);

        Self {
            labor_rate: settings
                .labor_rate
                .filter(|r| *r >= Decimal::ZERO)
                .unwrap_or(base.labor_rate),
            shop_supplies_rate: settings
                .shop_supplies_rate
                .filter(|r| *r >= Decimal::ZERO)
                .unwrap_or(base.shop_supplies_rate),
            waste_fee: settings.waste_fee.unwrap_or(base.waste_fee),
            discount: settings.discount.unwrap_or(base.discount),
            tax_enabled: settings.tax_enabled.unwrap_or(base.tax_enabled),
            tax_rate: base.tax_rate,
        }
    }

    /// 讀取單一費率欄位
    pub fn rate(&self, field: RateField) -> Decimal {
        match field {
            RateField::LaborRate => self.labor_rate,
            RateField::ShopSuppliesRate => self.shop_supplies_rate,
            RateField::WasteFee => self.waste_fee,
            RateField::Discount => self.discount,
            RateField::TaxEnabled => bool_to_decimal(self.tax_enabled),
        }
    }

    /// 寫入單一費率欄位（已轉換的值）
    pub fn set_rate(&mut self, field: RateField, value: Decimal) {
        match field {
            RateField::LaborRate => self.labor_rate = value,
            RateField::ShopSuppliesRate => self.shop_supplies_rate = value,
            RateField::WasteFee => self.waste_fee = value,
            RateField::Discount => self.discount = value,
            RateField::TaxEnabled => self.tax_enabled = !value.is_zero(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self::resolve(
            &OrderSettings::default(),
            &CustomerRecord::default(),
            &PricingDefaults::default(),
        )
    }
}

/// 可由使用者調整的工單費率欄位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RateField {
    LaborRate,
    ShopSuppliesRate,
    WasteFee,
    Discount,
    TaxEnabled,
}

impl RateField {
    /// 文件庫欄位名稱
    pub fn store_key(&self) -> &'static str {
        match self {
            RateField::LaborRate => "laborRate",
            RateField::ShopSuppliesRate => "shopSuppliesRate",
            RateField::WasteFee => "wasteFee",
            RateField::Discount => "discount",
            RateField::TaxEnabled => "taxEnabled",
        }
    }

    /// 工時費率與耗材費率不得為負
    fn requires_non_negative(&self) -> bool {
        matches!(self, RateField::LaborRate | RateField::ShopSuppliesRate)
    }

    /// 將原始輸入轉為欄位值，無效時回傳 `default`
    ///
    /// `TaxEnabled` 接受 true/false、yes/no、1/0 以及任意數值（非 0 為 true）。
    pub fn coerce(&self, raw: &str, default: Decimal) -> Decimal {
        if *self == RateField::TaxEnabled {
            return match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => Decimal::ONE,
                "false" | "no" | "off" => Decimal::ZERO,
                other => parse_decimal(other)
                    .map(|v| bool_to_decimal(!v.is_zero()))
                    .unwrap_or_else(|| bool_to_decimal(!default.is_zero())),
            };
        }

        match parse_decimal(raw) {
            Some(v) if self.requires_non_negative() && v < Decimal::ZERO => default,
            Some(v) => v,
            None => default,
        }
    }
}

fn bool_to_decimal(value: bool) -> Decimal {
    if value {
        Decimal::ONE
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn customer(id: &str) -> CustomerRecord {
        CustomerRecord {
            id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_uses_defaults() {
        let config = PricingConfig::default();

        assert_eq!(config.labor_rate, Decimal::from(150));
        assert_eq!(config.shop_supplies_rate, Decimal::new(3, 2));
        assert_eq!(config.waste_fee, Decimal::from(50));
        assert_eq!(config.discount, Decimal::ZERO);
        assert!(config.tax_enabled);
        assert_eq!(config.tax_rate, Decimal::new(6, 2));
    }

    #[test]
    fn test_resolve_prefers_stored_values() {
        let settings = OrderSettings {
            labor_rate: Some(Decimal::from(120)),
            discount: Some(Decimal::from(25)),
            tax_enabled: Some(false),
            ..Default::default()
        };

        let config = PricingConfig::resolve(&settings, &customer("C-1"), &PricingDefaults::default());

        assert_eq!(config.labor_rate, Decimal::from(120));
        assert_eq!(config.discount, Decimal::from(25));
        assert!(!config.tax_enabled);
        assert_eq!(config.waste_fee, Decimal::from(50));
    }

    #[test]
    fn test_exempt_customer_zeroes_rates() {
        let defaults = PricingDefaults::default().with_exempt_customer_id("HOUSE");
        let config = PricingConfig::resolve(&OrderSettings::default(), &customer("HOUSE"), &defaults);

        assert_eq!(config.labor_rate, Decimal::ZERO);
        assert_eq!(config.shop_supplies_rate, Decimal::ZERO);
        assert_eq!(config.waste_fee, Decimal::ZERO);
        assert_eq!(config.tax_rate, Decimal::ZERO);

        // 非免費率客戶不受影響
        let regular = PricingConfig::resolve(&OrderSettings::default(), &customer("C-2"), &defaults);
        assert_eq!(regular.labor_rate, Decimal::from(150));
    }

    #[test]
    fn test_empty_customer_id_is_never_exempt() {
        let defaults = PricingDefaults {
            exempt_customer_id: Some(String::new()),
            ..Default::default()
        };
        assert!(!defaults.is_exempt(&customer("")));
    }

    #[test]
    fn test_defaults_from_json() {
        let defaults =
            PricingDefaults::from_json_str(r#"{ "laborRate": "165", "exemptCustomerId": "HOUSE" }"#)
                .unwrap();

        assert_eq!(defaults.labor_rate, Decimal::from(165));
        assert_eq!(defaults.exempt_customer_id.as_deref(), Some("HOUSE"));
        assert_eq!(defaults.waste_fee, Decimal::from(50));
    }

    #[rstest]
    #[case(RateField::LaborRate, "175", Decimal::from(175))]
    #[case(RateField::LaborRate, "-10", Decimal::from(150))]
    #[case(RateField::LaborRate, "abc", Decimal::from(150))]
    #[case(RateField::Discount, "", Decimal::from(150))]
    #[case(RateField::Discount, "-10", Decimal::from(-10))]
    #[case(RateField::ShopSuppliesRate, "0.05", Decimal::new(5, 2))]
    fn test_coerce_numeric(#[case] field: RateField, #[case] raw: &str, #[case] expected: Decimal) {
        assert_eq!(field.coerce(raw, Decimal::from(150)), expected);
    }

    #[rstest]
    #[case("true", Decimal::ZERO, true)]
    #[case("false", Decimal::ONE, false)]
    #[case("1", Decimal::ZERO, true)]
    #[case("0", Decimal::ONE, false)]
    #[case("maybe", Decimal::ONE, true)]
    #[case("maybe", Decimal::ZERO, false)]
    fn test_coerce_tax_enabled(#[case] raw: &str, #[case] default: Decimal, #[case] expected: bool) {
        let mut config = PricingConfig::default();
        let value = RateField::TaxEnabled.coerce(raw, default);
        config.set_rate(RateField::TaxEnabled, value);
        assert_eq!(config.tax_enabled, expected);
    }
}
