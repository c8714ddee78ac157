//! 發票產生請求

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoice_calc::{InvoiceResult, PartCharge, ServiceCharge};
use invoice_core::{CustomerRecord, PricingConfig, VehicleRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// 發票產生錯誤
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("有零件毛利率無效，無法產生發票")]
    InvalidMargins,

    #[error("金額超出可計算範圍，無法產生發票")]
    AmountOverflow,

    #[error("此工單已有發票產生中")]
    InFlight,

    #[error("文件產生服務錯誤: {0}")]
    Service(String),
}

/// 文件產生服務回傳的文件參照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub url: String,
}

/// 已產生的發票文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub request_id: Uuid,
    pub url: String,
    pub generated_at: DateTime<Utc>,
}

/// 文件產生協作者
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<DocumentRef, GenerationError>;
}

/// 金額明細
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountBreakdown {
    pub service_total: Decimal,
    pub parts_total: Decimal,
    pub subtotal: Decimal,
    pub discount: Decimal,

    /// 實際套用的稅率（不課稅時為 0）
    pub tax_rate: Decimal,
    pub shop_supplies_fee: Decimal,
    pub waste_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payments_to_date: Decimal,
    pub balance_due: Decimal,
}

/// 送往文件產生服務的請求內容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub request_id: Uuid,
    pub order_id: String,
    pub customer: CustomerRecord,
    pub vehicle: Option<VehicleRecord>,
    pub services: Vec<ServiceCharge>,
    pub parts: Vec<PartCharge>,
    pub amounts: AmountBreakdown,
}

impl GenerationRequest {
    /// 由最新計算結果組裝請求
    pub fn assemble(
        order_id: &str,
        customer: &CustomerRecord,
        vehicle: Option<&VehicleRecord>,
        config: &PricingConfig,
        result: &InvoiceResult,
    ) -> Self {
        let summary = &result.summary;

        Self {
            request_id: Uuid::new_v4(),
            order_id: order_id.to_string(),
            customer: customer.clone(),
            vehicle: vehicle.cloned(),
            services: result.service_charges.clone(),
            parts: result.part_charges.clone(),
            amounts: AmountBreakdown {
                service_total: summary.service_total,
                parts_total: summary.parts_total,
                subtotal: summary.subtotal,
                discount: config.discount,
                tax_rate: result.effective_tax_rate,
                shop_supplies_fee: summary.shop_supplies_fee,
                waste_fee: config.waste_fee,
                tax: summary.tax,
                total: summary.total,
                payments_to_date: summary.payments_to_date,
                balance_due: summary.balance_due,
            },
        }
    }
}

/// 進行中旗標的 RAII 守衛，離開作用域時清除旗標
pub(crate) struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    /// 嘗試取得旗標，已被佔用時回傳 None
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoice_calc::InvoiceCalculator;
    use invoice_core::{PartLineItem, ServiceLineItem};

    #[test]
    fn test_in_flight_guard_is_exclusive() {
        let flag = AtomicBool::new(false);

        let guard = InFlightGuard::acquire(&flag);
        assert!(guard.is_some());
        assert!(InFlightGuard::acquire(&flag).is_none());

        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(InFlightGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_assemble_request() {
        let config = PricingConfig::default();
        let services = vec![ServiceLineItem::new("S1", "Diagnose")];
        let parts = vec![PartLineItem::new("P1", "Sensor", Decimal::from(200))
            .with_margin(Decimal::from(10))];
        let result = InvoiceCalculator::new(config.clone()).calculate(&services, &parts, Decimal::from(100));

        let customer = CustomerRecord {
            id: "C-1".into(),
            name: Some("Pat Doe".into()),
            ..Default::default()
        };
        let request = GenerationRequest::assemble("RO-7", &customer, None, &config, &result);

        assert_eq!(request.order_id, "RO-7");
        assert_eq!(request.services[0].amount, Decimal::from(150));
        assert_eq!(request.parts[0].unit_price, Decimal::from(220));
        assert_eq!(request.amounts.subtotal, Decimal::from(370));
        assert_eq!(request.amounts.waste_fee, Decimal::from(50));
        assert_eq!(request.amounts.tax_rate, Decimal::new(6, 2));
        assert_eq!(request.amounts.payments_to_date, Decimal::from(100));

        let json = serde_json::to_value(&request).unwrap();
        assert!(json["amounts"].get("shopSuppliesFee").is_some());
        assert_eq!(json["customer"]["name"], "Pat Doe");
    }
}
