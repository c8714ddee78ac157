//! 發票主計算器

use invoice_core::{InvoiceSummary, PartLineItem, PricingConfig, ServiceLineItem};
use rust_decimal::Decimal;

use crate::charges::{PartCharge, ServiceCharge};
use crate::{CalcWarning, InvoiceResult};

/// 發票計算器
///
/// 純函式：相同輸入永遠得到相同結果，不做 I/O。
/// 任何參數變動都必須重新完整計算，不支援增量更新。
pub struct InvoiceCalculator {
    /// 計價參數
    config: PricingConfig,
}

impl InvoiceCalculator {
    /// 創建新的發票計算器
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// 主計算入口
    ///
    /// # 參數
    /// * `services` - 已選取的工時明細
    /// * `parts` - 已選取的零件明細
    /// * `payments_to_date` - 已付款項（服務類訂金合計）
    pub fn calculate<'a, S, P>(
        &self,
        services: S,
        parts: P,
        payments_to_date: Decimal,
    ) -> InvoiceResult
    where
        S: IntoIterator<Item = &'a ServiceLineItem>,
        P: IntoIterator<Item = &'a PartLineItem>,
    {
        let config = &self.config;
        let mut result = InvoiceResult::default();

        // Step 1: 工時小計
        let mut service_charges = Vec::new();
        for service in services {
            let charge = ServiceCharge::resolve(service, config.labor_rate).unwrap_or_else(|| {
                result.add_warning(overflow_error(&service.id, "工時金額"));
                ServiceCharge::unpriced(service, config.labor_rate)
            });
            service_charges.push(charge);
        }
        let service_total = settle(
            checked_sum(service_charges.iter().map(|c| c.amount)),
            "工時小計",
            &mut result,
        );

        // Step 2: 零件小計
        let mut part_charges = Vec::new();
        for part in parts {
            if !part.margin.is_valid() {
                result.add_warning(CalcWarning::warning(
                    part.id.clone(),
                    format!("零件毛利率無效（輸入: {:?}），以 0 計價", part.margin.raw()),
                ));
            }
            if part.quantity <= 0 {
                result.add_warning(CalcWarning::info(
                    part.id.clone(),
                    format!("零件數量 {} 不大於 0，以 0 計價", part.quantity),
                ));
            }
            let charge = PartCharge::resolve(part).unwrap_or_else(|| {
                result.add_warning(overflow_error(&part.id, "零件金額"));
                PartCharge::unpriced(part)
            });
            part_charges.push(charge);
        }
        let parts_total = settle(
            checked_sum(part_charges.iter().map(|c| c.amount)),
            "零件小計",
            &mut result,
        );

        // Step 3: 小計與費用
        let subtotal = settle(service_total.checked_add(parts_total), "小計", &mut result);
        let shop_supplies_fee = settle(
            subtotal.checked_mul(config.shop_supplies_rate),
            "耗材費",
            &mut result,
        );
        let adjusted_subtotal = settle(
            subtotal
                .checked_add(shop_supplies_fee)
                .and_then(|v| v.checked_add(config.waste_fee))
                .and_then(|v| v.checked_sub(config.discount)),
            "調整後小計",
            &mut result,
        );

        // Step 4: 稅額（僅在啟用且有選取零件時課稅）
        let apply_tax = config.tax_enabled && !part_charges.is_empty();
        let tax_rate = if apply_tax {
            config.tax_rate
        } else {
            Decimal::ZERO
        };
        result.effective_tax_rate = tax_rate;
        let tax = settle(adjusted_subtotal.checked_mul(tax_rate), "稅額", &mut result);

        // Step 5: 總額與餘額（餘額不設下限）
        let total = settle(adjusted_subtotal.checked_add(tax), "總額", &mut result);
        let balance_due = settle(total.checked_sub(payments_to_date), "應付餘額", &mut result);

        result.service_charges = service_charges;
        result.part_charges = part_charges;
        result.summary = InvoiceSummary {
            service_total,
            parts_total,
            subtotal,
            shop_supplies_fee,
            adjusted_subtotal,
            tax,
            total,
            payments_to_date,
            balance_due,
        };

        tracing::debug!(
            "發票重算完成：工時 {} 零件 {} 小計 {} 稅額 {} 總額 {} 餘額 {}",
            service_total,
            parts_total,
            subtotal,
            tax,
            total,
            balance_due
        );

        result
    }

    /// 獲取計價參數引用
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }
}

fn checked_sum<I>(amounts: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
}

fn overflow_error(line_id: &str, label: &str) -> CalcWarning {
    CalcWarning::error(line_id.to_string(), format!("{}超出可計算範圍，以 0 計", label))
}

/// 工單層級金額：溢位時記錄錯誤並以 0 計
fn settle(amount: Option<Decimal>, label: &str, result: &mut InvoiceResult) -> Decimal {
    amount.unwrap_or_else(|| {
        result.add_warning(overflow_error("", label));
        Decimal::ZERO
    })
}
