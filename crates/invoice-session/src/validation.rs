//! 毛利率與費率驗證
//!
//! 毛利率：原始輸入立即保存，只有有效值才寫入文件庫。
//! 費率：一律轉換為數值（無效時使用預設值）並立即寫入，不存在本地無效狀態。

use invoice_calc::InvoiceResult;
use invoice_core::{MarginInput, PartLineItem, RateField};
use rust_decimal::Decimal;

use crate::generation::GenerationError;

/// 毛利率編輯結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarginCheck {
    /// 有效，可寫入
    Valid(Decimal),

    /// 無效，僅保留在本地
    Invalid,
}

/// 驗證毛利率原始輸入
pub fn check_margin(raw: &str) -> (MarginInput, MarginCheck) {
    let input = MarginInput::parse(raw);
    let check = match input.value() {
        Some(value) => MarginCheck::Valid(value),
        None => MarginCheck::Invalid,
    };
    (input, check)
}

/// 轉換費率原始輸入
pub fn coerce_rate(field: RateField, raw: &str, default: Decimal) -> Decimal {
    let value = field.coerce(raw, default);
    tracing::debug!("費率輸入轉換：{} {:?} -> {}", field.store_key(), raw, value);
    value
}

/// 發票產生前置條件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationGate {
    /// 工單中任一零件毛利率無效
    pub invalid_margins: bool,

    /// 計算結果有金額溢位
    pub amount_overflow: bool,

    /// 已有產生請求進行中
    pub in_flight: bool,
}

impl GenerationGate {
    pub fn evaluate(parts: &[PartLineItem], result: &InvoiceResult, in_flight: bool) -> Self {
        Self {
            invalid_margins: invoice_calc::has_invalid_margins(parts),
            amount_overflow: result.has_errors(),
            in_flight,
        }
    }

    pub fn can_generate(&self) -> bool {
        self.check().is_ok()
    }

    /// 檢查前置條件，不符合時回傳拒絕原因
    pub fn check(&self) -> Result<(), GenerationError> {
        if self.invalid_margins {
            return Err(GenerationError::InvalidMargins);
        }
        if self.amount_overflow {
            return Err(GenerationError::AmountOverflow);
        }
        if self.in_flight {
            return Err(GenerationError::InFlight);
        }
        Ok(())
    }
}
