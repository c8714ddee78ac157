//! 發票金額摘要（計算結果，不持久化）

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// 顯示用小數位數
pub const DISPLAY_SCALE: u32 = 2;

/// 發票金額摘要
///
/// 每次重算都由選取明細與計價參數完整推導，計算過程中不做四捨五入。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummary {
    /// 工時小計
    pub service_total: Decimal,

    /// 零件小計
    pub parts_total: Decimal,

    /// 小計 = 工時 + 零件
    pub subtotal: Decimal,

    /// 耗材費（由小計即時推導）
    pub shop_supplies_fee: Decimal,

    /// 調整後小計 = 小計 + 耗材費 + 廢料處理費 - 折扣
    pub adjusted_subtotal: Decimal,

    pub tax: Decimal,

    pub total: Decimal,

    /// 已付款項（服務類訂金）
    pub payments_to_date: Decimal,

    /// 應付餘額，可為負數（溢付）
    pub balance_due: Decimal,
}

impl InvoiceSummary {
    /// 顯示用：所有金額四捨五入至兩位小數
    pub fn rounded(&self) -> Self {
        Self {
            service_total: round_money(self.service_total),
            parts_total: round_money(self.parts_total),
            subtotal: round_money(self.subtotal),
            shop_supplies_fee: round_money(self.shop_supplies_fee),
            adjusted_subtotal: round_money(self.adjusted_subtotal),
            tax: round_money(self.tax),
            total: round_money(self.total),
            payments_to_date: round_money(self.payments_to_date),
            balance_due: round_money(self.balance_due),
        }
    }

    /// 是否溢付
    pub fn is_overpaid(&self) -> bool {
        self.balance_due < Decimal::ZERO
    }
}

/// 金額四捨五入（中間值遠離零）
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
