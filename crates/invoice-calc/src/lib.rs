//! # Invoice Calculation Engine
//!
//! 維修工單發票計算引擎：由選取明細與計價參數完整推導金額摘要

pub mod calculator;
pub mod charges;
pub mod part_pricing;

// Re-export 主要類型
pub use calculator::InvoiceCalculator;
pub use charges::{PartCharge, ServiceCharge};
pub use part_pricing::{compute_part_price, has_invalid_margins};

use invoice_core::InvoiceSummary;
use rust_decimal::Decimal;

/// 發票計算結果
#[derive(Debug, Clone, Default)]
pub struct InvoiceResult {
    /// 金額摘要（未四捨五入）
    pub summary: InvoiceSummary,

    /// 選取工時明細的計價結果
    pub service_charges: Vec<ServiceCharge>,

    /// 選取零件明細的計價結果
    pub part_charges: Vec<PartCharge>,

    /// 實際套用的稅率（不課稅時為 0）
    pub effective_tax_rate: Decimal,

    /// 警告信息
    pub warnings: Vec<CalcWarning>,
}

impl InvoiceResult {
    /// 是否有課稅
    pub fn tax_applied(&self) -> bool {
        !self.effective_tax_rate.is_zero()
    }

    /// 添加警告
    pub fn add_warning(&mut self, warning: CalcWarning) {
        self.warnings.push(warning);
    }

    /// 是否有金額無法計算（溢位）
    pub fn has_errors(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| w.severity == WarningSeverity::Error)
    }
}

/// 計算警告
///
/// `line_id` 為空字串時表示工單層級（小計、稅額等）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcWarning {
    pub line_id: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl CalcWarning {
    pub fn new(line_id: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            line_id,
            message,
            severity,
        }
    }

    pub fn info(line_id: String, message: String) -> Self {
        Self::new(line_id, message, WarningSeverity::Info)
    }

    pub fn warning(line_id: String, message: String) -> Self {
        Self::new(line_id, message, WarningSeverity::Warning)
    }

    pub fn error(line_id: String, message: String) -> Self {
        Self::new(line_id, message, WarningSeverity::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Info,
    Warning,
    Error,
}
