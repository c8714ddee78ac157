//! # Invoice Core
//!
//! 維修工單發票的核心資料模型與類型定義

pub mod line_item;
pub mod margin;
pub mod order;
pub mod pricing;
pub mod summary;

// Re-export 主要類型
pub use line_item::{LineRef, PartLineItem, ServiceLineItem};
pub use margin::MarginInput;
pub use order::{
    CustomerRecord, DepositRecord, ExpenseRecord, OrderRecord, OrderSettings, ServiceRecord,
    VehicleRecord,
};
pub use pricing::{PricingConfig, PricingDefaults, RateField};
pub use summary::InvoiceSummary;

/// 發票引擎錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("工單資料解析失敗: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
