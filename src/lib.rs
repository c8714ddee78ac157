//! # Service Invoice
//!
//! 維修工單發票計算引擎
//!
//! - [`model`]：資料模型與計價參數
//! - [`calc`]：金額摘要計算
//! - [`session`]：選取、驗證、持久化同步與發票產生

pub use invoice_calc as calc;
pub use invoice_core as model;
pub use invoice_session as session;

pub use invoice_calc::{InvoiceCalculator, InvoiceResult};
pub use invoice_core::{InvoiceError, InvoiceSummary, OrderRecord, PricingConfig, PricingDefaults};
pub use invoice_session::{InvoiceSession, SessionCollaborators};
