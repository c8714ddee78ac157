//! # Invoice Session
//!
//! 單一工單的發票編輯狀態：明細選取、毛利率/費率驗證、
//! 持久化同步與發票產生請求

pub mod generation;
pub mod selection;
pub mod session;
pub mod sync;
pub mod validation;

// Re-export 主要類型
pub use generation::{
    AmountBreakdown, DocumentGenerator, DocumentRef, GeneratedDocument, GenerationError,
    GenerationRequest,
};
pub use selection::SelectionSet;
pub use session::{InvoiceSession, SessionCollaborators};
pub use sync::{
    FieldUpdate, Notifier, PendingWrite, PersistError, PersistenceSink, Severity, StoreField,
    SyncOutcome, TracingNotifier,
};
pub use validation::{GenerationGate, MarginCheck};
