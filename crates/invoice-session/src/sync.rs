//! 持久化同步
//!
//! 每次編輯先在本地套用並重算，再產生一筆 [`PendingWrite`] 交給文件庫。
//! 寫入失敗時將該欄位還原為最後一次確認寫入的值（若期間沒有更新的編輯）。

use async_trait::async_trait;
use invoice_core::{LineRef, MarginInput, RateField};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 持久化錯誤
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistError {
    #[error("文件庫寫入失敗: {0}")]
    Store(String),

    /// 文件庫已有更新的版本
    #[error("版本衝突: 寫入版本 {attempted}，文件庫版本 {current}")]
    Conflict { attempted: u64, current: u64 },
}

/// 通知嚴重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// 文件庫寫入協作者
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// 寫入單一欄位
    async fn persist(&self, order_id: &str, update: &FieldUpdate) -> Result<(), PersistError>;
}

/// 使用者通知協作者
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// 只寫日誌的通知實作
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Info | Severity::Success => tracing::info!("{}", message),
        }
    }
}

/// 可寫入文件庫的欄位
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreField {
    SelectedServiceIds,
    SelectedPartIds,
    Margin(String),
    Rate(RateField),
    Description(LineRef),
}

impl StoreField {
    /// 文件庫欄位路徑
    pub fn key(&self) -> String {
        match self {
            StoreField::SelectedServiceIds => "selectedServiceIds".to_string(),
            StoreField::SelectedPartIds => "selectedPartIds".to_string(),
            StoreField::Margin(part_id) => format!("expenses/{}/margin", part_id),
            StoreField::Rate(field) => field.store_key().to_string(),
            StoreField::Description(LineRef::Service(id)) => format!("services/{}/name", id),
            StoreField::Description(LineRef::Part(id)) => format!("expenses/{}/memo", id),
        }
    }
}

impl fmt::Display for StoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// 單一欄位的更新內容
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: StoreField,
    pub value: Value,

    /// 本地遞增版本，文件庫可據此丟棄較舊的寫入
    pub revision: u64,
}

/// 單一欄位的本地值（用於還原）
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    ServiceSelection(crate::SelectionSet),
    PartSelection(crate::SelectionSet),
    Margin { part_id: String, value: MarginInput },
    Rate { field: RateField, value: Decimal },
    Description { line: LineRef, value: String },
}

/// 已在本地套用、尚未寫入文件庫的更新
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub update: FieldUpdate,

    /// 此次寫入套用的本地值，寫入成功後成為該欄位的確認值
    pub(crate) applied: Snapshot,
}

impl PendingWrite {
    pub fn field(&self) -> &StoreField {
        &self.update.field
    }

    pub fn revision(&self) -> u64 {
        self.update.revision
    }
}

/// 同步結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// 寫入成功
    Committed,

    /// 寫入失敗，欄位已還原為最後確認寫入的值
    Reverted(PersistError),

    /// 寫入失敗，但該欄位已有更新的編輯，保留本地值
    Superseded(PersistError),
}

impl SyncOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SyncOutcome::Committed)
    }
}

pub(crate) fn decimal_value(value: Decimal) -> Value {
    Value::String(value.normalize().to_string())
}

pub(crate) fn id_list_value(ids: Vec<String>) -> Value {
    Value::Array(ids.into_iter().map(Value::String).collect())
}

/// 以 `(欄位, 版本)` 比對確認寫入是否仍是最新編輯
#[derive(Debug, Default)]
pub(crate) struct RevisionLog {
    next: u64,
    latest: std::collections::HashMap<StoreField, u64>,
}

impl RevisionLog {
    /// 記錄一次本地編輯並回傳新版本
    pub fn bump(&mut self, field: &StoreField) -> u64 {
        self.next += 1;
        self.latest.insert(field.clone(), self.next);
        self.next
    }

    pub fn is_latest(&self, field: &StoreField, revision: u64) -> bool {
        self.latest.get(field).copied() == Some(revision)
    }

    /// 已編輯過的欄位
    #[cfg(test)]
    pub fn fields(&self) -> std::collections::HashSet<&StoreField> {
        self.latest.keys().collect()
    }
}

/// 各欄位最後一次確認與文件庫一致的值
///
/// 欄位首次編輯時記下載入時的值（版本 0），之後只由成功的寫入更新。
#[derive(Debug, Default)]
pub(crate) struct CommittedLog {
    entries: std::collections::HashMap<StoreField, (u64, Snapshot)>,
}

impl CommittedLog {
    /// 欄位尚無紀錄時，以編輯前的值作為確認值
    pub fn remember(&mut self, field: &StoreField, current: Snapshot) {
        self.entries.entry(field.clone()).or_insert((0, current));
    }

    /// 寫入成功；較舊版本的確認不覆蓋較新的
    pub fn commit(&mut self, field: &StoreField, revision: u64, value: Snapshot) {
        match self.entries.get(field) {
            Some((committed, _)) if *committed >= revision => {}
            _ => {
                self.entries.insert(field.clone(), (revision, value));
            }
        }
    }

    pub fn get(&self, field: &StoreField) -> Option<&Snapshot> {
        self.entries.get(field).map(|(_, value)| value)
    }
}
