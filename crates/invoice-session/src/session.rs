//! 工單發票編輯工作階段

use invoice_calc::{CalcWarning, InvoiceCalculator, InvoiceResult};
use invoice_core::{
    CustomerRecord, InvoiceSummary, LineRef, MarginInput, OrderRecord, PartLineItem,
    PricingConfig, PricingDefaults, RateField, ServiceLineItem, VehicleRecord,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::generation::{
    DocumentGenerator, GeneratedDocument, GenerationError, GenerationRequest, InFlightGuard,
};
use crate::selection::SelectionSet;
use crate::sync::{
    decimal_value, id_list_value, CommittedLog, FieldUpdate, Notifier, PendingWrite,
    PersistenceSink, RevisionLog, Severity, Snapshot, StoreField, SyncOutcome,
};
use crate::validation::{check_margin, coerce_rate, GenerationGate, MarginCheck};

/// 外部協作者（建構時注入）
#[derive(Clone)]
pub struct SessionCollaborators {
    pub store: Arc<dyn PersistenceSink>,
    pub notifier: Arc<dyn Notifier>,
    pub generator: Arc<dyn DocumentGenerator>,
}

/// 可變的本地讀取狀態
struct SessionState {
    services: Vec<ServiceLineItem>,
    parts: Vec<PartLineItem>,
    service_selection: SelectionSet,
    part_selection: SelectionSet,
    config: PricingConfig,
    payments_to_date: Decimal,
    revisions: RevisionLog,
    committed: CommittedLog,
    result: InvoiceResult,

    /// 上次重算時是否有無效毛利率
    margins_blocked: bool,
    last_document: Option<GeneratedDocument>,
}

impl SessionState {
    /// 完整重算（任何欄位變動後都必須呼叫）
    fn recompute(&mut self) {
        let calculator = InvoiceCalculator::new(self.config.clone());
        let services = self
            .services
            .iter()
            .filter(|s| self.service_selection.contains(&s.id));
        let parts = self
            .parts
            .iter()
            .filter(|p| self.part_selection.contains(&p.id));

        self.result = calculator.calculate(services, parts, self.payments_to_date);

        let blocked = invoice_calc::has_invalid_margins(&self.parts);
        if blocked != self.margins_blocked {
            if blocked {
                tracing::warn!("工單有零件毛利率無效，發票產生已停用");
            } else {
                tracing::info!("零件毛利率皆有效，發票產生已恢復");
            }
            self.margins_blocked = blocked;
        }
    }

    /// 記錄本地編輯並產生待寫入更新
    ///
    /// `previous` 為編輯前的本地值，`applied` 為編輯後的值。
    fn stage(
        &mut self,
        field: StoreField,
        value: Value,
        previous: Snapshot,
        applied: Snapshot,
    ) -> PendingWrite {
        self.committed.remember(&field, previous);
        let revision = self.revisions.bump(&field);
        PendingWrite {
            update: FieldUpdate {
                field,
                value,
                revision,
            },
            applied,
        }
    }

    fn service_ids(&self) -> Vec<String> {
        self.service_selection
            .ordered_ids(self.services.iter().map(|s| s.id.as_str()))
    }

    fn part_ids(&self) -> Vec<String> {
        self.part_selection
            .ordered_ids(self.parts.iter().map(|p| p.id.as_str()))
    }

    /// 以指定值覆寫單一欄位
    fn restore(&mut self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::ServiceSelection(selection) => self.service_selection = selection,
            Snapshot::PartSelection(selection) => self.part_selection = selection,
            Snapshot::Margin { part_id, value } => {
                if let Some(part) = self.parts.iter_mut().find(|p| p.id == part_id) {
                    part.margin = value;
                }
            }
            Snapshot::Rate { field, value } => self.config.set_rate(field, value),
            Snapshot::Description { line, value } => {
                if let Some(description) = self.description_mut(&line) {
                    *description = value;
                }
            }
        }
    }

    fn description_mut(&mut self, line: &LineRef) -> Option<&mut String> {
        match line {
            LineRef::Service(id) => self
                .services
                .iter_mut()
                .find(|s| &s.id == id)
                .map(|s| &mut s.description),
            LineRef::Part(id) => self
                .parts
                .iter_mut()
                .find(|p| &p.id == id)
                .map(|p| &mut p.description),
        }
    }
}

/// 工單發票編輯工作階段
///
/// 所有編輯都同步套用到本地狀態並立即重算金額摘要，不等待 I/O；
/// 回傳的 [`PendingWrite`] 交由 [`InvoiceSession::flush`] 寫入文件庫。
pub struct InvoiceSession {
    order_id: String,
    customer: CustomerRecord,
    vehicle: Option<VehicleRecord>,
    state: Mutex<SessionState>,
    generating: AtomicBool,
    collaborators: SessionCollaborators,
}

impl InvoiceSession {
    /// 開啟工單
    ///
    /// 首次檢視（未存選取）時預設全選，並回傳需寫入的預設選取。
    pub fn open(
        record: OrderRecord,
        defaults: &PricingDefaults,
        collaborators: SessionCollaborators,
    ) -> (Self, Vec<PendingWrite>) {
        let services = record.service_items();
        let parts = record.part_items();
        let config = PricingConfig::resolve(&record.order, &record.customer, defaults);
        let payments_to_date = record.deposits_of_kind(&defaults.deposit_kind);

        let service_selection = match &record.order.selected_service_ids {
            Some(stored) => SelectionSet::restore(stored, services.iter().map(|s| s.id.as_str())),
            None => SelectionSet::all(services.iter().map(|s| s.id.as_str())),
        };
        let part_selection = match &record.order.selected_part_ids {
            Some(stored) => SelectionSet::restore(stored, parts.iter().map(|p| p.id.as_str())),
            None => SelectionSet::all(parts.iter().map(|p| p.id.as_str())),
        };

        let mut state = SessionState {
            services,
            parts,
            service_selection,
            part_selection,
            config,
            payments_to_date,
            revisions: RevisionLog::default(),
            committed: CommittedLog::default(),
            result: InvoiceResult::default(),
            margins_blocked: false,
            last_document: None,
        };

        // 預設選取尚未存檔：寫入目前選取，失敗時保留本地選取
        let mut initial_writes = Vec::new();
        if record.order.selected_service_ids.is_none() {
            let current = Snapshot::ServiceSelection(state.service_selection.clone());
            let value = id_list_value(state.service_ids());
            initial_writes.push(state.stage(
                StoreField::SelectedServiceIds,
                value,
                current.clone(),
                current,
            ));
        }
        if record.order.selected_part_ids.is_none() {
            let current = Snapshot::PartSelection(state.part_selection.clone());
            let value = id_list_value(state.part_ids());
            initial_writes.push(state.stage(StoreField::SelectedPartIds, value, current.clone(), current));
        }

        state.recompute();

        tracing::info!(
            "開啟工單 {}：工時 {} 筆，零件 {} 筆",
            record.order.id,
            state.services.len(),
            state.parts.len()
        );

        let session = Self {
            order_id: record.order.id,
            customer: record.customer,
            vehicle: record.vehicle,
            state: Mutex::new(state),
            generating: AtomicBool::new(false),
            collaborators,
        };

        (session, initial_writes)
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, severity: Severity, message: &str) {
        self.collaborators.notifier.notify(severity, message);
    }

    // ========== 明細選取 ==========

    /// 切換工時明細選取，ID 不存在時不做任何事
    pub fn toggle_service(&self, id: &str) -> Option<PendingWrite> {
        let mut guard = self.state();
        let state = &mut *guard;

        if !state.services.iter().any(|s| s.id == id) {
            tracing::debug!("忽略不存在的工時明細: {}", id);
            return None;
        }

        let previous = Snapshot::ServiceSelection(state.service_selection.clone());
        state.service_selection.toggle(id);
        let applied = Snapshot::ServiceSelection(state.service_selection.clone());
        let value = id_list_value(state.service_ids());
        let write = state.stage(StoreField::SelectedServiceIds, value, previous, applied);
        state.recompute();

        Some(write)
    }

    /// 切換零件明細選取，ID 不存在時不做任何事
    pub fn toggle_part(&self, id: &str) -> Option<PendingWrite> {
        let mut guard = self.state();
        let state = &mut *guard;

        if !state.parts.iter().any(|p| p.id == id) {
            tracing::debug!("忽略不存在的零件明細: {}", id);
            return None;
        }

        let previous = Snapshot::PartSelection(state.part_selection.clone());
        state.part_selection.toggle(id);
        let applied = Snapshot::PartSelection(state.part_selection.clone());
        let value = id_list_value(state.part_ids());
        let write = state.stage(StoreField::SelectedPartIds, value, previous, applied);
        state.recompute();

        Some(write)
    }

    // ========== 毛利率與費率 ==========

    /// 設定零件毛利率
    ///
    /// 原始輸入一律保存在本地；只有有效值會產生寫入。
    pub fn set_margin(&self, part_id: &str, raw: &str) -> Option<PendingWrite> {
        let mut guard = self.state();
        let state = &mut *guard;

        let Some(part) = state.parts.iter_mut().find(|p| p.id == part_id) else {
            tracing::debug!("忽略不存在的零件明細: {}", part_id);
            return None;
        };

        let (input, check) = check_margin(raw);
        let previous = Snapshot::Margin {
            part_id: part_id.to_string(),
            value: std::mem::replace(&mut part.margin, input.clone()),
        };
        let field = StoreField::Margin(part_id.to_string());

        let write = match check {
            MarginCheck::Valid(value) => {
                let applied = Snapshot::Margin {
                    part_id: part_id.to_string(),
                    value: input,
                };
                Some(state.stage(field, decimal_value(value), previous, applied))
            }
            MarginCheck::Invalid => {
                // 僅本地保存，但仍視為較新的編輯
                state.committed.remember(&field, previous);
                state.revisions.bump(&field);
                None
            }
        };
        state.recompute();

        write
    }

    /// 設定費率欄位，無效輸入改用 `default`，一律寫入
    pub fn set_rate(&self, field: RateField, raw: &str, default: Decimal) -> PendingWrite {
        let mut guard = self.state();
        let state = &mut *guard;

        let value = coerce_rate(field, raw, default);
        let previous = state.config.rate(field);
        state.config.set_rate(field, value);

        let json = match field {
            RateField::TaxEnabled => Value::Bool(state.config.tax_enabled),
            _ => decimal_value(value),
        };
        let write = state.stage(
            StoreField::Rate(field),
            json,
            Snapshot::Rate {
                field,
                value: previous,
            },
            Snapshot::Rate { field, value },
        );
        state.recompute();

        write
    }

    /// 設定折扣（無效輸入視為 0）
    pub fn set_discount(&self, raw: &str) -> PendingWrite {
        self.set_rate(RateField::Discount, raw, Decimal::ZERO)
    }

    /// 設定是否課稅
    pub fn set_tax_enabled(&self, enabled: bool) -> PendingWrite {
        let raw = if enabled { "true" } else { "false" };
        self.set_rate(RateField::TaxEnabled, raw, Decimal::ZERO)
    }

    /// 修改明細說明
    pub fn set_description(&self, line: LineRef, text: &str) -> Option<PendingWrite> {
        let mut guard = self.state();
        let state = &mut *guard;

        let description = state.description_mut(&line)?;
        let previous = Snapshot::Description {
            line: line.clone(),
            value: std::mem::replace(description, text.to_string()),
        };
        let applied = Snapshot::Description {
            line: line.clone(),
            value: text.to_string(),
        };
        let write = state.stage(
            StoreField::Description(line),
            Value::String(text.to_string()),
            previous,
            applied,
        );
        state.recompute();

        Some(write)
    }

    // ========== 持久化同步 ==========

    /// 寫入文件庫
    ///
    /// 成功時更新該欄位的確認值。失敗時：若期間沒有同欄位的新編輯，
    /// 還原為最後確認寫入的值並重算；否則保留本地值，由較新的寫入決定。
    /// 兩種失敗情況都會發出錯誤通知，錯誤不會往外傳遞。
    ///
    /// 同一欄位的寫入應依產生順序送出（見 [`InvoiceSession::flush_all`]）。
    pub async fn flush(&self, pending: PendingWrite) -> SyncOutcome {
        let PendingWrite { update, applied } = pending;

        let err = match self.collaborators.store.persist(&self.order_id, &update).await {
            Ok(()) => {
                self.state()
                    .committed
                    .commit(&update.field, update.revision, applied);
                tracing::debug!("寫入成功 {}#{}", update.field, update.revision);
                return SyncOutcome::Committed;
            }
            Err(err) => err,
        };

        let outcome = {
            let mut guard = self.state();
            let state = &mut *guard;
            if state.revisions.is_latest(&update.field, update.revision) {
                if let Some(committed) = state.committed.get(&update.field).cloned() {
                    state.restore(committed);
                    state.recompute();
                }
                SyncOutcome::Reverted(err.clone())
            } else {
                SyncOutcome::Superseded(err.clone())
            }
        };

        tracing::warn!("寫入失敗 {}#{}: {} ({:?})", update.field, update.revision, err, outcome);
        self.notify(Severity::Error, &format!("儲存 {} 失敗: {}", update.field, err));

        outcome
    }

    /// 依序寫入多筆更新
    pub async fn flush_all(&self, writes: Vec<PendingWrite>) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::with_capacity(writes.len());
        for write in writes {
            outcomes.push(self.flush(write).await);
        }
        outcomes
    }

    // ========== 發票產生 ==========

    /// 產生發票
    ///
    /// 毛利率無效或已有請求進行中時拒絕。失敗時發出通知並清除進行中旗標，
    /// 不會留下文件參照；不自動重試。
    pub async fn generate_invoice(&self) -> Result<GeneratedDocument, GenerationError> {
        let in_flight = InFlightGuard::acquire(&self.generating);

        let request = {
            let state = self.state();
            let gate = GenerationGate::evaluate(&state.parts, &state.result, in_flight.is_none());
            if let Err(err) = gate.check() {
                drop(state);
                tracing::info!("拒絕產生發票 {}: {}", self.order_id, err);
                self.notify(Severity::Warning, &err.to_string());
                return Err(err);
            }
            GenerationRequest::assemble(
                &self.order_id,
                &self.customer,
                self.vehicle.as_ref(),
                &state.config,
                &state.result,
            )
        };

        tracing::info!("開始產生發票 {} (請求 {})", self.order_id, request.request_id);

        match self.collaborators.generator.generate(&request).await {
            Ok(doc) => {
                let document = GeneratedDocument {
                    request_id: request.request_id,
                    url: doc.url,
                    generated_at: chrono::Utc::now(),
                };
                self.state().last_document = Some(document.clone());

                tracing::info!("發票產生完成 {}: {}", self.order_id, document.url);
                self.notify(Severity::Success, "發票已產生");
                Ok(document)
            }
            Err(err) => {
                tracing::error!("發票產生失敗 {}: {}", self.order_id, err);
                self.notify(Severity::Error, &format!("發票產生失敗: {}", err));
                Err(err)
            }
        }
    }

    // ========== 讀取 ==========

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// 目前金額摘要（未四捨五入）
    pub fn summary(&self) -> InvoiceSummary {
        self.state().result.summary.clone()
    }

    /// 顯示用金額摘要
    pub fn display_summary(&self) -> InvoiceSummary {
        self.state().result.summary.rounded()
    }

    /// 目前完整計算結果
    pub fn result(&self) -> InvoiceResult {
        self.state().result.clone()
    }

    /// 最近一次重算的警告（無效毛利率、不計價數量、金額溢位）
    pub fn warnings(&self) -> Vec<CalcWarning> {
        self.state().result.warnings.clone()
    }

    pub fn config(&self) -> PricingConfig {
        self.state().config.clone()
    }

    /// 工單中任一零件毛利率無效
    pub fn invalid_margins(&self) -> bool {
        invoice_calc::has_invalid_margins(&self.state().parts)
    }

    pub fn can_generate(&self) -> bool {
        let state = self.state();
        GenerationGate::evaluate(
            &state.parts,
            &state.result,
            self.generating.load(Ordering::Acquire),
        )
        .can_generate()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    pub fn margin(&self, part_id: &str) -> Option<MarginInput> {
        self.state()
            .parts
            .iter()
            .find(|p| p.id == part_id)
            .map(|p| p.margin.clone())
    }

    pub fn is_service_selected(&self, id: &str) -> bool {
        self.state().service_selection.contains(id)
    }

    pub fn is_part_selected(&self, id: &str) -> bool {
        self.state().part_selection.contains(id)
    }

    /// 最近一次成功產生的發票
    pub fn last_document(&self) -> Option<GeneratedDocument> {
        self.state().last_document.clone()
    }
}
