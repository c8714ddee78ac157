//! 維修工單發票計算示例

use async_trait::async_trait;
use service_invoice::model::{OrderRecord, PricingDefaults};
use service_invoice::session::{
    DocumentGenerator, DocumentRef, FieldUpdate, GenerationError, GenerationRequest,
    PersistError, PersistenceSink, SessionCollaborators, TracingNotifier,
};
use service_invoice::InvoiceSession;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// 只列印寫入內容的文件庫
struct PrintingStore;

#[async_trait]
impl PersistenceSink for PrintingStore {
    async fn persist(&self, order_id: &str, update: &FieldUpdate) -> Result<(), PersistError> {
        println!("  寫入 {}/{} = {} (#{})", order_id, update.field, update.value, update.revision);
        Ok(())
    }
}

/// 回傳固定網址的文件產生服務
struct PreviewGenerator;

#[async_trait]
impl DocumentGenerator for PreviewGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<DocumentRef, GenerationError> {
        let payload = serde_json::to_string_pretty(&request.amounts)
            .map_err(|e| GenerationError::Service(e.to_string()))?;
        println!("  產生請求金額:\n{}", payload);
        Ok(DocumentRef {
            url: format!("file:///tmp/{}.pdf", request.order_id),
        })
    }
}

const ORDER: &str = r#"{
    "order": { "id": "RO-1001", "laborRate": 150, "taxEnabled": true },
    "services": [
        { "id": "S1", "name": "Front brake service", "time": 2 },
        { "id": "S2", "name": "Tire rotation", "time": 0.5 }
    ],
    "expenses": [
        { "id": "P1", "memo": "Rotor", "amount": 100, "quantity": 2, "margin": 25 },
        { "id": "P2", "memo": "Brake pads", "amount": 45, "quantity": 1, "margin": "" }
    ],
    "deposits": [ { "type": "service", "amount": 200 } ],
    "customer": { "id": "C-42", "name": "Jordan Lee" },
    "vehicle": { "vin": "2T1BURHE0JC123456", "year": 2018, "make": "Toyota", "model": "Corolla" }
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== 維修工單發票計算示例 ===\n");

    let record = OrderRecord::from_json_str(ORDER)?;
    let collaborators = SessionCollaborators {
        store: Arc::new(PrintingStore),
        notifier: Arc::new(TracingNotifier),
        generator: Arc::new(PreviewGenerator),
    };
    let (session, initial) = InvoiceSession::open(record, &PricingDefaults::default(), collaborators);
    session.flush_all(initial).await;

    println!("\n初始摘要: {:#?}", session.display_summary());

    // 毛利率空白：無法產生發票
    if let Err(err) = session.generate_invoice().await {
        println!("\n產生失敗: {}", err);
    }

    println!("\n補上毛利率並取消輪胎調位:");
    let mut writes = Vec::new();
    writes.extend(session.set_margin("P2", "40"));
    writes.extend(session.toggle_service("S2"));
    writes.push(session.set_discount("20"));
    session.flush_all(writes).await;

    println!("\n更新後摘要: {:#?}", session.display_summary());

    let document = session.generate_invoice().await?;
    println!("\n發票已產生: {}", document.url);

    Ok(())
}
