//! Minimal in-process host: render the field, upload a style file, then run
//! the two-phase submit and print the assembled payload.

use std::sync::Arc;

use mapstyle_core::{submit, Composite, FormField, Operation};
use mapstyle_upload::{FilePayload, MemoryTransport};
use mapstyle_widget::{Catalog, JinjaEngine, StyleUploadField};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let field = StyleUploadField::new(Catalog::empty(), Arc::new(JinjaEngine::new()?));
    println!("{}", field.render()?);

    let mut composite = Composite::new(Operation::Create);
    println!("submit before upload accepted: {}", submit(&[&field], &mut composite));

    field.upload().select_file(
        Arc::new(MemoryTransport::new()),
        FilePayload {
            name: "style.xml".to_string(),
            mime_type: "text/xml".to_string(),
            bytes: b"<Map><Style name=\"default\"/></Map>".to_vec(),
        },
    );
    field.upload().settled().await;

    println!("submit after upload accepted: {}", submit(&[&field], &mut composite));
    println!("{}", serde_json::to_string_pretty(composite.payload())?);
    Ok(())
}
