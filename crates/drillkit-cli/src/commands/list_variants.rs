//! The `drillkit list-variants` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use drillkit_core::model::{ItemFlow, SessionConfig, Variant};
use drillkit_providers::load_config_from;

fn clock(config: &SessionConfig) -> String {
    match (config.per_item_budget, config.per_session_budget) {
        (Some(per_item), _) => format!("{}s per item", per_item.as_secs()),
        (None, Some(total)) => format!("{}s session", total.as_secs()),
        (None, None) => "none".to_string(),
    }
}

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut table = Table::new();
    table.set_header(vec!["Variant", "Flow", "Clock", "Items", "Batch", "Source"]);

    for variant in Variant::ALL {
        let session = config.session_config(variant);
        let flow = match variant.flow() {
            ItemFlow::Sequential => "sequential",
            ItemFlow::OpenBoard => "open board",
        };
        table.add_row(vec![
            variant.to_string(),
            flow.to_string(),
            clock(&session),
            session.item_count.to_string(),
            session
                .batch_size
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            session.content_source.clone(),
        ]);
    }

    println!("{table}");
    Ok(())
}
