//! The `drillkit init` command.

use std::path::Path;

use anyhow::Result;

use drillkit_providers::config::{CONFIG_FILE_NAME, STARTER_CONFIG};

pub fn execute() -> Result<()> {
    if Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, STARTER_CONFIG)?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    std::fs::create_dir_all("banks")?;
    let bank_path = Path::new("banks/starter.toml");
    if bank_path.exists() {
        println!("banks/starter.toml already exists, skipping.");
    } else {
        std::fs::write(bank_path, STARTER_BANK)?;
        println!("Created banks/starter.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set DRILLKIT_GATEWAY_KEY or edit {CONFIG_FILE_NAME}");
    println!("  2. Run: drillkit validate --bank banks/starter.toml");
    println!("  3. Run: drillkit play --variant quiz --bank banks/starter.toml");
    println!("  4. Or try an offline drill: drillkit play --variant arithmetic");

    Ok(())
}

const STARTER_BANK: &str = r#"[bank]
id = "starter"
name = "Starter Bank"
subject = "general"

[[questions]]
id = "largest-ocean"
question = "Which is the largest ocean on Earth?"
options = ["Atlantic", "Indian", "Pacific", "Arctic"]
answer = 2
difficulty = "easy"

[[questions]]
id = "triangle-angles"
question = "The interior angles of a triangle add up to how many degrees?"
options = ["90", "180", "270", "360"]
answer = 1
difficulty = "easy"

[[questions]]
id = "hardest-natural"
question = "Which natural material is the hardest?"
options = ["Quartz", "Diamond", "Granite", "Topaz"]
answer = 1
explanation = "Diamond scores 10 on the Mohs scale."
difficulty = "medium"
"#;
