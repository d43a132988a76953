//! The `drillkit validate` command.

use std::path::PathBuf;

use anyhow::Result;

use drillkit_core::content::bank;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let banks = if bank_path.is_dir() {
        bank::load_bank_directory(&bank_path)?
    } else {
        vec![bank::parse_bank(&bank_path)?]
    };

    let mut total_warnings = 0;

    for b in &banks {
        println!("Bank: {} ({} questions)", b.name, b.questions.len());

        let warnings = bank::validate_bank(b);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
