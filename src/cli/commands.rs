use crate::assembler::assemble;
use crate::config::Config;
use crate::error::IntakeResult;
use crate::pipeline::{Pipeline, RunSummary};
use crate::registry::Registry;
use crate::services::local::{DirArchive, JsonTableStore, LocalInbox};
use colored::Colorize;
use std::path::PathBuf;

/// Execute the run command: one batch over the local collaborators.
pub fn run(config_path: Option<PathBuf>, verbose: bool) -> IntakeResult<RunSummary> {
    println!("{}", "📬 Intake - Processing form submissions".bold().green());
    println!();

    let config = Config::load(config_path.as_deref())?;
    config.validate()?;

    if verbose {
        println!("{}", "Configuration".cyan());
        println!("   Inbox:   {}", config.local.inbox_dir.display());
        println!("   Outbox:  {}", config.local.outbox_dir.display());
        println!("   Ledger:  {}", config.local.store_path.display());
        println!("   Archive: {}", config.local.archive_dir.display());
        println!("   Notify:  {}", config.notify_to);
        println!();
    }

    let registry = Registry::builtin();
    let mut source = LocalInbox::new(
        &config.local.inbox_dir,
        &config.local.outbox_dir,
        &config.attachment_extension,
    )?;
    let mut store = JsonTableStore::new(&config.local.store_path);
    let mut archive = DirArchive::new(&config.local.archive_dir);

    let summary =
        Pipeline::new(&mut source, &mut store, &mut archive, &config, &registry).run()?;

    println!("{}", "Run summary".bold());
    println!("   ✅ Processed:  {}", summary.processed.to_string().green());
    println!(
        "   ⚠️  Duplicates: {}",
        summary.duplicates.to_string().yellow()
    );
    println!("   ❌ Failures:   {}", summary.failures.to_string().red());
    println!("   📊 Total:      {}", summary.total());

    Ok(summary)
}

/// Execute the parse command: extract one form file and print it.
pub fn parse(file: PathBuf, json: bool) -> IntakeResult<()> {
    let registry = Registry::builtin();
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let submission = assemble(&file, &file_name, &registry)?;

    if json {
        let rendered = serde_json::to_string_pretty(&submission.to_json())
            .expect("submission JSON view serializes");
        println!("{rendered}");
        return Ok(());
    }

    println!("{}", "✅ Form parsed".bold().green());
    println!("   Kind:      {}", submission.kind.to_string().bright_blue());
    println!("   Number:    {}", submission.form_number());
    println!("   Requester: {}", submission.requester());
    println!("   Items:     {}", submission.items.len());

    for (index, item) in submission.items.iter().take(3).enumerate() {
        let fields: Vec<String> = item
            .fields
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!("      {}. {}", index + 1, fields.join(", ").cyan());
    }

    Ok(())
}
