//! Dump command implementation

use crate::cli::DumpArgs;
use crate::client::create_client;
use crate::config::load_config;
use crate::debug::{DiagnosticKey, Diagnostics, DumpOutcome};
use crate::error::Result;
use owo_colors::OwoColorize;
use std::path::Path;

/// Register a client and run the dump pipeline under `manual:<label>`
pub async fn run_dump(context: Option<&str>, config_path: Option<&Path>, args: &DumpArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let client = create_client(context).await?;

    let diagnostics = Diagnostics::new(config);
    diagnostics.set_client(client);

    let key = DiagnosticKey::Manual(args.label.clone());
    match diagnostics.run_once(&key).await {
        DumpOutcome::Ran => eprintln!("{} diagnostics complete ({key})", "✓".green()),
        DumpOutcome::AlreadyTriggered => eprintln!("{} diagnostics already ran for {key}", "-".dimmed()),
        DumpOutcome::NoClient => eprintln!("{} no cluster client available", "✗".red()),
    }

    Ok(())
}
