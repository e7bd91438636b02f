//! Health command implementation

use crate::cli::{HealthArgs, OutputFormat};
use crate::client::create_client;
use crate::config::load_config;
use crate::debug::health::{run_health_check, HealthReport, HealthSelection};
use crate::error::Result;
use owo_colors::OwoColorize;
use std::path::Path;

/// Print the health report; returns whether the cluster is healthy
pub async fn run_health(
    context: Option<&str>,
    config_path: Option<&Path>,
    args: &HealthArgs,
) -> Result<bool> {
    let config = load_config(config_path)?;
    let client = create_client(context).await?;

    let selection = HealthSelection::new(&args.layer, &args.sections);
    let report = run_health_check(&client, &config, &selection).await;

    match args.output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&report)?;
            println!("{}", yaml);
        }
        OutputFormat::Text => print_report(&report),
    }

    Ok(report.healthy())
}

/// Print report in human-readable format
fn print_report(report: &HealthReport) {
    println!();
    println!(
        "{}",
        format!("Cluster Health ({})", report.collected_at.format("%Y-%m-%d %H:%M:%S UTC")).bold()
    );
    println!("{}", "=".repeat(50));

    for (section, error, skipped) in report.section_status() {
        if skipped {
            println!("  {} {}", "-".dimmed(), format!("{section} (skipped)").dimmed());
            continue;
        }
        match error {
            None => println!("  {} {}", "✓".green(), section),
            Some(e) => {
                println!("  {} {}", "✗".red(), section.to_string().red().bold());
                for problem in e.split("; ") {
                    println!("      {}", problem);
                }
            }
        }
    }

    if !report.events.data.events.is_empty() {
        println!();
        println!("{}", "Recent warnings:".yellow().bold());
        for event in &report.events.data.events {
            println!(
                "  {}/{} {}: {} - {}",
                event.namespace, event.name, event.kind, event.reason, event.message
            );
        }
    }

    println!();
    if report.healthy() {
        println!("{}", "Cluster is healthy".green().bold());
    } else {
        println!("{}", "Cluster is unhealthy".red().bold());
    }
}
