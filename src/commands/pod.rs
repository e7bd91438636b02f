//! Pod command implementation

use crate::cli::PodArgs;
use crate::client::create_client;
use crate::config::load_config;
use crate::debug::pod::capture_pod_snapshot;
use crate::debug::DumpLog;
use crate::error::Result;
use std::path::Path;

/// Print the pod deep-dive to stdout
pub async fn run_pod(context: Option<&str>, config_path: Option<&Path>, args: &PodArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let client = create_client(context).await?;

    let snapshot = capture_pod_snapshot(&client, &args.namespace, &args.name, &config).await?;
    let mut log = DumpLog::capture();
    snapshot.render(&mut log);

    for line in log.lines() {
        println!("{line}");
    }
    Ok(())
}
