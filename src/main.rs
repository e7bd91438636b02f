//! dscdiag - cluster diagnostics for DataScienceCluster e2e runs

use anyhow::Result;
use clap::Parser;
use dscdiag::cli::{Cli, Command};
use dscdiag::commands;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    setup_tracing(cli.verbose);

    // Handle color settings
    if cli.no_color {
        owo_colors::set_override(false);
    }

    let context = cli.context.as_deref();
    let config = cli.config.as_deref();

    // Execute command; Ok(false) means the command ran but found problems
    let result = match cli.command {
        Command::Dump(ref args) => commands::run_dump(context, config, args).await.map(|_| true),
        Command::Health(ref args) => commands::run_health(context, config, args).await,
        Command::Pod(ref args) => commands::run_pod(context, config, args).await.map(|_| true),
        Command::Redact(ref args) => commands::run_redact(args).map(|_| true),
        Command::Completions(ref args) => {
            generate_completions(args.shell);
            Ok(true)
        }
    };

    match result {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // dump output stays visible at every verbosity
    let directives = format!("{filter},dscdiag::dump=info");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| directives.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;

    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "dscdiag", &mut std::io::stdout());
}
