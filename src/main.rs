use clap::Parser;
use oomwatch::cli::Cli;
use std::process;

#[cfg(not(target_os = "linux"))]
fn main() {
    let _ = Cli::parse();
    eprintln!("Error: oomwatch requires the Linux cgroup v1 memory controller");
    process::exit(1);
}

#[cfg(target_os = "linux")]
#[tokio::main(flavor = "current_thread")]
async fn main() {
    use oomwatch::cli::commands;
    use tracing::{info, Level};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let program = std::env::args().next().unwrap_or_else(|| "oomwatch".to_string());

    // Usage errors exit with 1; --help and --version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // stdout carries notification records only
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level.to_string())),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Starting oomwatch v{}", env!("CARGO_PKG_VERSION"));

    match commands::handle_watch(cli).await {
        Ok(summary) => {
            info!(
                termination = ?summary.termination,
                notifications = summary.notifications,
                "oomwatch stopped"
            );
        }
        Err(e) => {
            eprintln!("{}: {:#}", program, e);
            process::exit(1);
        }
    }
}
