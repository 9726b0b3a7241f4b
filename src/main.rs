use veriface::analyzer::OnnxFaceAnalyzer;
use veriface::config::Config;
use veriface::server::Server;

use clap::Parser;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "verifaced")]
#[command(about = "Face verification socket service")]
struct Cli {
    /// Path to the TOML config file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.debug);

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::default(),
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!(
        "Loading models: detector {}, recognizer {}",
        config.models.detector_path.display(),
        config.models.recognizer_path.display()
    );
    let analyzer = Arc::new(OnnxFaceAnalyzer::new(&config)?);

    let server = Server::bind(config.server.addr(), analyzer, config.matching.tolerance)?;
    server.run()?;

    Ok(())
}

fn setup_logging(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init();
    }
}
