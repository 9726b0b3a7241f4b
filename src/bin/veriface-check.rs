use veriface::client::FaceClient;
use veriface::protocol::{Status, DEFAULT_ADDR};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "veriface-check")]
#[command(about = "Send requests to a running face verification service")]
struct Cli {
    /// Service address
    #[arg(long, default_value = DEFAULT_ADDR)]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that an image contains exactly one face
    Check {
        /// Image file to send
        image: PathBuf,
    },
    /// Compare an image against a database image stored on the service host
    Compare {
        /// Image file to send
        image: PathBuf,
        /// Path to the database image, as seen by the service
        db_image: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut client = FaceClient::connect(&cli.addr)?;

    let response = match &cli.command {
        Commands::Check { image } => {
            let image_b64 = BASE64.encode(std::fs::read(image)?);
            client.check_face(image_b64)?
        }
        Commands::Compare { image, db_image } => {
            let image_b64 = BASE64.encode(std::fs::read(image)?);
            client.compare_faces(image_b64, db_image.to_string_lossy())?
        }
    };

    println!("{}: {}", response.status, response.message);
    Ok(if response.status == Status::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
