use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "hydrate-cli")]
#[command(about = "Management CLI for the hydrate router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show build gate state and bundle cache contents
    Status,
    /// Request client bundles so they are compiled and cached
    Warm {
        /// Bundle paths, e.g. /islands/counter.js
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{base}/_hydrate/status")).send().await?;
            print_response(res).await?;
        }
        Commands::Warm { paths } => {
            let mut failed = 0;
            for path in paths {
                let res = client.get(format!("{base}{path}")).send().await?;
                let status = res.status();
                let body = res.bytes().await?;
                println!("{status} {path} ({} bytes)", body.len());
                if !status.is_success() {
                    failed += 1;
                }
            }
            if failed > 0 {
                return Err(format!("{failed} bundle(s) failed to build").into());
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: status endpoint returned {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
