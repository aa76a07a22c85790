use clap::{Parser, Subcommand};
use reqwest::blocking::Client;
use std::process;

#[derive(Parser)]
#[command(name = "cratereg-ctl")]
#[command(about = "CLI tool for administering a cratereg registry", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger a bulk garbage collection sweep.
    Gc {
        #[arg(long, env = "CRATEREG_URL")]
        url: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = execute_command(&cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn execute_command(cmd: &Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::Gc { url } => execute_gc_command(url),
    }
}

fn execute_gc_command(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();

    let response = client.post(format!("{}/v2/gc", url)).send()?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response
            .text()
            .unwrap_or_else(|_| String::from("no response body"));
        return Err(format!("{} - {}", status, text).into());
    }

    let stats: serde_json::Value = response.json()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
