use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use config_reader::convert::Representation;
use config_reader::settings::load_settings;
use config_reader::store::HttpStore;
use config_reader::{ConfigReader, ReaderResult};
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(name = "config-cli")]
#[command(about = "One-shot queries against an application's configuration", long_about = None)]
struct Cli {
    /// Path to the reader settings file (TOML).
    #[arg(short, long, default_value = "reader.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the active keys
    Keys,
    /// Read one value
    Get {
        key: String,
        /// Requested representation (string, i16, i32, i64, f32, f64, decimal, bool)
        #[arg(long = "as", default_value = "string")]
        as_type: Representation,
    },
    /// Show refresh health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config)?;
    settings.listener.enabled = false;

    let store = Arc::new(HttpStore::new(&settings.store)?);
    let reader = ConfigReader::start(settings, store, None).await?;
    reader.ready().await;

    let output = match cli.command {
        Commands::Keys => {
            let mut keys: Vec<String> = reader.all_keys()?.into_iter().collect();
            keys.sort();
            json!({ "application": reader.application(), "keys": keys })
        }
        Commands::Get { key, as_type } => match read_as(&reader, &key, as_type) {
            Ok(value) => json!({ "key": key, "type": as_type.to_string(), "value": value }),
            Err(e) => {
                eprintln!("Error: {}", e);
                reader.shutdown().await;
                std::process::exit(1);
            }
        },
        Commands::Health => json!({
            "application": reader.application(),
            "healthy": reader.is_healthy(),
            "lastSuccessfulRefresh": reader.last_successful_refresh(),
        }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    reader.shutdown().await;
    Ok(())
}

fn read_as(reader: &ConfigReader, key: &str, representation: Representation) -> ReaderResult<Value> {
    Ok(match representation {
        Representation::String => json!(reader.get_value::<String>(key)?),
        Representation::Int16 => json!(reader.get_value::<i16>(key)?),
        Representation::Int32 => json!(reader.get_value::<i32>(key)?),
        Representation::Int64 => json!(reader.get_value::<i64>(key)?),
        Representation::Float32 => json!(reader.get_value::<f32>(key)?),
        Representation::Float64 => json!(reader.get_value::<f64>(key)?),
        Representation::Decimal => json!(reader.get_value::<Decimal>(key)?.to_string()),
        Representation::Bool => json!(reader.get_value::<bool>(key)?),
    })
}
