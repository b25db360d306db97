//! Telemetry Hub CLI
//!
//! Command-line client for a running hub:
//! - Push a single reading
//! - Simulate a device streaming vitals
//! - Check status
//! - Generate a config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use telemetry_hub::api::dto::{HealthResponse, IngestResponse, StatsResponse};

#[derive(Parser)]
#[command(name = "telemetry-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the telemetry hub")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Hub server URL
    #[arg(long, default_value = "http://localhost:3001", global = true)]
    pub api_url: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Push one reading
    Push {
        /// Reading as a JSON object, e.g. '{"heartRate": 72}'
        json: Option<String>,
        /// Fields in key=value format; values are parsed as JSON when possible
        #[arg(short, long = "field")]
        fields: Vec<String>,
    },

    /// Stream synthetic vitals like a wearable device would
    Simulate {
        /// Delay between readings
        #[arg(short, long, default_value = "1000")]
        interval_ms: u64,
        /// Number of readings to send (default: until interrupted)
        #[arg(short, long)]
        count: Option<u64>,
        /// Ingest path to post to
        #[arg(long, default_value = "/esp32")]
        path: String,
    },

    /// Show hub status
    Status,

    /// Generate default config file
    InitConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    match cli.command {
        Commands::Push { json, fields } => {
            let reading = build_reading(json.as_deref(), &fields)?;
            let ack = push(&client, &format!("{}/api/v1/readings", cli.api_url), &reading).await?;
            println!("Reading sent to {} subscriber(s)", ack.recipients);
        }

        Commands::Simulate {
            interval_ms,
            count,
            path,
        } => {
            let url = format!("{}{}", cli.api_url, path);
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
            let mut tick = 0u64;

            println!("Streaming synthetic vitals to {} (Ctrl+C to stop)", url);

            loop {
                if count.is_some_and(|n| tick >= n) {
                    break;
                }
                ticker.tick().await;

                let reading = synthetic_vitals(tick, rand_simple());
                match push(&client, &url, &reading).await {
                    Ok(ack) => {
                        println!("#{:<5} {} -> {} subscriber(s)", tick, reading, ack.recipients)
                    }
                    Err(e) => eprintln!("#{:<5} failed: {:#}", tick, e),
                }
                tick += 1;
            }
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: HealthResponse = resp.json().await?;

                    println!("Telemetry Hub v{}", health.version);
                    println!();
                    println!("Status: {}", health.status);
                    println!("Connections: {}", health.connections);
                    println!("Uptime: {}", format_duration(health.uptime_seconds));

                    let stats: StatsResponse = client
                        .get(format!("{}/api/v1/stats", cli.api_url))
                        .send()
                        .await?
                        .error_for_status()?
                        .json()
                        .await?;

                    println!();
                    println!("Readings broadcast: {}", stats.readings_broadcast);
                    println!("Deliveries: {}", stats.deliveries);
                    println!("Dropped: {}", stats.deliveries_dropped);
                    println!(
                        "Connections opened/closed: {}/{}",
                        stats.connections_opened, stats.connections_closed
                    );
                }
                Ok(resp) => {
                    bail!("hub returned error: {}", resp.status());
                }
                Err(e) => {
                    eprintln!("Cannot connect to telemetry hub at {}", cli.api_url);
                    eprintln!();
                    eprintln!("Make sure the server is running:");
                    eprintln!("  cargo run --bin telemetry-hub");
                    return Err(e.into());
                }
            }
        }

        Commands::InitConfig { output } => {
            let content = telemetry_hub::generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

async fn push(
    client: &reqwest::Client,
    url: &str,
    reading: &Value,
) -> anyhow::Result<IngestResponse> {
    let response = client.post(url).json(reading).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        bail!("push failed ({}): {}", status, text);
    }

    Ok(response.json().await?)
}

/// Combine an optional JSON object with `key=value` fields
fn build_reading(json: Option<&str>, fields: &[String]) -> anyhow::Result<Value> {
    let mut reading = match json {
        Some(text) => match serde_json::from_str::<Value>(text)
            .context("reading is not valid JSON")?
        {
            Value::Object(map) => map,
            _ => bail!("reading must be a JSON object"),
        },
        None => Map::new(),
    };

    for field in fields {
        let (key, raw) = field
            .split_once('=')
            .with_context(|| format!("field '{}' is not in key=value format", field))?;
        if key.is_empty() {
            bail!("field '{}' has an empty key", field);
        }
        let value = serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| Value::String(raw.to_string()));
        reading.insert(key.to_string(), value);
    }

    if reading.is_empty() {
        bail!("nothing to send: pass a JSON object or --field key=value");
    }

    Ok(Value::Object(reading))
}

/// A plausible wearable sample; `noise` in [0, 1)
fn synthetic_vitals(tick: u64, noise: f64) -> Value {
    let phase = tick as f64 / 10.0;
    let heart_rate = 72.0 + 8.0 * phase.sin() + 4.0 * (noise - 0.5);
    let temperature = 36.6 + 0.2 * (phase / 3.0).sin();

    serde_json::json!({
        "heartRate": heart_rate.round() as i64,
        "temperature": (temperature * 10.0).round() / 10.0,
        "motion": noise > 0.8,
        "timestamp": chrono::Utc::now().timestamp_millis(),
    })
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

/// Simple random number generator (0.0 to 1.0)
fn rand_simple() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_reading_from_json() {
        let reading = build_reading(Some(r#"{"heartRate": 72}"#), &[]).unwrap();
        assert_eq!(reading, json!({"heartRate": 72}));
    }

    #[test]
    fn test_build_reading_from_fields() {
        let fields = vec![
            "heartRate=72".to_string(),
            "motion=true".to_string(),
            "patient=ward-3".to_string(),
        ];
        let reading = build_reading(None, &fields).unwrap();
        assert_eq!(reading, json!({"heartRate": 72, "motion": true, "patient": "ward-3"}));
    }

    #[test]
    fn test_fields_override_json() {
        let fields = ["heartRate=80".to_string()];
        let reading = build_reading(Some(r#"{"heartRate": 72}"#), &fields).unwrap();
        assert_eq!(reading["heartRate"], json!(80));
    }

    #[test]
    fn test_build_reading_errors() {
        assert!(build_reading(None, &[]).is_err());
        assert!(build_reading(Some("[1]"), &[]).is_err());
        assert!(build_reading(Some("{"), &[]).is_err());
        assert!(build_reading(None, &["novalue".to_string()]).is_err());
        assert!(build_reading(None, &["=5".to_string()]).is_err());
    }

    #[test]
    fn test_synthetic_vitals_shape() {
        let reading = synthetic_vitals(0, 0.5);
        assert_eq!(reading["heartRate"], json!(72));
        assert_eq!(reading["motion"], json!(false));
        assert!(reading["temperature"].as_f64().unwrap() > 36.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(61), "1m 1s");
        assert_eq!(format_duration(3_700), "1h 1m");
        assert_eq!(format_duration(90_000), "1d 1h");
    }
}
