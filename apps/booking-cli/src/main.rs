use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use commands::Command;

const USAGE: &str = "usage:
  booking-cli availability <health-center-id> <YYYY-MM-DD>
  booking-cli book <health-center-id> <service-id> <YYYY-MM-DD> <HH:MM> [notes]
  booking-cli appointments
  booking-cli cancel <appointment-id>

environment: SUPABASE_URL, SUPABASE_ANON_PUBLIC_KEY, API_ACCESS_TOKEN, PATIENT_ID";

#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::parse(&args).map_err(|e| anyhow!("{}\n\n{}", e, USAGE))?;

    let config = AppConfig::from_env();
    if !config.is_configured() {
        return Err(anyhow!("backend is not configured\n\n{}", USAGE));
    }

    let auth_token = env::var("API_ACCESS_TOKEN").context("API_ACCESS_TOKEN must be set")?;
    let supabase = Arc::new(SupabaseClient::new(&config)?);

    info!("Using booking backend at {}", supabase.get_base_url());

    commands::run(command, supabase, &auth_token).await
}
