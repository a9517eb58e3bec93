use anyhow::{Context, Result};
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use tracing::info;

use crate::config::Config;

/// Connects to MongoDB and verifies the connection with a ping.
pub async fn connect(config: &Config) -> Result<Client> {
    let uri = config.store_uri();
    info!("Connecting to MongoDB...");

    let mut options = ClientOptions::parse(&uri)
        .await
        .with_context(|| format!("Invalid store URI '{uri}'"))?;
    options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
    let client = Client::with_options(options)?;

    client
        .database(&config.db_name)
        .run_command(doc! { "ping": 1 })
        .await
        .with_context(|| format!("MongoDB at {uri} did not answer ping"))?;

    info!("Connected to MongoDB at {uri} (database: {})", config.db_name);
    Ok(client)
}
