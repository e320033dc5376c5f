//! Example demonstrating the opaque token lifecycle on Redis
//!
//! This example shows how to:
//! - Load layered configuration and initialize tracing
//! - Mint an access/refresh pair
//! - Validate and rotate tokens
//! - Revoke everything a user holds
//!
//! Run with: cargo run -p ot_infra --example token_lifecycle_demo

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use ot_core::domain::mask_token;
use ot_core::services::{TokenService, TokenServiceConfig};
use ot_infra::cache::{RedisClient, RedisTokenStore};
use ot_infra::{load_config, telemetry};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Session {
    role: String,
    device: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging)?;

    println!("Opaque Token Lifecycle Demo");
    println!("===========================\n");

    // 1. Setup Redis-backed store
    let client = RedisClient::new(config.cache.clone())
        .await
        .context("failed to connect to Redis")?;
    println!("✓ Redis connection established (healthy: {})\n", client.health_check().await?);
    let store = RedisTokenStore::new(Arc::new(client));

    // 2. Build the engine from the token section
    let service_config = TokenServiceConfig::try_from(&config.token)?;
    let service: TokenService<_, Session> = TokenService::new(store, service_config)?;

    // 3. Mint a pair
    let session = Session {
        role: "member".to_string(),
        device: "demo-cli".to_string(),
    };
    let pair = service.mint_pair("demo-user", session).await?;
    println!("Minted pair with lineage {}", pair.lineage_id());
    println!("  access:  {}", mask_token(pair.access_token()));
    println!("  refresh: {}\n", mask_token(pair.refresh_token()));

    // 4. Validate the access token
    let record = service.validate_access(pair.access_token()).await?;
    println!(
        "Access token valid for user {} ({:?}), {}s left\n",
        record.user_id,
        record.payload,
        record.time_until_expiration().num_seconds()
    );

    // 5. Rotate with an upgraded payload
    let upgraded = Session {
        role: "admin".to_string(),
        device: "demo-cli".to_string(),
    };
    let rotated = service.rotate(pair.refresh_token(), Some(upgraded)).await?;
    println!("Rotated to lineage {}", rotated.lineage_id());
    match service.validate(pair.access_token()).await {
        Ok(_) => println!("  old access token still valid (unexpected)"),
        Err(e) => println!("  old access token rejected: {} [{}]\n", e, e.code()),
    }

    // 6. List and revoke
    let live = service.list_user_tokens("demo-user").await?;
    println!("User holds {} live tokens", live.len());
    let revoked = service.revoke_all_for_user("demo-user").await?;
    println!("Revoked {} tokens", revoked);

    Ok(())
}
