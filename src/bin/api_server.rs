// HTTP API server binary for diamond search
// Serves search and refinement to storefront product pages

use anyhow::{Context, Result};
use diamond_search::api::ApiServer;
use diamond_search::diamonds::NivodaClient;
use diamond_search::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    env_util::init_env();
    diamond_search::tracing::init_tracing(diamond_search::tracing::DEFAULT_FILTER)?;

    tracing::info!("Initializing diamond search API server");

    let server = ApiServer::from_env()?;

    // Credentials are checked lazily; the first search reports them if missing.
    let client = NivodaClient::from_env().context("failed to build Nivoda client")?;

    server.run(client).await?;

    Ok(())
}
