//! HTTP + WebSocket front end for roundtable analyses.
//!
//! ```text
//! OPEN_AI_SECRET=sk-... ROUNDTABLE_ADDR=127.0.0.1:5000 RUST_LOG=info roundtable-server
//! ```
//!
//! Set `ROUNDTABLE_DEBUG=1` to enable `GET /debug/sessions`.

use roundtable::clients::openai::OpenAIClient;
use roundtable::server::{serve, AppState};
use roundtable::search::duckduckgo::DuckDuckGoSearch;
use roundtable::RoundtableConfig;
use std::net::SocketAddr;
use std::sync::Arc;

const DEFAULT_ADDR: &str = "0.0.0.0:5000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    roundtable::init_logger();

    let secret_key = std::env::var("OPEN_AI_SECRET")
        .map_err(|_| "OPEN_AI_SECRET must be set to an OpenAI API key")?;
    let addr: SocketAddr = std::env::var("ROUNDTABLE_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let debug_routes = std::env::var("ROUNDTABLE_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let config = RoundtableConfig::from_env();
    log::info!(
        "Starting roundtable server on {} (model: {})",
        addr,
        config.model
    );

    let client = Arc::new(OpenAIClient::new_with_model_string(
        &secret_key,
        &config.model,
    ));
    let state = AppState::wired(client, Arc::new(DuckDuckGoSearch::new()), config)
        .with_debug_routes(debug_routes);

    serve(addr, state).await
}
