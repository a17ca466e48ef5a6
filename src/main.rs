//! Portfolio API: binary entrypoint
//! Boots the Axum HTTP server with the aggregation endpoints and the contact relay.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    portfolio_api::logging::init();

    let router = portfolio_api::app().await?;
    Ok(router.into())
}
