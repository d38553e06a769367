use lambda_runtime::{run, service_fn, tracing, Error};
use std::sync::Arc;

mod config;
mod db;
mod event_handler;

use config::Config;
use event_handler::function_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Arc::new(Config::from_env()?);
    tracing::info!(mode = ?config.mode, "handler configured");

    run(service_fn(move |event| {
        let config = Arc::clone(&config);
        async move { function_handler(config, event).await }
    }))
    .await
}
