mod api_doc;
mod app;
mod config;
mod dispatcher;
mod dynamodb;
mod error;
mod fanout;
mod handlers;
mod lambda;
mod models;
mod routes;
mod state;
mod store;

use config::Config;
use dynamodb::DynamoRecordStore;
use state::AppState;
use std::sync::Arc;
use store::{InMemoryRecordStore, RecordStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config);

    tracing::info!("user-dispatcher starting");
    config.log_startup();

    let store: Arc<dyn RecordStore> = if config.in_memory_store {
        Arc::new(InMemoryRecordStore::new())
    } else {
        Arc::new(DynamoRecordStore::from_config(&config).await?)
    };
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };

    if config.runs_on_lambda() {
        lambda::run(app::build_router(state), config.fanout_max_concurrency).await
    } else {
        app::serve(&config, state).await
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_level()));

    if config.runs_on_lambda() {
        // CloudWatch stamps every line already.
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
