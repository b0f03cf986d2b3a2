use axum::serve;
use gimmejson::api::routes::build_app;
use gimmejson::config::AppConfig;
use gimmejson::store::traits::EndpointStore;
use gimmejson::store::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("gimmejson: mock API server");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    let store = match &config.store.data_file {
        Some(path) => MemoryStore::with_data_file(PathBuf::from(path))?,
        None => MemoryStore::new(),
    };
    let store = Arc::new(store);

    // Snapshot the stored definitions and materialize them as live routes.
    // Definitions created or changed after this point are served on restart.
    let definitions = store.list_endpoints().await?;
    println!("Materializing {} endpoint definitions", definitions.len());
    let app = build_app(store, &definitions)?;

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("gimmejson server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
