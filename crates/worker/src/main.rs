use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shapecloud_core::kinds::GPU_QUEUE;
use shapecloud_fleet::BrokerClient;
use shapecloud_pipeline::{BlobStore, LocalBlobStore, S3BlobStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shapecloud_worker=debug,shapecloud_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = shapecloud_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    shapecloud_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection pool created");

    let broker = Arc::new(BrokerClient::from_env());

    // S3 when a bucket is configured, local directory otherwise.
    let store: Arc<dyn BlobStore> = match std::env::var("BLOB_S3_BUCKET") {
        Ok(bucket) => {
            tracing::info!(bucket = %bucket, "Using S3 blob store");
            Arc::new(S3BlobStore::from_env(bucket).await)
        }
        Err(_) => {
            let root = std::env::var("BLOB_STORE_ROOT").unwrap_or_else(|_| "./data".into());
            tracing::info!(root = %root, "Using local blob store");
            Arc::new(LocalBlobStore::new(root))
        }
    };

    let engine_bin = PathBuf::from(
        std::env::var("ENGINE_BIN")
            .unwrap_or_else(|_| shapecloud_engine::invocation::DEFAULT_ENGINE_BIN.to_string()),
    );

    let cancel = tokio_util::sync::CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received SIGINT, shutting down worker");
            signal_cancel.cancel();
        }
    });

    shapecloud_worker::run_worker(
        pool,
        broker,
        store,
        engine_bin,
        GPU_QUEUE,
        shapecloud_worker::poll_interval_from_env(),
        cancel,
    )
    .await;
}
