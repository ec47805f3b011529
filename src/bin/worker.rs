//! Worker Binary
//!
//! Standalone conversion worker for multi-process deployments:
//! 1. Connects to the shared Redis queues and the shared storage root.
//! 2. Runs `WORKERS_PER_TYPE` worker loops for every resource type.

use static_resource::adapters::local::{FfmpegTranscoder, FsBlobStore, RedisPool};
use static_resource::application::WorkerService;
use static_resource::config::WorkerConfig;
use static_resource::domain::ResourceType;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = WorkerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let queue = match RedisPool::new(&config.redis_url) {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "failed to connect to Redis");
            std::process::exit(1);
        }
    };

    let worker = Arc::new(WorkerService::new(
        queue,
        FsBlobStore::new(&config.storage_root),
        FfmpegTranscoder::new(&config.ffmpeg_path),
    ));

    let mut handles = Vec::new();
    for kind in ResourceType::ALL {
        for i in 0..config.workers_per_type {
            let w = worker.clone();
            handles.push(tokio::spawn(async move {
                w.run_worker_loop(i, kind).await;
            }));
        }
    }
    info!(
        workers_per_type = config.workers_per_type,
        root = %config.storage_root,
        "worker started, polling for requests"
    );

    futures::future::join_all(handles).await;
}
