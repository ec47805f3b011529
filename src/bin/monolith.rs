//! Monolith Binary - Single-server deployment
//!
//! This is the main entry point for local development and single-server deployment.
//! It wires up:
//! - Local adapters (filesystem blobs, users file, in-memory or Redis registry and queues)
//! - Conversion workers and the conversion-response listener
//! - HTTP inbound adapter

use static_resource::adapters::local::http::{self, TokenTable};
use static_resource::adapters::local::{
    FfmpegTranscoder, FsBlobStore, InMemoryBus, InMemoryRegistry, JsonUserDirectory,
};
use static_resource::application::{StaticResourceService, WorkerService};
use static_resource::config::LocalConfig;
use static_resource::domain::ResourceType;
use static_resource::ports::{DispatchPort, ResourceRegistry, WorkerPort};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = LocalConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Adapters shared by both deployments
    let blobs = FsBlobStore::new(&config.storage_root);
    let directory = match JsonUserDirectory::load(&config.users_file).await {
        Ok(directory) => directory,
        Err(e) => {
            error!(path = %config.users_file, error = %e, "failed to load users file");
            std::process::exit(1);
        }
    };
    let tokens = TokenTable::parse(&config.api_tokens);
    if tokens.is_empty() {
        warn!("API_TOKENS is empty, every request will be refused");
    }

    // 2. Registry and queues
    if config.uses_redis() {
        #[cfg(feature = "redis")]
        {
            let pool = match static_resource::adapters::local::RedisPool::new(&config.redis_url) {
                Ok(pool) => pool,
                Err(e) => {
                    error!(error = %e, "failed to connect to Redis");
                    std::process::exit(1);
                }
            };
            info!("using Redis registry and queues");
            run(config, pool.clone(), blobs, pool, directory, tokens).await;
        }
        #[cfg(not(feature = "redis"))]
        {
            error!("REDIS_URL is set but this build has no redis feature");
            std::process::exit(1);
        }
    } else {
        info!("using in-process registry and queues");
        run(
            config,
            InMemoryRegistry::new(),
            blobs,
            InMemoryBus::new(),
            directory,
            tokens,
        )
        .await;
    }
}

async fn run<R, M>(
    config: LocalConfig,
    registry: R,
    blobs: FsBlobStore,
    bus: M,
    directory: JsonUserDirectory,
    tokens: TokenTable,
) where
    R: ResourceRegistry + Clone + 'static,
    M: DispatchPort + WorkerPort + Clone + 'static,
{
    // 3. Application Services
    let service = StaticResourceService::new(
        registry,
        blobs.clone(),
        bus.clone(),
        directory,
        config.delete_timeout,
    );

    let worker_service = Arc::new(WorkerService::new(
        bus,
        blobs,
        FfmpegTranscoder::new(&config.ffmpeg_path),
    ));

    // 4. Start Workers
    for kind in ResourceType::ALL {
        for i in 0..config.workers_per_type {
            let w = worker_service.clone();
            tokio::spawn(async move {
                w.run_worker_loop(i, kind).await;
            });
        }
    }
    info!(
        workers_per_type = config.workers_per_type,
        "started conversion workers"
    );

    let dispatcher = service.dispatcher().clone();
    tokio::spawn(async move {
        dispatcher.run_response_listener().await;
    });

    // 5. HTTP Layer
    let app = http::router(service, tokens);

    // 6. Start Server
    let bind = format!("{}:{}", config.addr, config.port);
    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %bind, error = %e, "failed to bind TCP listener");
            std::process::exit(1);
        }
    };
    info!(addr = %bind, "listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}
