//! S3-compatible gateway: CLI entry point, router wiring, and process lifecycle.

use axum::{body::Body, http::Request, middleware, routing::get, Router};
use clap::Parser;
use manta_s3_gateway::api::handlers::{
    create_bucket, delete_bucket, delete_object, get_object, head_bucket, head_object,
    health_check, list_buckets, list_objects, metrics_handler, multipart_not_implemented,
    put_object_or_copy, AppState,
};
use manta_s3_gateway::backing_store::fs::{validate_xattr_support, FilesystemBackingStore};
use manta_s3_gateway::config::Config;
use manta_s3_gateway::metrics::{http_metrics_middleware, Metrics};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// An S3-compatible gateway fronting a hierarchical backing store.
#[derive(Parser, Debug)]
#[command(name = "manta_s3_gateway")]
#[command(version, author, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 0.0.0.0:9000.
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Enable verbose (trace-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("manta_s3_gateway=trace,tower_http=trace")
        } else {
            EnvFilter::new("manta_s3_gateway=info,tower_http=info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = cli
        .config
        .or_else(|| std::env::var("GATEWAY_CONFIG").ok().map(PathBuf::from));
    let mut config = Config::load(config_path.as_deref())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        build_time = env!("GATEWAY_BUILD_TIME"),
        "starting manta_s3_gateway"
    );
    info!(bucket_path = %config.bucket_path, "backing store root");

    let mut listen_addr = format!("0.0.0.0:{}", config.server_port);
    if let Some(addr) = cli.listen {
        listen_addr = addr;
        if let Some(port) = listen_addr.rsplit(':').next().and_then(|p| p.parse().ok()) {
            config.server_port = port;
        }
    }

    let bucket_path = PathBuf::from(&config.bucket_path);
    tokio::fs::create_dir_all(&bucket_path).await?;
    validate_xattr_support(&bucket_path)
        .await
        .map_err(|e| format!("backing store at {:?} failed startup validation: {e}", bucket_path))?;

    let store = Arc::new(FilesystemBackingStore::new(bucket_path, "gateway"));
    let durability_map = config.durability_map();

    let metrics = Arc::new(Metrics::new());
    metrics.process_start_time_seconds.set(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64(),
    );
    metrics
        .build_info
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    let state = Arc::new(AppState {
        store,
        config: config.clone(),
        durability_map,
        metrics,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/", get(list_buckets))
        .route(
            "/{bucket}",
            get(list_objects)
                .put(create_bucket)
                .delete(delete_bucket)
                .head(head_bucket)
                .post(|| async { multipart_not_implemented() }),
        )
        .route(
            "/{bucket}/{*key}",
            get(get_object)
                .put(put_object_or_copy)
                .delete(delete_object)
                .head(head_object)
                .post(|| async { multipart_not_implemented() }),
        )
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            // Every S3Error::into_response log line runs inside this span,
            // so its method/path fields satisfy the structured-logging
            // requirement without threading request context through every
            // handler's error path.
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        }))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            http_metrics_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(&listen_addr).await?;
    info!(addr = %listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("received SIGINT, shutting down"),
        _ = terminate => warn!("received SIGTERM, shutting down"),
    }
}
