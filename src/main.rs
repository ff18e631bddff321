//! Kube Tagger
//!
//! Watches PersistentVolumeClaims and tags their EBS volumes with the pairs
//! declared in the `volume.beta.kubernetes.io/additional-resource-tags`
//! annotation.

use anyhow::Context;
use clap::Parser;
use prometheus::Registry;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kube_tagger::{
    build_client, ClaimController, ClientConfig, ControllerConfig, Ec2TagStore, Error,
    KubeVolumeResolver, TaggerMetrics, TelemetryConfig, TelemetryServer,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Kube Tagger - EBS volume tags from PersistentVolumeClaim annotations
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, env = "DEBUG")]
    debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Run locally for development, outside the cluster
    #[arg(long, env = "LOCAL")]
    local: bool,

    /// Path to kubeconfig (used with --local)
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Don't actually tag the volumes
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Only watch claims in this namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Metrics server bind address
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:2112")]
    metrics_addr: String,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args)?;

    info!("Starting Kube Tagger");
    info!("  Version: {}", kube_tagger::VERSION);
    info!("  Metrics: {}", args.metrics_addr);
    info!("  Namespace: {}", args.namespace.as_deref().unwrap_or("all"));
    info!("  Dry run: {}", args.dry_run);
    info!("  Local mode: {}", args.local);

    let metrics_addr: SocketAddr = args
        .metrics_addr
        .parse()
        .map_err(|e| Error::Configuration(format!("Invalid metrics address: {}", e)))?;

    // Counters and their scrape endpoint
    let registry = Registry::new();
    let metrics = TaggerMetrics::new(&registry).context("Error registering metrics")?;

    let telemetry = Arc::new(TelemetryServer::new(
        TelemetryConfig { addr: metrics_addr },
        registry,
        metrics.clone(),
        args.dry_run,
    ));
    let server = telemetry.clone();
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Telemetry server error: {}", e);
        }
    });

    // External APIs
    let client = build_client(&ClientConfig {
        local: args.local,
        kubeconfig: args.kubeconfig.clone(),
    })
    .await
    .context("Error creating Kubernetes client")?;

    let store = Arc::new(Ec2TagStore::from_env().await);
    let resolver = Arc::new(KubeVolumeResolver::new(client.clone()));

    let controller = ClaimController::new(
        ControllerConfig {
            namespace: args.namespace.clone(),
            dry_run: args.dry_run,
        },
        resolver,
        store,
        metrics,
    );

    let result = tokio::select! {
        result = controller.watch(client) => result.context("Volume claim watch failed"),
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    telemetry.shutdown();
    info!("Kube Tagger stopped");
    result
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = if args.debug {
        Level::DEBUG
    } else {
        match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("kube=info".parse()?)
        .add_directive("tower=warn".parse()?)
        .add_directive("aws_config=warn".parse()?)
        .add_directive("aws_smithy_runtime=warn".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

// =============================================================================
// Shutdown
// =============================================================================

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
