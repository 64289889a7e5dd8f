//! # Hook Relay Service
//!
//! Binary entry point for the hook relay.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Builds the signature verifier, the chat bot sink and the dispatcher
//! - Starts the HTTP server from hook-relay-api
//!
//! Exit codes: 1 bind failure, 2 server failure, 3 configuration error.

use clap::Parser;
use hook_relay_api::{start_server, LoggingConfig, RelayConfig, ServiceError};
use hook_relay_core::{BotWebhookSink, SignatureVerifier, WebhookDispatcher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Relay GitHub webhooks to a group-chat bot.
#[derive(Debug, Parser)]
#[command(name = "hook-relay", version, about)]
struct Args {
    /// Configuration file (TOML), layered over the default locations
    #[arg(short, long, env = "HOOK_RELAY_CONFIG_FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Logging settings come from the configuration, so a load failure is
    // reported through a default subscriber.
    let config = match RelayConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!(error = %e, "Failed to load configuration; aborting");
            std::process::exit(3);
        }
    };

    init_tracing(&config.logging);

    info!(
        environment = config.environment.as_str(),
        "Starting hook relay"
    );

    if let Some(path) = &args.config {
        info!(path = %path.display(), "Loaded configuration from explicit path");
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration is invalid; aborting");
        std::process::exit(3);
    }

    let dispatcher = match build_dispatcher(&config) {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            error!(error = %e, "Failed to build webhook dispatcher; aborting");
            std::process::exit(3);
        }
    };

    if config.environment.exposes_docs() {
        warn!("Running in dev environment; API description is exposed at /docs");
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        endpoint = %config.webhook.endpoint_path,
        algorithm = %config.webhook.algorithm,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(config, dispatcher).await {
        error!("Failed to start server: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "hook_relay_service={level},hook_relay_api={level},hook_relay_core={level},tower_http=debug",
            level = logging.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_dispatcher(config: &RelayConfig) -> Result<WebhookDispatcher, Box<dyn std::error::Error>> {
    let verifier = SignatureVerifier::new(config.webhook.secret.clone(), config.webhook.algorithm);

    let sink = BotWebhookSink::new(
        config.sink_url()?,
        config.sink.timeout(),
        &config.sink.user_agent,
    )?;

    Ok(WebhookDispatcher::new(verifier, Arc::new(sink)))
}
