use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use token_generator::provider::{SonarClient, SonarConfig};
use token_generator::queue::{topology, GenerateTokenConsumer};
use token_generator::services::TokenGenerationService;
use token_generator::{config, queue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = config::load_worker()?;

    let (_connection, channel) = queue::connect(&cfg.amqp_url).await?;
    topology::declare_topic_if_not_exists(&channel, &cfg.topic).await?;
    topology::declare_subscription_if_not_exists(&channel, &cfg.topic, &cfg.subscription).await?;

    let provider = SonarClient::new(SonarConfig {
        base_url: cfg.sonar_api_address.clone(),
        auth_token: cfg.sonar_auth_token.clone(),
        timeout: Some(cfg.sonar_api_timeout),
    });
    let service = Arc::new(TokenGenerationService::new(provider));
    let consumer = Arc::new(GenerateTokenConsumer::new(
        channel,
        cfg.subscription.clone(),
        service,
    ));

    let run = tokio::spawn({
        let consumer = Arc::clone(&consumer);
        async move { consumer.start().await }
    });

    tracing::info!(
        topic = %cfg.topic,
        subscription = %cfg.subscription,
        "consumer started"
    );

    tokio::select! {
        _ = shutdown_signal() => {
            consumer.stop(cfg.shutdown_grace).await?;
            tracing::info!("consumer stopped gracefully");
        }
        result = run => {
            // The receive loop failed on its own; surface it so the process
            // supervisor can decide whether to restart.
            result??;
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "token_generator=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("received termination signal");
}
