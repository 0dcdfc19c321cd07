use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use token_generator::queue::topology;
use token_generator::services::RequestTokenGenerationService;
use token_generator::{api, config, queue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = config::load_httpservice()?;

    let (_connection, channel) = queue::connect(&cfg.amqp_url).await?;
    topology::declare_topic_if_not_exists(&channel, &cfg.topic).await?;

    let publisher = queue::AmqpRequestTokenGenerationPublisher::new(channel, cfg.topic.clone());
    let intake = RequestTokenGenerationService::new(publisher);

    let state = Arc::new(api::AppState {
        intake: Arc::new(intake),
    });
    let app = api::api_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.server_addr).await?;
    tracing::info!(addr = %cfg.server_addr, topic = %cfg.topic, "httpservice listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("httpservice stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "token_generator=debug,tower_http=debug".into()),
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
