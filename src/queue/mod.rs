use lapin::options::ConfirmSelectOptions;
use lapin::{Channel, Connection, ConnectionProperties};

pub mod consumer;
pub mod publisher;
pub mod topology;

pub use consumer::GenerateTokenConsumer;
pub use publisher::AmqpRequestTokenGenerationPublisher;

/// Open a connection and a channel with publisher confirms enabled.
///
/// The returned `Connection` must be kept alive for the lifetime of the
/// channel; dropping it tears the channel down with it.
pub async fn connect(amqp_url: &str) -> Result<(Connection, Channel), lapin::Error> {
    let connection = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;
    channel
        .confirm_select(ConfirmSelectOptions::default())
        .await?;
    Ok((connection, channel))
}
