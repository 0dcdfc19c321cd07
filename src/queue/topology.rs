//! Idempotent "create if missing" provisioning for the bus topology.
//!
//! A topic maps to a durable fanout exchange; a subscription maps to a durable
//! queue bound to that exchange. AMQP declares are idempotent, so these are
//! safe to run on every startup from both binaries.

use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, ExchangeKind};

pub async fn declare_topic_if_not_exists(
    channel: &Channel,
    topic: &str,
) -> Result<(), lapin::Error> {
    channel
        .exchange_declare(
            topic,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions {
                durable: true,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
}

pub async fn declare_subscription_if_not_exists(
    channel: &Channel,
    topic: &str,
    subscription: &str,
) -> Result<(), lapin::Error> {
    channel
        .queue_declare(
            subscription,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            subscription,
            topic,
            "",
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
}
