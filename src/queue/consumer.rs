use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicConsumeOptions};
use lapin::types::FieldTable;
use lapin::Channel;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::TokenGenerationRequest;
use crate::services::GenerateTokenUseCase;

const CONSUMER_TAG: &str = "generate-token-worker";

/// One-shot start/stop coordination between the receive loop and the thread
/// that requests shutdown. `stop` cancels the loop; `done` fires once when the
/// loop has fully exited. The atomic flag makes a second stop request a no-op
/// instead of a race on the signaling primitive.
struct ShutdownSignal {
    stop: CancellationToken,
    done: CancellationToken,
    stop_requested: AtomicBool,
}

impl ShutdownSignal {
    fn new() -> Self {
        Self {
            stop: CancellationToken::new(),
            done: CancellationToken::new(),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Cancels the receive loop. Returns `true` only for the first caller.
    fn request_stop(&self) -> bool {
        if self.stop_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.stop.cancel();
        true
    }

    fn mark_done(&self) {
        self.done.cancel();
    }

    async fn wait_done(&self, grace: Duration) -> Result<(), AppError> {
        tokio::time::timeout(grace, self.done.cancelled())
            .await
            .map_err(|_| AppError::StopTimeout)
    }
}

/// Bridges the subscription's delivery stream to the token generation service.
///
/// The subscription handle is owned exclusively by this consumer: `start` must
/// be invoked once, and drives the only receive loop for the instance. `start`
/// and `stop` are expected to run on different tasks and communicate solely
/// through one-shot signals.
pub struct GenerateTokenConsumer {
    channel: Channel,
    subscription: String,
    use_case: Arc<dyn GenerateTokenUseCase>,
    shutdown: ShutdownSignal,
}

impl GenerateTokenConsumer {
    pub fn new(
        channel: Channel,
        subscription: impl Into<String>,
        use_case: Arc<dyn GenerateTokenUseCase>,
    ) -> Self {
        Self {
            channel,
            subscription: subscription.into(),
            use_case,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Runs the receive loop until a stop is requested or the transport fails.
    ///
    /// Cancellation is the expected stop path and returns `Ok`; any other
    /// failure of the delivery stream is logged and returned. On exit, either
    /// way, the run-phase completion signal fires exactly once — this is what
    /// [`GenerateTokenConsumer::stop`] waits on.
    pub async fn start(&self) -> Result<(), AppError> {
        let result = self.receive_loop().await;
        if let Err(ref e) = result {
            error!("error receiving messages: {e}");
        }
        self.shutdown.mark_done();
        result
    }

    /// Initiates graceful shutdown: stops polling for new messages, then waits
    /// up to `grace` for the receive loop (and any in-flight handler) to
    /// finish. Returns [`AppError::StopTimeout`] if it does not finish in
    /// time. Safe to call more than once; later calls only wait.
    pub async fn stop(&self, grace: Duration) -> Result<(), AppError> {
        self.shutdown.request_stop();
        self.shutdown.wait_done(grace).await
    }

    async fn receive_loop(&self) -> Result<(), AppError> {
        let mut deliveries = self
            .channel
            .basic_consume(
                &self.subscription,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        loop {
            tokio::select! {
                _ = self.shutdown.stop.cancelled() => return Ok(()),
                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => self.handle_delivery(delivery).await,
                    Some(Err(e)) => return Err(AppError::Transport(e)),
                    None => {
                        if self.shutdown.stop.is_cancelled() {
                            return Ok(());
                        }
                        return Err(AppError::SubscriptionClosed);
                    }
                },
            }
        }
    }

    async fn handle_delivery(&self, delivery: Delivery) {
        handle_message(self.use_case.as_ref(), &delivery.data, &delivery).await;
    }
}

/// The one thing the handler needs from the transport: mark a delivered
/// message as fully handled so it is never redelivered.
#[async_trait]
trait Acknowledge: Send + Sync {
    async fn acknowledge(&self) -> Result<(), lapin::Error>;
}

#[async_trait]
impl Acknowledge for Delivery {
    async fn acknowledge(&self) -> Result<(), lapin::Error> {
        self.ack(BasicAckOptions::default()).await
    }
}

/// Handles one delivered message and acknowledges it.
///
/// Exactly one acknowledgment per delivery, on every path. Redelivery is
/// never wanted here; routing failures to a dead letter is the broker's
/// responsibility, not this consumer's.
async fn handle_message(
    use_case: &dyn GenerateTokenUseCase,
    payload: &[u8],
    ack: &dyn Acknowledge,
) {
    match process_payload(use_case, payload).await {
        Ok((project_id, token)) => {
            info!(%project_id, %token, "token generated");
        }
        Err(e @ AppError::Decode(_)) => {
            // A malformed message can never succeed; drop it.
            error!("failed to decode message: {e}");
        }
        Err(e) => {
            error!("failed to generate token: {e}");
        }
    }

    if let Err(e) = ack.acknowledge().await {
        error!("failed to acknowledge message: {e}");
    }
}

/// Decodes one message payload and drives token generation for it.
async fn process_payload(
    use_case: &dyn GenerateTokenUseCase,
    payload: &[u8],
) -> Result<(String, String), AppError> {
    let request: TokenGenerationRequest =
        serde_json::from_slice(payload).map_err(AppError::Decode)?;

    let project_id = request.project_id.clone();
    let token = use_case.generate_token(request).await?;
    Ok((project_id, token))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;

    struct StubUseCase {
        token: Option<String>,
    }

    #[async_trait]
    impl GenerateTokenUseCase for StubUseCase {
        async fn generate_token(
            &self,
            request: TokenGenerationRequest,
        ) -> Result<String, AppError> {
            if request.project_id.trim().is_empty() {
                return Err(AppError::BlankProjectId);
            }
            match &self.token {
                Some(token) => Ok(token.clone()),
                None => Err(AppError::Provider(anyhow::anyhow!("provider down"))),
            }
        }
    }

    #[tokio::test]
    async fn process_payload_decodes_and_generates() {
        let use_case = StubUseCase {
            token: Some("tok-123".into()),
        };

        let (project_id, token) = process_payload(&use_case, br#"{"project_id":"acme"}"#)
            .await
            .unwrap();

        assert_eq!(project_id, "acme");
        assert_eq!(token, "tok-123");
    }

    #[tokio::test]
    async fn process_payload_rejects_malformed_message() {
        let use_case = StubUseCase {
            token: Some("tok".into()),
        };

        let err = process_payload(&use_case, br#"{"project_id": "#)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Decode(_)));
    }

    #[tokio::test]
    async fn process_payload_surfaces_service_errors() {
        let use_case = StubUseCase { token: None };

        let err = process_payload(&use_case, br#"{"project_id":"acme"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Provider(_)));
    }

    #[tokio::test]
    async fn process_payload_revalidates_blank_project_id() {
        let use_case = StubUseCase {
            token: Some("tok".into()),
        };

        let err = process_payload(&use_case, br#"{"project_id":"   "}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BlankProjectId));
    }

    #[derive(Default)]
    struct CountingAck {
        acks: AtomicUsize,
    }

    #[async_trait]
    impl Acknowledge for CountingAck {
        async fn acknowledge(&self) -> Result<(), lapin::Error> {
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn every_message_is_acknowledged_exactly_once() {
        // Success, malformed payload, provider failure: the outcome never
        // changes the acknowledgment.
        let cases: [(StubUseCase, &[u8]); 3] = [
            (
                StubUseCase {
                    token: Some("tok-123".into()),
                },
                br#"{"project_id":"acme"}"#,
            ),
            (
                StubUseCase {
                    token: Some("tok-123".into()),
                },
                br#"{"project_id": "#,
            ),
            (StubUseCase { token: None }, br#"{"project_id":"acme"}"#),
        ];

        for (use_case, payload) in cases {
            let ack = CountingAck::default();

            handle_message(&use_case, payload, &ack).await;

            assert_eq!(ack.acks.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn only_the_first_stop_request_signals() {
        let shutdown = ShutdownSignal::new();

        assert!(shutdown.request_stop());
        assert!(!shutdown.request_stop());
        assert!(shutdown.stop.is_cancelled());
    }

    #[tokio::test]
    async fn wait_done_returns_once_loop_completes() {
        let shutdown = ShutdownSignal::new();

        shutdown.mark_done();

        shutdown
            .wait_done(Duration::from_secs(5))
            .await
            .expect("done signal already fired");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_done_times_out_when_loop_never_completes() {
        let shutdown = ShutdownSignal::new();

        let err = shutdown
            .wait_done(Duration::from_secs(5))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::StopTimeout));
    }

    #[tokio::test]
    async fn wait_done_observes_completion_from_another_task() {
        let shutdown = Arc::new(ShutdownSignal::new());

        let waiter = {
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move { shutdown.wait_done(Duration::from_secs(5)).await })
        };

        shutdown.mark_done();

        waiter.await.unwrap().expect("waiter should observe done");
    }
}
