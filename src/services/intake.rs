use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::TokenGenerationRequest;

/// Capability the intake service needs from the bus: durably accept one
/// generation request. Implemented by the AMQP publisher; substituted with a
/// recording double in tests.
#[async_trait]
pub trait RequestTokenGenerationPublisher: Send + Sync {
    async fn publish_request_token_generation(
        &self,
        request: &TokenGenerationRequest,
    ) -> Result<(), AppError>;
}

/// The operation the HTTP layer drives.
#[async_trait]
pub trait RequestTokenGenerationUseCase: Send + Sync {
    async fn request_token_generation(&self, project_id: &str) -> Result<(), AppError>;
}

/// Validates a project identifier, builds the canonical request and hands it
/// to the publisher. Exactly one publish attempt per call; retry, if any, is
/// the caller's or transport's responsibility.
pub struct RequestTokenGenerationService<P> {
    publisher: P,
}

impl<P> RequestTokenGenerationService<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl<P> RequestTokenGenerationUseCase for RequestTokenGenerationService<P>
where
    P: RequestTokenGenerationPublisher,
{
    async fn request_token_generation(&self, project_id: &str) -> Result<(), AppError> {
        if project_id.trim().is_empty() {
            return Err(AppError::BlankProjectId);
        }

        self.publisher
            .publish_request_token_generation(&TokenGenerationRequest {
                project_id: project_id.to_owned(),
            })
            .await
    }
}
