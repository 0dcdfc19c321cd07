use async_trait::async_trait;
use chrono::Utc;

use crate::errors::AppError;
use crate::models::TokenGenerationRequest;

/// The single capability the core needs from the external token provider.
/// The provider client owns authentication, retries and timeouts; any error
/// it returns is opaque and non-retryable at this level.
#[async_trait]
pub trait AnalysisTokenProvider: Send + Sync {
    async fn generate_project_analysis_token(
        &self,
        project_id: &str,
        token_name: &str,
    ) -> anyhow::Result<String>;
}

/// The operation the consumer drives for every delivered message.
#[async_trait]
pub trait GenerateTokenUseCase: Send + Sync {
    async fn generate_token(&self, request: TokenGenerationRequest) -> Result<String, AppError>;
}

/// Validates a queued generation request and drives token generation against
/// the provider.
pub struct TokenGenerationService<R> {
    provider: R,
}

impl<R> TokenGenerationService<R> {
    pub fn new(provider: R) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R> GenerateTokenUseCase for TokenGenerationService<R>
where
    R: AnalysisTokenProvider,
{
    async fn generate_token(&self, request: TokenGenerationRequest) -> Result<String, AppError> {
        // At-least-once delivery means a replayed or malformed message can
        // bypass intake validation, so the check is repeated here.
        if request.project_id.trim().is_empty() {
            return Err(AppError::BlankProjectId);
        }

        // Timestamped name so repeated requests for one project never collide.
        let token_name = format!(
            "{}-analysis-{}",
            request.project_id,
            Utc::now().timestamp_millis()
        );

        self.provider
            .generate_project_analysis_token(&request.project_id, &token_name)
            .await
            .map_err(AppError::Provider)
    }
}
