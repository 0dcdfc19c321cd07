pub mod generation;
pub mod intake;

pub use generation::{AnalysisTokenProvider, GenerateTokenUseCase, TokenGenerationService};
pub use intake::{
    RequestTokenGenerationPublisher, RequestTokenGenerationService, RequestTokenGenerationUseCase,
};
