pub mod sonar;

pub use sonar::{SonarClient, SonarConfig, TokenGenerationParams};
