use serde::{Deserialize, Serialize};

/// The unit of work carried on the message bus: one token generation request
/// for one project. Constructed at intake, serialized by the publisher,
/// decoded again by the worker. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGenerationRequest {
    pub project_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips_through_json() {
        let request = TokenGenerationRequest {
            project_id: "acme".into(),
        };

        let payload = serde_json::to_vec(&request).unwrap();
        let decoded: TokenGenerationRequest = serde_json::from_slice(&payload).unwrap();

        assert_eq!(decoded, request);
    }

    #[test]
    fn wire_format_uses_project_id_field() {
        let request = TokenGenerationRequest {
            project_id: "acme".into(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"project_id": "acme"}));
    }
}
