use std::time::Duration;

#[derive(Debug)]
pub struct HttpServiceConfig {
    pub server_addr: String,
    pub amqp_url: String,
    pub topic: String,
}

#[derive(Debug)]
pub struct WorkerConfig {
    pub amqp_url: String,
    pub topic: String,
    pub subscription: String,
    pub sonar_api_address: String,
    pub sonar_auth_token: String,
    pub sonar_api_timeout: Duration,
    /// How long `worker` waits for the consumer to drain on shutdown.
    pub shutdown_grace: Duration,
}

pub fn load_httpservice() -> anyhow::Result<HttpServiceConfig> {
    dotenvy::dotenv().ok();

    Ok(HttpServiceConfig {
        server_addr: env_or("SERVER_ADDR", "0.0.0.0:3000"),
        amqp_url: env_or("AMQP_URL", "amqp://127.0.0.1:5672"),
        topic: env_or("TOKEN_GENERATION_TOPIC", "token_generation_topic"),
    })
}

pub fn load_worker() -> anyhow::Result<WorkerConfig> {
    dotenvy::dotenv().ok();

    let sonar_auth_token = std::env::var("SONAR_AUTH_TOKEN")
        .map_err(|_| anyhow::anyhow!("SONAR_AUTH_TOKEN is required"))?;

    Ok(WorkerConfig {
        amqp_url: env_or("AMQP_URL", "amqp://127.0.0.1:5672"),
        topic: env_or("TOKEN_GENERATION_TOPIC", "token_generation_topic"),
        subscription: env_or(
            "TOKEN_GENERATION_SUBSCRIPTION",
            "token_generation_subscription",
        ),
        sonar_api_address: env_or("SONAR_API_ADDRESS", "http://localhost:9000"),
        sonar_auth_token,
        sonar_api_timeout: env_secs("SONAR_API_TIMEOUT_SECS", 30)?,
        shutdown_grace: env_secs("SHUTDOWN_GRACE_SECS", 5)?,
    })
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// A missing variable falls back to the default; a present but unparsable
/// value is a configuration mistake and fails startup.
fn env_secs(name: &str, default: u64) -> anyhow::Result<Duration> {
    let secs = match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{name} must be a whole number of seconds, got {raw:?}"))?,
        Err(_) => default,
    };
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable name so they stay independent when run
    // in parallel.

    #[test]
    fn env_secs_defaults_when_variable_is_missing() {
        let secs = env_secs("CONFIG_TEST_MISSING_SECS", 30).unwrap();
        assert_eq!(secs, Duration::from_secs(30));
    }

    #[test]
    fn env_secs_parses_present_value() {
        std::env::set_var("CONFIG_TEST_VALID_SECS", "7");
        let secs = env_secs("CONFIG_TEST_VALID_SECS", 30).unwrap();
        std::env::remove_var("CONFIG_TEST_VALID_SECS");

        assert_eq!(secs, Duration::from_secs(7));
    }

    #[test]
    fn env_secs_rejects_unparsable_value() {
        std::env::set_var("CONFIG_TEST_BAD_SECS", "soon");
        let err = env_secs("CONFIG_TEST_BAD_SECS", 30).unwrap_err();
        std::env::remove_var("CONFIG_TEST_BAD_SECS");

        let msg = err.to_string();
        assert!(msg.contains("CONFIG_TEST_BAD_SECS"));
        assert!(msg.contains("soon"));
    }
}
