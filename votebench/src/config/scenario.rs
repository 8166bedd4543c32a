use super::ServerConfig;

/// Mock voting api presets.
#[derive(Debug, Clone, Copy, clap::ValueEnum, Default)]
pub enum Scenario {
    /// Ideal conditions.
    /// Used to measure the overhead of the load generator itself.
    #[default]
    Baseline,

    /// Variable processing time per vote.
    /// Used to observe vu pool growth and tail latency.
    LatencyJitter,

    /// Unstable upstream behavior.
    /// Used to verify that failed checks never abort a run.
    FlakyUpstream,
}

impl Scenario {
    /// Construct the concrete server configuration
    /// associated with this scenario.
    pub fn server_config(self) -> ServerConfig {
        match self {
            Scenario::Baseline => {
                // Fast and fully reliable, votes are queued for async processing.
                ServerConfig {
                    base_latency: Some(0.002),
                    jitter: None,
                    error_rate: None,
                    reject_rate: None,
                    accept_status: Some(202),
                }
            }

            Scenario::LatencyJitter => {
                // Processing time varies per vote,
                // long enough to push the pool beyond its pre-allocated vus.
                ServerConfig {
                    base_latency: Some(0.05),
                    jitter: Some(0.25),
                    error_rate: None,
                    reject_rate: None,
                    accept_status: Some(202),
                }
            }

            Scenario::FlakyUpstream => {
                // Server occasionally errors or rate limits.
                ServerConfig {
                    base_latency: Some(0.1),
                    jitter: Some(0.5),
                    error_rate: Some(0.05),
                    reject_rate: Some(0.05),
                    accept_status: Some(200),
                }
            }
        }
    }
}
