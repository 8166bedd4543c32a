/// Mock voting api behavior configuration.
/// This models processing cost and instability.
#[derive(Debug, Clone, clap::Args, Default)]
pub struct ServerConfig {
    /// Base processing time before responding.
    #[arg(long, value_name = "SECONDS")]
    pub base_latency: Option<f64>,

    /// Random delay added to base_latency.
    /// Models IO waits and backend variability.
    #[arg(long, value_name = "SECONDS")]
    pub jitter: Option<f64>,

    /// Probability of returning an internal server error (500).
    #[arg(long)]
    pub error_rate: Option<f32>,

    /// Probability of rejecting the vote as rate limited (429).
    #[arg(long)]
    pub reject_rate: Option<f32>,

    /// Status returned for an accepted vote.
    #[arg(long, value_name = "STATUS")]
    pub accept_status: Option<u16>,
}
