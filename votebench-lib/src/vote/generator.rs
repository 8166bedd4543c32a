use std::{sync::Arc, time::Duration};

use rama::{
    Service,
    error::BoxError,
    http::{Request, Response},
    telemetry::tracing,
};
use rand::Rng;

use crate::config::RunParameters;

use super::{CheckOutcome, Iteration, VuId, check::check_vote_response, request::new_vote_request};

/// Generates and submits one vote per invocation.
///
/// Holds no mutable state: all invocations, on any virtual user,
/// share the same read-only [`RunParameters`] and draw their own
/// randomness.
#[derive(Debug, Clone)]
pub struct VoteGenerator<C> {
    client: C,
    params: Arc<RunParameters>,
    think_time: Duration,
}

impl<C> VoteGenerator<C> {
    /// Pause applied after each vote before control returns to the driver.
    pub const DEFAULT_THINK_TIME: Duration = Duration::from_millis(1);

    pub fn new(client: C, params: Arc<RunParameters>) -> Self {
        Self {
            client,
            params,
            think_time: Self::DEFAULT_THINK_TIME,
        }
    }

    /// Overwrite the default think time, [`Duration::ZERO`] disables it.
    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    pub fn params(&self) -> &RunParameters {
        &self.params
    }

    pub fn think_time(&self) -> Duration {
        self.think_time
    }

    /// Build the vote request for the given virtual user,
    /// using the thread local rng.
    pub fn generate_vote_request(&self, vu: VuId) -> Result<Request, BoxError> {
        self.generate_vote_request_with_rng(vu, &mut rand::rng())
    }

    pub fn generate_vote_request_with_rng<R: Rng + ?Sized>(
        &self,
        vu: VuId,
        rng: &mut R,
    ) -> Result<Request, BoxError> {
        new_vote_request(
            self.params.vote_uri(),
            self.params.paredao_id(),
            self.params.participante_ids(),
            vu,
            rng,
        )
    }
}

impl<C> Iteration for VoteGenerator<C>
where
    C: Service<Request, Output = Response, Error = BoxError>,
{
    async fn iterate(&self, vu: VuId) -> CheckOutcome {
        let outcome = match self.generate_vote_request(vu) {
            Ok(req) => {
                let result = self.client.serve(req).await;
                if let Err(err) = &result {
                    tracing::debug!(%vu, "vote request failed: {err}");
                }
                check_vote_response(&result)
            }
            Err(err) => {
                tracing::error!(%vu, "failed to generate vote request: {err}");
                CheckOutcome::transport_failure()
            }
        };

        if !self.think_time.is_zero() {
            tokio::time::sleep(self.think_time).await;
        }

        outcome
    }
}
