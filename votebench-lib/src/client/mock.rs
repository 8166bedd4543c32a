//! In-memory stand-in for the voting api,
//! only meant for automated testing.

use std::sync::Arc;

use parking_lot::Mutex;
use rama::{
    Service,
    error::BoxError,
    http::{
        BodyExtractExt as _, HeaderMap, HeaderName, Request, Response, StatusCode, Uri,
        header::{CONTENT_TYPE, USER_AGENT},
        service::web::response::IntoResponse,
    },
    telemetry::tracing,
};

use crate::vote::{VotePayload, X_FORWARDED_FOR};

#[derive(Debug, Clone, Copy)]
pub enum MockBehavior {
    /// Answer every vote with this status.
    Status(StatusCode),
    /// Fail every vote as if the connection could not be established.
    TransportError,
}

/// A vote as it was received by the [`MockVoteApi`].
#[derive(Debug, Clone)]
pub struct ReceivedVote {
    pub uri: Uri,
    pub content_type: Option<String>,
    pub user_agent: Option<String>,
    pub forwarded_for: Option<String>,
    pub payload: VotePayload,
}

#[derive(Debug, Clone)]
pub struct MockVoteApi {
    behavior: MockBehavior,
    received: Arc<Mutex<Vec<ReceivedVote>>>,
}

impl MockVoteApi {
    pub fn new(behavior: MockBehavior) -> Self {
        tracing::warn!(
            "Mock vote api created: do not use in production, only meant for automated testing!"
        );
        Self {
            behavior,
            received: Default::default(),
        }
    }

    /// Client which delivers its requests to this mock api.
    pub fn client(&self) -> MockVoteClient {
        MockVoteClient {
            api: self.clone(),
        }
    }

    /// Snapshot of all votes received so far, in arrival order.
    pub fn received(&self) -> Vec<ReceivedVote> {
        self.received.lock().clone()
    }

    /// Amount of requests served, including failed ones.
    pub fn call_count(&self) -> usize {
        self.received.lock().len()
    }
}

#[derive(Debug, Clone)]
pub struct MockVoteClient {
    api: MockVoteApi,
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
}

impl Service<Request> for MockVoteClient {
    type Output = Response;
    type Error = BoxError;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        let uri = req.uri().clone();
        let content_type = header_string(req.headers(), &CONTENT_TYPE);
        let user_agent = header_string(req.headers(), &USER_AGENT);
        let forwarded_for = header_string(req.headers(), &X_FORWARDED_FOR);

        let payload: VotePayload = req.try_into_json().await?;

        self.api.received.lock().push(ReceivedVote {
            uri,
            content_type,
            user_agent,
            forwarded_for,
            payload,
        });

        match self.api.behavior {
            MockBehavior::Status(status) => Ok(status.into_response()),
            MockBehavior::TransportError => Err(BoxError::from("mock: connection refused")),
        }
    }
}
