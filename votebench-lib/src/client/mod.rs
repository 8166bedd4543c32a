//! centralized (web) client creation
//!
//! All vote traffic goes through the client created here,
//! so that tests can swap it for the in-memory [`mock`] voting api
//! without touching the generator.
//!
//! The client never retries: each scheduled vote is a single attempt.

use std::time::Duration;

use rama::{
    Layer as _, Service as _,
    error::{BoxError, ErrorContext as _},
    http::{
        Request, Response,
        client::EasyHttpWebClient,
        layer::{
            map_request_body::MapRequestBodyLayer, map_response_body::MapResponseBodyLayer,
        },
    },
    layer::TimeoutLayer,
    rt::Executor,
    service::BoxService,
};

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[derive(Debug, Clone)]
pub struct WebClientConfig {
    /// Time after which a vote without response is considered failed.
    pub request_timeout: Duration,
}

impl WebClientConfig {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
}

impl Default for WebClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Create a new web client that can be cloned and shared
/// by all virtual users.
pub fn new_web_client(
    exec: Executor,
    cfg: WebClientConfig,
) -> Result<BoxService<Request, Response, BoxError>, BoxError> {
    let inner_https_client = EasyHttpWebClient::connector_builder()
        .with_default_transport_connector()
        .without_tls_proxy_support()
        .without_proxy_support()
        .with_tls_support_using_boringssl(None)
        .with_default_http_connector(exec)
        .try_with_default_connection_pool()
        .context("create connection pool for vote web client")?
        .build_client();

    let client = (
        MapResponseBodyLayer::new_boxed_streaming_body(),
        TimeoutLayer::new(cfg.request_timeout),
        MapRequestBodyLayer::new_boxed_streaming_body(),
    )
        .into_layer(inner_https_client);

    Ok(client.boxed())
}
