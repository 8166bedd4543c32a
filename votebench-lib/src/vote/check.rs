use rama::{
    error::BoxError,
    http::{Response, StatusCode},
};

pub const VOTE_CHECK_NAME: &str = "status 202 or 200";

/// The voting api either accepts the vote for async processing (202)
/// or processed it right away (200), anything else is a failure.
#[inline(always)]
pub fn is_accepted_vote_status(status: StatusCode) -> bool {
    status == StatusCode::ACCEPTED || status == StatusCode::OK
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A response was received, but with an unexpected status.
    HttpStatus,
    /// No response was received (connect, timeout, protocol, ...).
    Transport,
}

/// Observational result of a single vote, never used for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    pub passed: bool,
    pub status: Option<u16>,
    pub failure: Option<FailureKind>,
}

impl CheckOutcome {
    pub fn from_status(status: StatusCode) -> Self {
        if is_accepted_vote_status(status) {
            Self {
                passed: true,
                status: Some(status.as_u16()),
                failure: None,
            }
        } else {
            Self {
                passed: false,
                status: Some(status.as_u16()),
                failure: Some(FailureKind::HttpStatus),
            }
        }
    }

    pub fn transport_failure() -> Self {
        Self {
            passed: false,
            status: None,
            failure: Some(FailureKind::Transport),
        }
    }
}

pub fn check_vote_response(result: &Result<Response, BoxError>) -> CheckOutcome {
    match result {
        Ok(resp) => CheckOutcome::from_status(resp.status()),
        Err(_) => CheckOutcome::transport_failure(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rama::http::Body;

    fn response(status: u16) -> Result<Response, BoxError> {
        Ok(Response::builder()
            .status(status)
            .body(Body::empty())
            .unwrap())
    }

    #[test]
    fn test_check_vote_response() {
        for (status, passed) in [
            (200, true),
            (202, true),
            (201, false),
            (204, false),
            (302, false),
            (400, false),
            (409, false),
            (429, false),
            (500, false),
            (503, false),
        ] {
            let outcome = check_vote_response(&response(status));
            assert_eq!(outcome.passed, passed, "status: {status}");
            assert_eq!(outcome.status, Some(status), "status: {status}");
            if passed {
                assert_eq!(outcome.failure, None, "status: {status}");
            } else {
                assert_eq!(outcome.failure, Some(FailureKind::HttpStatus), "status: {status}");
            }
        }
    }

    #[test]
    fn test_check_vote_transport_error() {
        let result: Result<Response, BoxError> = Err(BoxError::from("connection refused"));
        assert_eq!(
            check_vote_response(&result),
            CheckOutcome {
                passed: false,
                status: None,
                failure: Some(FailureKind::Transport),
            }
        );
    }
}
