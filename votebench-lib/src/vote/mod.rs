//! Vote request generation.
//!
//! A [`VoteGenerator`] turns the (immutable) [`RunParameters`] into one
//! `POST {api_base}/votos` per invocation and checks the response status.
//! It never schedules itself: whatever drives the load invokes it through
//! the [`Iteration`] trait, once per scheduled arrival.
//!
//! [`RunParameters`]: crate::config::RunParameters

use std::fmt;

mod check;
mod generator;
mod request;

pub use self::{
    check::{CheckOutcome, FailureKind, VOTE_CHECK_NAME, check_vote_response, is_accepted_vote_status},
    generator::VoteGenerator,
    request::{
        FORWARDED_FOR_PREFIX, VotePayload, X_FORWARDED_FOR, random_forwarded_for, user_agent_for,
    },
};

/// Identifier of a virtual user, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VuId(u32);

impl VuId {
    #[inline(always)]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A unit of work executed once per scheduled arrival,
/// on behalf of the virtual user that picked it up.
///
/// Implementations must not assume anything about other
/// concurrent invocations, nor about their order.
pub trait Iteration: Send + Sync + 'static {
    fn iterate(&self, vu: VuId) -> impl Future<Output = CheckOutcome> + Send + '_;
}
