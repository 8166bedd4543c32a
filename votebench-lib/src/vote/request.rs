use std::net::Ipv4Addr;

use rama::{
    error::{BoxError, ErrorContext as _},
    http::{
        Body, HeaderName, Method, Request, Uri,
        header::{CONTENT_TYPE, USER_AGENT},
    },
};
use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use crate::utils::env::perf_user_agent_product;

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// First two octets of every generated forwarded-for address
/// (198.18.0.0/15 is reserved for network benchmarking).
pub const FORWARDED_FOR_PREFIX: [u8; 2] = [198, 18];

/// JSON body of `POST /votos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePayload {
    pub paredao_id: String,
    pub participante_id: String,
}

/// Random client address within [`FORWARDED_FOR_PREFIX`],
/// both trailing octets drawn independently from `[0, 255]`.
pub fn random_forwarded_for<R: Rng + ?Sized>(rng: &mut R) -> Ipv4Addr {
    let [a, b] = FORWARDED_FOR_PREFIX;
    Ipv4Addr::new(a, b, rng.random(), rng.random())
}

/// `User-Agent` value which allows to trace a vote back to its virtual user.
pub fn user_agent_for(vu: super::VuId) -> String {
    format!("{}/{vu}", perf_user_agent_product())
}

pub(super) fn new_vote_request<R: Rng + ?Sized>(
    vote_uri: &Uri,
    paredao_id: &str,
    participante_ids: &[String],
    vu: super::VuId,
    rng: &mut R,
) -> Result<Request, BoxError> {
    let participante_id = participante_ids
        .choose(rng)
        .context("select random participante id")?;

    let body = serde_json::to_vec(&VotePayload {
        paredao_id: paredao_id.to_owned(),
        participante_id: participante_id.clone(),
    })
    .context("serialize vote payload as json")?;

    Request::builder()
        .method(Method::POST)
        .uri(vote_uri.clone())
        .header(CONTENT_TYPE, "application/json")
        .header(&X_FORWARDED_FOR, random_forwarded_for(rng).to_string())
        .header(USER_AGENT, user_agent_for(vu))
        .body(Body::from(body))
        .context("build vote request")
}
