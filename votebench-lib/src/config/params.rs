use rama::http::Uri;

use super::ConfigError;

/// Path, relative to the api base, to which votes are posted.
const VOTE_PATH: &str = "/votos";

/// Parameters shared (read-only) by every generated vote request.
#[derive(Debug, Clone)]
pub struct RunParameters {
    api_base: String,
    vote_uri: Uri,
    paredao_id: String,
    participante_ids: Vec<String>,
}

impl RunParameters {
    pub const DEFAULT_API_BASE: &'static str = "http://localhost:8080";

    /// Validate the raw (environment supplied) run parameters.
    ///
    /// - `paredao_id` has to be present and non-empty;
    /// - `participante_ids` is a comma separated list that has to
    ///   contain at least two non-empty ids;
    /// - `api_base` has to be an absolute http(s) uri.
    pub fn try_new(
        api_base: &str,
        paredao_id: Option<&str>,
        participante_ids: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let paredao_id = paredao_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::MissingParedaoId)?
            .to_owned();

        let participante_ids = parse_participante_ids(participante_ids.unwrap_or_default());
        if participante_ids.len() < 2 {
            return Err(ConfigError::NotEnoughParticipantes {
                found: participante_ids.len(),
            });
        }

        let api_base = api_base.trim().trim_end_matches('/').to_owned();
        let vote_uri = vote_uri_from_api_base(&api_base)?;

        Ok(Self {
            api_base,
            vote_uri,
            paredao_id,
            participante_ids,
        })
    }

    /// Api base uri, without trailing slash.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Fully resolved `{api_base}/votos` uri.
    pub fn vote_uri(&self) -> &Uri {
        &self.vote_uri
    }

    pub fn paredao_id(&self) -> &str {
        &self.paredao_id
    }

    /// Guaranteed to contain at least two ids.
    pub fn participante_ids(&self) -> &[String] {
        &self.participante_ids
    }
}

/// Split a comma separated list of participante ids,
/// trimming whitespace and dropping empty entries.
pub fn parse_participante_ids(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn vote_uri_from_api_base(api_base: &str) -> Result<Uri, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidApiBase {
        value: api_base.to_owned(),
        reason,
    };

    // a fragment would swallow the appended vote path
    if api_base.contains('#') {
        return Err(invalid("fragment not supported".to_owned()));
    }

    let base: Uri = api_base.parse().map_err(|err| invalid(format!("{err}")))?;
    match base.scheme_str() {
        Some("http" | "https") => (),
        Some(other) => return Err(invalid(format!("unsupported scheme '{other}'"))),
        None => return Err(invalid("missing scheme".to_owned())),
    }
    if base.authority().is_none() {
        return Err(invalid("missing host".to_owned()));
    }
    if base.query().is_some() {
        return Err(invalid("query not supported".to_owned()));
    }

    format!("{api_base}{VOTE_PATH}")
        .parse()
        .map_err(|err| invalid(format!("{err}")))
}
