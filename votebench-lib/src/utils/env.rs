pub const fn server_identifier() -> &'static str {
    concat!("votebench/", env!("CARGO_PKG_VERSION"))
}

/// Product token used in the `User-Agent` of generated votes,
/// the virtual user id is appended as the version part.
pub const fn perf_user_agent_product() -> &'static str {
    "votebench-perf"
}
