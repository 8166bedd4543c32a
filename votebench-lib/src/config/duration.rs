use std::time::Duration;

/// Human-friendly time parser.
///
/// Some examples are "30s", "1m 30s", "1m_30s" and "500us".
/// A bare "0" is accepted as zero.
pub fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    let s = s.trim();
    if s.contains('_') {
        humantime::parse_duration(&s.replace('_', " "))
    } else {
        humantime::parse_duration(s)
    }
}
