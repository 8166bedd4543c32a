use std::fmt;

/// Fatal configuration problems, raised before any load is generated.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ConfigError {
    MissingParedaoId,
    NotEnoughParticipantes { found: usize },
    InvalidApiBase { value: String, reason: String },
    ZeroRate,
    ZeroDuration,
    ZeroMaxVus,
    PreAllocatedVusExceedMax { pre_allocated: u32, max: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingParedaoId => {
                write!(f, "ConfigError: paredao id missing (set PAREDAO_ID)")
            }
            ConfigError::NotEnoughParticipantes { found } => write!(
                f,
                "ConfigError: at least 2 comma separated participante ids required in PARTICIPANTE_IDS, found {found}"
            ),
            ConfigError::InvalidApiBase { value, reason } => {
                write!(f, "ConfigError: invalid api base '{value}': {reason}")
            }
            ConfigError::ZeroRate => write!(f, "ConfigError: rate must be at least 1"),
            ConfigError::ZeroDuration => write!(f, "ConfigError: duration must be non-zero"),
            ConfigError::ZeroMaxVus => write!(f, "ConfigError: max vus must be at least 1"),
            ConfigError::PreAllocatedVusExceedMax { pre_allocated, max } => write!(
                f,
                "ConfigError: pre-allocated vus ({pre_allocated}) exceed max vus ({max})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
