/// Failure kinds surfaced by the resolver and the chart pipeline.
///
/// Every variant is clonable because one in-flight request result is handed
/// to every caller waiting on the same identifier.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum EvolutionError {
    #[error("no upstream record for {0}")]
    NotFound(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

impl EvolutionError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }

    pub fn malformed(err: impl std::fmt::Display) -> Self {
        Self::MalformedRecord(err.to_string())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum OverrideError {
    #[error("failed to read override table {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("override table parse error: {0}")]
    Parse(String),
}
