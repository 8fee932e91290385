//! Crate-wide error type.
//!
//! Every fallible operation returns `Result<_, AppError>`. The error carries a
//! `kind` from the engine's failure taxonomy plus a human-readable message with
//! enough context (offending ids, counts) to fix the inputs. Kinds map to
//! stable process exit codes so an external orchestrator can branch on them.

/// Failure taxonomy for the engine.
///
/// Hard failures (`ResolutionGap`, `InvalidWeights`, `DegenerateDistribution`)
/// abort the run; soft validation findings are never represented as errors —
/// they live in the `ValidationReport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A location code is absent from the curated coordinate table.
    UnknownLocation,
    /// A travel-time estimate was requested for an unresolved endpoint.
    UnresolvedCoordinate,
    /// The unresolved-code rate exceeded the configured tolerance.
    ResolutionGap,
    /// Weights are negative or fail to renormalize to 1.0.
    InvalidWeights,
    /// The score distribution is degenerate; downstream classification halts.
    DegenerateDistribution,
    /// Bad input file, schema, or configuration value.
    InvalidInput,
    /// Filesystem failure while reading or writing an artifact.
    Io,
    /// A computation produced a non-finite or otherwise unusable value.
    Numeric,
    /// The matrix build was cancelled before completion.
    Cancelled,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidInput => 2,
            ErrorKind::Io => 2,
            ErrorKind::UnknownLocation => 3,
            ErrorKind::UnresolvedCoordinate => 3,
            ErrorKind::ResolutionGap => 3,
            ErrorKind::InvalidWeights => 4,
            ErrorKind::DegenerateDistribution => 5,
            ErrorKind::Numeric => 6,
            ErrorKind::Cancelled => 7,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::new(ErrorKind::Io, format!("I/O error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(AppError::new(ErrorKind::InvalidInput, "x").exit_code(), 2);
        assert_eq!(AppError::new(ErrorKind::ResolutionGap, "x").exit_code(), 3);
        assert_eq!(AppError::new(ErrorKind::InvalidWeights, "x").exit_code(), 4);
        assert_eq!(
            AppError::new(ErrorKind::DegenerateDistribution, "x").exit_code(),
            5
        );
    }
}
