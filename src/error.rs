//! Centralized error types for varp-core.
//!
//! Parsers fail fast on structural problems. Validators accumulate errors and
//! warnings and report them as data instead. Analyzers are best-effort: a
//! per-file failure becomes a `scan_errors` entry on the result, not an
//! `Error`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Manifest file failed to parse or violates its schema (missing version,
    /// non-mapping component entry, invalid stability value).
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    /// Plan file failed to parse or violates its schema.
    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    /// A name used in `deps`/`touches` does not resolve to a known component.
    #[error("reference error: {0}")]
    ReferenceError(String),

    /// A budget field is non-positive.
    #[error("budget error: {0}")]
    BudgetError(String),

    /// The RAW/WAW task graph has a cycle; raised by wave assignment.
    #[error("plan cycle: {0}")]
    PlanCycle(String),

    /// The manifest `deps` graph has a cycle. Note: `parse_manifest` reports
    /// this as data in its result, not by returning this variant — callers
    /// that need a hard failure (e.g. operations that require an acyclic
    /// manifest) construct it from that data.
    #[error("graph cycle: {0}")]
    GraphCycle(String),

    /// Filesystem read failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON or YAML (de)serialization failure outside of manifest/plan parsing.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::MalformedManifest(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ReferenceError("auth".to_string());
        assert_eq!(err.to_string(), "reference error: auth");

        let err = Error::BudgetError("tokens must be positive".to_string());
        assert!(err.to_string().contains("tokens must be positive"));
    }

    #[test]
    fn test_error_traits() {
        let err1 = Error::PlanCycle("T1,T2".to_string());
        let err2 = err1.clone();
        assert_eq!(err1, err2);

        let err3 = Error::GraphCycle("a,b".to_string());
        assert_ne!(err1, err3);
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        match err {
            Error::Io(msg) => assert!(msg.contains("file not found")),
            _ => panic!("expected Io error"),
        }

        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("key: [unterminated").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(matches!(err, Error::MalformedManifest(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        fn returns_error() -> Result<i32> {
            Err(Error::Internal("boom".to_string()))
        }

        assert_eq!(returns_result().unwrap(), 42);
        assert!(returns_error().is_err());
    }
}
