//! Exit code constants and error mapping for conclave.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `NO_CANDIDATES` | Candidate generation produced nothing |
//! | 4 | `SYNTHESIS_FAILURE` | Directed call failed; for `analyze` the partial transcript is still written |

use crate::error::{ConclaveError, PipelineError};

/// Exit codes matching the documented exit code table.
///
/// Use the named constants for common exit codes, or [`as_i32()`](Self::as_i32)
/// to get the numeric value for `std::process::exit()`.
///
/// # Example
///
/// ```rust
/// use conclave_utils::exit_codes::ExitCode;
///
/// let code = ExitCode::NO_CANDIDATES;
/// assert_eq!(code.as_i32(), 3);
/// assert_eq!(ExitCode::SUCCESS, ExitCode::from_i32(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// No solution candidates were produced during candidate generation
    pub const NO_CANDIDATES: ExitCode = ExitCode(3);

    /// The synthesis backend was unknown, uncredentialed or failed
    pub const SYNTHESIS_FAILURE: ExitCode = ExitCode(4);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl ConclaveError {
    /// Map this error to the process exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            ConclaveError::Config(_) => ExitCode::CLI_ARGS,
            ConclaveError::Pipeline(PipelineError::NoCandidatesAvailable) => {
                ExitCode::NO_CANDIDATES
            }
            ConclaveError::Pipeline(PipelineError::SynthesisIncomplete { .. }) => {
                ExitCode::SYNTHESIS_FAILURE
            }
            ConclaveError::Dispatch(_) => ExitCode::SYNTHESIS_FAILURE,
            _ => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, DispatchError};

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::NO_CANDIDATES.as_i32(), 3);
        assert_eq!(ExitCode::SYNTHESIS_FAILURE.as_i32(), 4);
    }

    #[test]
    fn test_error_to_exit_code_mapping() {
        let config_err = ConclaveError::Config(ConfigError::InvalidFile("bad".to_string()));
        assert_eq!(config_err.to_exit_code(), ExitCode::CLI_ARGS);

        let no_candidates = ConclaveError::Pipeline(PipelineError::NoCandidatesAvailable);
        assert_eq!(no_candidates.to_exit_code(), ExitCode::NO_CANDIDATES);

        let synthesis = ConclaveError::Pipeline(PipelineError::SynthesisIncomplete {
            reason: "No backend named 'nobody' is registered".to_string(),
        });
        assert_eq!(synthesis.to_exit_code(), ExitCode::SYNTHESIS_FAILURE);

        let dispatch = ConclaveError::Dispatch(DispatchError::UnknownBackend {
            name: "nobody".to_string(),
        });
        assert_eq!(dispatch.to_exit_code(), ExitCode::SYNTHESIS_FAILURE);

        let io = ConclaveError::Io(std::io::Error::other("disk"));
        assert_eq!(io.to_exit_code(), ExitCode::INTERNAL);
    }

    #[test]
    fn test_i32_conversions() {
        let code: i32 = ExitCode::NO_CANDIDATES.into();
        assert_eq!(code, 3);
        assert_eq!(ExitCode::from(4), ExitCode::SYNTHESIS_FAILURE);
    }
}
