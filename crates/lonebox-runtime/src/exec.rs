//! Command execution inside the running container.

use std::time::Duration;

use lonebox_common::error::{LoneboxError, Result};
use serde::Serialize;

/// Output from an exec command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    /// Interleaved stdout and stderr, decoded lossily as UTF-8.
    pub output: String,
    /// Exit code reported by the engine, if the exec had finished.
    pub exit_code: Option<i64>,
}

/// Picks the deadline for an exec.
///
/// `requested` is the caller's timeout in seconds; `None` means `default`.
///
/// # Errors
///
/// Returns a validation error for a zero timeout or one above `max`.
pub fn resolve_timeout(requested: Option<u64>, default: Duration, max: Duration) -> Result<Duration> {
    let Some(secs) = requested else {
        return Ok(default);
    };
    if secs == 0 {
        return Err(LoneboxError::Validation {
            message: "timeout_secs must be greater than zero".into(),
        });
    }
    let timeout = Duration::from_secs(secs);
    if timeout > max {
        return Err(LoneboxError::Validation {
            message: format!("timeout_secs must not exceed {}", max.as_secs()),
        });
    }
    Ok(timeout)
}

/// Checks that a command has a program to run.
///
/// # Errors
///
/// Returns a validation error for an empty command or a blank program name.
pub fn validate_command(cmd: &[String]) -> Result<()> {
    match cmd.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => Err(LoneboxError::Validation {
            message: "cmd must name a program to run".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: Duration = Duration::from_secs(60);
    const MAX: Duration = Duration::from_secs(600);

    #[test]
    fn missing_timeout_uses_default() {
        assert_eq!(resolve_timeout(None, DEFAULT, MAX).unwrap(), DEFAULT);
    }

    #[test]
    fn requested_timeout_within_bounds_is_kept() {
        assert_eq!(
            resolve_timeout(Some(5), DEFAULT, MAX).unwrap(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn zero_and_oversized_timeouts_are_rejected() {
        assert!(resolve_timeout(Some(0), DEFAULT, MAX).is_err());
        assert!(resolve_timeout(Some(601), DEFAULT, MAX).is_err());
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(validate_command(&[]).is_err());
        assert!(validate_command(&[" ".into()]).is_err());
        assert!(validate_command(&["python".into(), "/test/test.py".into()]).is_ok());
    }
}
