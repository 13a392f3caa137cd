//! Verification helpers for workflow runs
//!
//! Assertions over the mock controller's call log and over the
//! structured result a run produced. Each returns a [`VerifyResult`] so
//! tests can `?` them or `unwrap()` for a readable panic.

use crate::mock::MockCcc;
use ccc_orch_common::RunResult;
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected no state-changing calls, found: {}", calls.join(", "))]
    UnexpectedMutations { calls: Vec<String> },

    #[error("Expected {expected} call(s) to {call}, found {actual}")]
    CallCountMismatch {
        call: String,
        expected: usize,
        actual: usize,
    },

    #[error("Result field '{field}': expected {expected}, got {actual}")]
    ResultMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Message '{message}' does not contain '{expected}'")]
    MessageMismatch { message: String, expected: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Verify that no call with `op_modifies = true` was made.
pub fn assert_no_mutations(mock: &MockCcc) -> VerifyResult<()> {
    let calls: Vec<String> = mock.mutations().iter().map(|c| c.name()).collect();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(VerificationError::UnexpectedMutations { calls })
    }
}

/// Verify the number of calls to one function.
pub fn assert_call_count(mock: &MockCcc, family: &str, function: &str, expected: usize) -> VerifyResult<()> {
    let actual = mock.call_count(family, function);
    if actual != expected {
        return Err(VerificationError::CallCountMismatch {
            call: format!("{}.{}", family, function),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Verify the total number of state-changing calls.
pub fn assert_mutation_count(mock: &MockCcc, expected: usize) -> VerifyResult<()> {
    let actual = mock.mutations().len();
    if actual != expected {
        return Err(VerificationError::CallCountMismatch {
            call: "state-changing calls".to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Verify the `changed` and `failed` flags of a result.
pub fn assert_outcome(result: &RunResult, changed: bool, failed: bool) -> VerifyResult<()> {
    for (field, expected, actual) in [("changed", changed, result.changed), ("failed", failed, result.failed)] {
        if expected != actual {
            return Err(VerificationError::ResultMismatch {
                field: field.to_string(),
                expected: expected.to_string(),
                actual: format!("{} (msg: {})", actual, result.msg_text()),
            });
        }
    }
    Ok(())
}

/// Verify that the result message mentions `needle` (case-insensitive).
pub fn assert_msg_contains(result: &RunResult, needle: &str) -> VerifyResult<()> {
    let message = result.msg_text();
    if message.to_lowercase().contains(&needle.to_lowercase()) {
        Ok(())
    } else {
        Err(VerificationError::MessageMismatch {
            message,
            expected: needle.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccc_client::CccApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_mutation_tracking() {
        let mock = MockCcc::default();
        mock.on_response("sites", "get_site", json!([]));
        mock.invoke("sites", "get_site", &json!({}), false).await.unwrap();
        assert!(assert_no_mutations(&mock).is_ok());
        assert!(assert_call_count(&mock, "sites", "get_site", 1).is_ok());
        assert!(assert_call_count(&mock, "sites", "get_site", 2).is_err());

        mock.on_response("sites", "create_site", json!({"taskId": "t"}));
        mock.invoke("sites", "create_site", &json!({}), true).await.unwrap();
        let err = assert_no_mutations(&mock).unwrap_err();
        assert!(err.to_string().contains("sites.create_site"));
        assert!(assert_mutation_count(&mock, 1).is_ok());
    }

    #[test]
    fn test_result_assertions() {
        let result = RunResult {
            changed: true,
            msg: json!("Task abc did not complete within the Timeout of 10s"),
            ..Default::default()
        };
        assert!(assert_outcome(&result, true, false).is_ok());
        assert!(assert_outcome(&result, false, false).is_err());
        assert!(assert_msg_contains(&result, "timeout").is_ok());
        assert!(assert_msg_contains(&result, "version").is_err());
    }
}
