//! Verification trial outcomes.

/// Outcome of one build/test verification of the artifact set.
///
/// `passed` reflects buildability, not the target's own test results: a
/// run where compilation and execution completed but some tests failed is
/// reported as passed (the verifier logs the failures).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub passed: bool,

    /// Diagnostic text on failure. Absent when the failure produced no
    /// usable output (e.g. the tool crashed before reporting).
    pub diagnostic: Option<String>,
}

impl VerificationResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            diagnostic: None,
        }
    }

    pub fn fail(diagnostic: impl Into<Option<String>>) -> Self {
        Self {
            passed: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// One verification trial inside a round's escalation sub-loop.
///
/// Attempt numbers are 1-indexed and bounded by the configured maximum;
/// the sub-loop is terminal on pass or on exhausting the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileAttempt {
    pub number: u32,
    pub passed: bool,
    pub diagnostic: Option<String>,
}

impl CompileAttempt {
    pub fn new(number: u32, result: &VerificationResult) -> Self {
        Self {
            number,
            passed: result.passed,
            diagnostic: result.diagnostic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_accepts_optional_diagnostic() {
        let with = VerificationResult::fail("boom".to_string());
        assert!(!with.passed);
        assert_eq!(with.diagnostic.as_deref(), Some("boom"));

        let without = VerificationResult::fail(None);
        assert!(!without.passed);
        assert!(without.diagnostic.is_none());
    }

    #[test]
    fn attempt_records_result() {
        let attempt = CompileAttempt::new(2, &VerificationResult::pass());
        assert_eq!(attempt.number, 2);
        assert!(attempt.passed);
    }
}
