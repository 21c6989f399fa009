//! `TestSuite`: a reporting sink that accumulates named checks.
//!
//! A failed check never aborts anything; it is recorded (and logged at
//! `warn`) so that a harness can run every sub-test and report all failures
//! at the end.

use std::fmt::{self, Display, Write as _};

use crate::align_error::DebugAlignError;
use crate::debug_invariants::DebugInvariants;

/// One failed check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// Name of the check, prefixed by enclosing sub-suite names.
    pub name: String,
    /// Detail appended via [`CheckOutcome::message`].
    pub message: String,
}

impl Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "CHECK FAILED: {}", self.name)
        } else {
            write!(f, "CHECK FAILED: {}: {}", self.name, self.message)
        }
    }
}

/// Collects pass/fail outcomes of named checks.
#[derive(Clone, Debug, Default)]
pub struct TestSuite {
    name: String,
    checks: usize,
    failures: Vec<Failure>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        TestSuite {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a check that passes iff `condition` holds.
    ///
    /// The returned [`CheckOutcome`] can attach detail to a failure.
    pub fn check(&mut self, condition: bool, name: impl Into<String>) -> CheckOutcome<'_> {
        self.checks += 1;
        let failure = if condition {
            None
        } else {
            let name = name.into();
            log::warn!("CHECK FAILED: {name}");
            self.failures.push(Failure {
                name,
                message: String::new(),
            });
            self.failures.last_mut()
        };
        CheckOutcome { failure }
    }

    /// Record a check that passes iff `outcome` is the misalignment signal.
    ///
    /// A completed construction, or any other error, is a failure.
    pub fn check_rejected<T>(
        &mut self,
        outcome: Result<T, DebugAlignError>,
        name: impl Into<String>,
    ) -> CheckOutcome<'_> {
        match outcome {
            Err(e) if e.is_misaligned() => self.check(true, name),
            Err(e) => {
                let mut out = self.check(false, name);
                out.message(format_args!("unexpected error: {e}; "));
                out
            }
            Ok(_) => self.check(false, name),
        }
    }

    /// Fold a finished sub-suite into this one.
    pub fn sub_test(&mut self, sub: TestSuite) {
        self.checks += sub.checks;
        for mut failure in sub.failures {
            if !sub.name.is_empty() {
                failure.name = format!("{}/{}", sub.name, failure.name);
            }
            self.failures.push(failure);
        }
    }

    /// True if no check failed.
    pub fn good(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn checks(&self) -> usize {
        self.checks
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Human-readable summary followed by one line per failure.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let label = if self.name.is_empty() { "TestSuite" } else { &self.name };
        let _ = writeln!(
            out,
            "{label}: {} checks, {} failed",
            self.checks,
            self.failures.len()
        );
        for failure in &self.failures {
            let _ = writeln!(out, "  {failure}");
        }
        out
    }

    /// `0` if every check passed, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.good() { 0 } else { 1 }
    }
}

impl DebugInvariants for TestSuite {
    fn validate_invariants(&self) -> Result<(), DebugAlignError> {
        if self.failures.len() <= self.checks {
            Ok(())
        } else {
            Err(DebugAlignError::InvariantViolated(format!(
                "{} failures recorded for {} checks",
                self.failures.len(),
                self.checks
            )))
        }
    }
}

/// Handle to the check just recorded.
#[derive(Debug)]
pub struct CheckOutcome<'a> {
    failure: Option<&'a mut Failure>,
}

impl CheckOutcome<'_> {
    /// True if the check passed.
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    /// Append `detail` to the failure message; no-op if the check passed.
    pub fn message(&mut self, detail: impl Display) -> &mut Self {
        if let Some(failure) = self.failure.as_deref_mut() {
            let _ = write!(failure.message, "{detail}");
        }
        self
    }
}
