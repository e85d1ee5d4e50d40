use serde::{Deserialize, Serialize};

/// Result of probing a single candidate URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Answered with an accepted status
    Reachable { status: u16 },
    /// Answered with a status outside the accepted set, or failed to connect
    Unreachable { reason: UnreachableReason },
    /// No answer within the probe timeout
    TimedOut,
    /// Not probed because validation is disabled
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UnreachableReason {
    /// Server answered, but with a rejected status code
    Status(u16),
    /// Connection refused, DNS failure, TLS error and similar
    Error(String),
}

impl ValidationOutcome {
    /// Whether the URL stays in the result
    ///
    /// A definite rejection (bad status) always drops the URL. Errors and
    /// timeouts are indeterminate and follow `fail_open`.
    pub fn is_retained(&self, fail_open: bool) -> bool {
        match self {
            ValidationOutcome::Reachable { .. } | ValidationOutcome::Skipped => true,
            ValidationOutcome::Unreachable {
                reason: UnreachableReason::Status(_),
            } => false,
            ValidationOutcome::Unreachable {
                reason: UnreachableReason::Error(_),
            }
            | ValidationOutcome::TimedOut => fail_open,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ValidationOutcome::Reachable { .. } => "reachable",
            ValidationOutcome::Unreachable {
                reason: UnreachableReason::Status(_),
            } => "rejected",
            ValidationOutcome::Unreachable { .. } => "unreachable",
            ValidationOutcome::TimedOut => "timed_out",
            ValidationOutcome::Skipped => "skipped",
        }
    }
}
