//! Return-path misuse policies

use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::DiagnosticSink,
    error::{MisuseKind, PoolError, Result},
};

/// What to do with a returned buffer that was not rented from its bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NonMemberPolicy {
    /// Add it to the available set without comment
    AdoptSilently,
    /// Drop it; do not add it to the available set
    #[default]
    Ignore,
    /// Add it to the available set and emit a diagnostic
    AdoptWithDiagnostic,
    /// Drop it and emit a diagnostic
    IgnoreWithDiagnostic,
    /// Fail the return with a misuse error
    FailLoudly,
}

impl NonMemberPolicy {
    /// Whether the buffer ends up in the available set
    pub fn adopts(self) -> bool {
        matches!(self, Self::AdoptSilently | Self::AdoptWithDiagnostic)
    }

    /// Whether a diagnostic is emitted
    pub fn reports(self) -> bool {
        matches!(self, Self::AdoptWithDiagnostic | Self::IgnoreWithDiagnostic)
    }

    /// Apply the policy to a foreign buffer
    ///
    /// Returns `Ok(true)` when the buffer should be adopted.
    pub(crate) fn apply(
        self,
        kind: MisuseKind,
        length: usize,
        sink: &dyn DiagnosticSink,
    ) -> Result<bool> {
        if self == Self::FailLoudly {
            return Err(PoolError::misuse(kind, length));
        }
        if self.reports() {
            sink.report(kind, length);
        }
        Ok(self.adopts())
    }
}

/// What to do when a returned buffer is already in the available set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlreadyReturnedPolicy {
    /// Skip the check entirely
    #[default]
    Ignore,
    /// Emit a diagnostic and carry on
    DiagnosticOnly,
    /// Fail the return with a misuse error
    FailLoudly,
}

impl AlreadyReturnedPolicy {
    /// Whether the available set has to be scanned at all
    pub fn checks(self) -> bool {
        self != Self::Ignore
    }
}

/// Pair of policies applied to one return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ReturnPolicy {
    /// Handling of buffers the bucket did not lend out
    pub non_member: NonMemberPolicy,
    /// Handling of buffers that are already available
    pub already_returned: AlreadyReturnedPolicy,
}

impl ReturnPolicy {
    /// Create a policy pair
    pub const fn new(non_member: NonMemberPolicy, already_returned: AlreadyReturnedPolicy) -> Self {
        Self {
            non_member,
            already_returned,
        }
    }

    /// Fail loudly on every kind of misuse
    pub const fn strict() -> Self {
        Self::new(NonMemberPolicy::FailLoudly, AlreadyReturnedPolicy::FailLoudly)
    }

    /// Report every kind of misuse but never fail or adopt
    pub const fn diagnostic() -> Self {
        Self::new(
            NonMemberPolicy::IgnoreWithDiagnostic,
            AlreadyReturnedPolicy::DiagnosticOnly,
        )
    }

    /// Set the foreign-buffer policy
    pub fn with_non_member(mut self, policy: NonMemberPolicy) -> Self {
        self.non_member = policy;
        self
    }

    /// Set the already-returned policy
    pub fn with_already_returned(mut self, policy: AlreadyReturnedPolicy) -> Self {
        self.already_returned = policy;
        self
    }
}
