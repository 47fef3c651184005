//! Admission control for guests the host can only run a few of at once.
//!
//! Apple's virtualization framework limits how many macOS guests may run
//! concurrently on one host. The policy is a pure function of the current
//! tally and the candidate's OS family; the execution loop owns the tally.

use crate::resolve::MACOS;

/// Concurrent macOS guests allowed per host.
pub const MACOS_CONCURRENCY_LIMIT: usize = 2;

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { running: usize, limit: usize },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Caps running VMs of one OS family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionPolicy {
    family: String,
    limit: usize,
}

impl AdmissionPolicy {
    pub fn new(family: &str, limit: usize) -> Self {
        Self {
            family: family.to_string(),
            limit,
        }
    }

    /// At most [`MACOS_CONCURRENCY_LIMIT`] running macOS guests.
    pub fn macos() -> Self {
        Self::new(MACOS, MACOS_CONCURRENCY_LIMIT)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether VMs of `os` count against this policy.
    pub fn applies_to(&self, os: &str) -> bool {
        os.eq_ignore_ascii_case(&self.family)
    }

    /// Decide whether one more VM of `os` may start given `running` already.
    pub fn admit(&self, running: usize, os: &str) -> Admission {
        if self.applies_to(os) && running >= self.limit {
            Admission::Denied {
                running,
                limit: self.limit,
            }
        } else {
            Admission::Allowed
        }
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::macos()
    }
}
