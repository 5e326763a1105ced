//! Status returned by behavior nodes.

use serde::{Deserialize, Serialize};

/// The result of updating a behavior node.
///
/// # Resumable Semantics
///
/// A tree is polled by its driver on whatever cadence the driver chooses
/// (every frame, once per simulated day, ...). `Running` is the only way a
/// node spans several polls: it hands control back to its parent and resumes
/// from its own fields on the next update.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Status {
    /// The node has not finished yet and wants to be polled again.
    ///
    /// This is also the initial cached state of every node and tree.
    #[default]
    Running,

    /// The node completed successfully.
    ///
    /// For conditions: The condition was met.
    /// For actions: The action finished without problems.
    Success,

    /// The node failed.
    ///
    /// For conditions: The condition was not met.
    /// For actions: The action could not be carried out.
    Failure,
}

impl Status {
    /// Returns `true` if this status is `Running`.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }

    /// Returns `true` if this status is `Success`.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Returns `true` if this status is `Failure`.
    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }

    /// Returns `true` for `Success` and `Failure`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !self.is_running()
    }

    /// Swaps `Success` and `Failure`. `Running` is returned unchanged.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Status::Running => Status::Running,
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_swaps_terminal_states() {
        assert_eq!(Status::Success.invert(), Status::Failure);
        assert_eq!(Status::Failure.invert(), Status::Success);
        assert_eq!(Status::Running.invert(), Status::Running);
    }

    #[test]
    fn default_is_running() {
        assert_eq!(Status::default(), Status::Running);
        assert!(Status::default().is_running());
        assert!(!Status::default().is_terminal());
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("SUCCESS".parse::<Status>().ok(), Some(Status::Success));
        assert_eq!(Status::Failure.to_string(), "failure");
        assert_eq!(Status::Running.as_ref(), "running");
    }
}
