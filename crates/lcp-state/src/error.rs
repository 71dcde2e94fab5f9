use thiserror::Error;

/// Errors that can occur during license status transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid license status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// License status is in a terminal state.
    #[error("license status is in terminal state {state}")]
    TerminalState {
        /// The terminal state.
        state: String,
    },

    /// Device id or name missing or too long.
    #[error("invalid device: {0}")]
    InvalidDevice(String),

    /// Requested renewal end is unusable.
    #[error("invalid renewal: {0}")]
    InvalidRenewal(String),

    /// The persisted status bitmask did not decode to exactly one status.
    #[error("license status {license_ref} has no decodable status")]
    UndecodableStatus {
        /// External license reference of the affected row.
        license_ref: String,
    },
}
