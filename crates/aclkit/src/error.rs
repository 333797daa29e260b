//! Error types for ACL reconciliation.

use thiserror::Error;

/// Errors that can occur while rendering, diffing or applying ACLs.
#[derive(Debug, Error)]
pub enum Error {
    /// Backup and desired config block counts differ, so blocks cannot be paired
    #[error("cannot pair {backup} backup block(s) with {desired} desired block(s)")]
    PairingMismatch {
        /// Number of backup blocks gathered from the device
        backup: usize,
        /// Number of desired blocks rendered
        desired: usize,
    },

    /// Address is neither `any` nor a valid IPv4 address/prefix
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// ACE keyword is not one of remark, permit or deny
    #[error("unknown ACE action '{0}', expected remark, permit or deny")]
    InvalidAction(String),

    /// Platform tag has no ACL support
    #[error("unknown platform '{0}', expected one of ios, iosxe, nxos, asa")]
    UnknownPlatform(String),

    /// Device command failed
    #[error(transparent)]
    Transport(#[from] netstate::Error),
}

impl Error {
    /// Whether this error is a configuration problem rather than a device problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::PairingMismatch { .. }
                | Self::InvalidAddress(_)
                | Self::InvalidAction(_)
                | Self::UnknownPlatform(_)
        )
    }
}

/// Result type for ACL operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_mismatch_display() {
        let err = Error::PairingMismatch {
            backup: 1,
            desired: 2,
        };
        assert_eq!(
            err.to_string(),
            "cannot pair 1 backup block(s) with 2 desired block(s)"
        );
        assert!(err.is_config_error());
    }

    #[test]
    fn test_transport_error_is_not_config_error() {
        let err: Error = netstate::Error::transport("10.0.0.1", "timed out").into();
        assert!(!err.is_config_error());
        assert!(err.to_string().contains("timed out"));
    }
}
