//! Numeric status codes returned by every ABI call.

use tyl_types::CoreError;

/// Result of an ABI call. `Ok` is zero; every other value names the
/// [`CoreError`] variant that stopped the call.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TylStatus {
    Ok = 0,
    InvalidTypeId = 1,
    InvalidHandle = 2,
    CapacityExceeded = 3,
    InvalidArgument = 4,
    LatticeNotFrozen = 5,
    LatticeAlreadyFrozen = 6,
    CycleDetected = 7,
}

impl TylStatus {
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<&CoreError> for TylStatus {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::InvalidTypeId { .. } => Self::InvalidTypeId,
            CoreError::InvalidHandle => Self::InvalidHandle,
            CoreError::CapacityExceeded { .. } => Self::CapacityExceeded,
            CoreError::InvalidArgument(_) => Self::InvalidArgument,
            CoreError::LatticeNotFrozen => Self::LatticeNotFrozen,
            CoreError::LatticeAlreadyFrozen => Self::LatticeAlreadyFrozen,
            CoreError::CycleDetected { .. } => Self::CycleDetected,
        }
    }
}

impl From<CoreError> for TylStatus {
    fn from(err: CoreError) -> Self {
        Self::from(&err)
    }
}

/// Collapse an internal result into a status, logging caller misuse.
pub(crate) fn report(result: Result<(), CoreError>) -> TylStatus {
    match result {
        Ok(()) => TylStatus::Ok,
        Err(err) => {
            if matches!(err, CoreError::InvalidHandle | CoreError::InvalidArgument(_)) {
                tracing::warn!(%err, "rejected type-set ABI call");
            }
            TylStatus::from(err)
        }
    }
}
