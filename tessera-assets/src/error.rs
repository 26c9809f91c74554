//! The finite status taxonomy shared by paks, loaders, and the manager. Every failure in the
//! pipeline is one of these; nothing here is thrown, only returned or folded into a `Failed`
//! [`crate::async_state::AsyncStatus`].

/// Outcome of a pak lookup, a loader invocation, or a task runnable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Status {
    #[error("ok")]
    Ok,
    #[error("asset not found")]
    NotFound,
    #[error("asset data is invalid")]
    InvalidData,
    #[error("failed to read asset bytes")]
    FailedRead,
    #[error("failed to parse asset data")]
    FailedParse,
    #[error("failed to compile shader")]
    FailedCompile,
    #[error("failed to resize image")]
    FailedResize,
    #[error("failed to instantiate asset")]
    FailedInstantiate,
    #[error("invalid state")]
    InvalidState,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("not implemented")]
    NotImplemented,
    #[error("unspecified error")]
    Error,
}

impl Status {
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }
}
