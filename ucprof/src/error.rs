use crate::transport::ChannelIndex;

/// Reasons binding the trace channel can fail.
///
/// These only ever surface from initialisation. Dropped or truncated records are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("up channel {index} is already bound")]
    AlreadyBound { index: ChannelIndex },
    #[error("transport has no up channel {index}")]
    NoSuchChannel { index: ChannelIndex },
    #[error("transport rejected channel configuration (status {status})")]
    Rejected { status: i32 },
    #[error("trace buffer was already handed out")]
    BufferTaken,
}

impl Error {
    /// Negative status reported to C callers of `ucprof_init`.
    pub fn status(&self) -> i32 {
        match *self {
            Error::Rejected { status } if status < 0 => status,
            Error::Rejected { .. } => -1,
            Error::AlreadyBound { .. } => -2,
            Error::NoSuchChannel { .. } => -3,
            Error::BufferTaken => -4,
        }
    }
}
