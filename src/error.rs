use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to whoever drives the follower.
///
/// Misbehaving peers never show up here. They are answered on the bus
/// with a Feature Abort and counted as warnings.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading from or writing to the adapter failed.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(&'static str),

    #[error("message of {0} bytes does not fit a CEC frame")]
    MessageTooLong(usize),

    #[error("empty message")]
    EmptyMessage,
}
