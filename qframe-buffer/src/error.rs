//! Buffer layer errors.
//!
//! Only construction-time mistakes and caller bookkeeping errors are reported
//! here. Arena exhaustion is an ordinary [`PushResult`](crate::PushResult),
//! and allocation failure aborts like any other Rust allocation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BufferError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("pool block size must be greater than zero")]
    ZeroBlockSize,

    #[error("maximum packet size must be greater than zero")]
    ZeroPacketSize,

    #[error("arena of {capacity} bytes cannot hold a single {max_packet_size}-byte packet")]
    ArenaTooSmall { capacity: usize, max_packet_size: usize },

    #[error("acked range {offset}..{end} extends past the {written} bytes written")]
    AckBeyondWritten { offset: u64, end: u64, written: u64 },
}
