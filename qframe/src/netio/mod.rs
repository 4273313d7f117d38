//! Network I/O.
//!
//! - Socket creation and configuration
//! - A UDP writer that batches datagrams in a [`BatchWriterBuffer`] arena
//!
//! [`BatchWriterBuffer`]: qframe_buffer::BatchWriterBuffer

pub mod batch_writer;
pub mod config;
pub mod socket;

pub use batch_writer::{UdpBatchWriter, WriteResult, WriteStatus};
pub use config::{BatchConfig, NetIoConfig};
pub use socket::{bind_address_for, create_udp_socket};
