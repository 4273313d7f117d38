use qframe_buffer::batch::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_PACKET_SIZE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Size of the batch arena in bytes.
    pub buffer_size: usize,

    /// Largest packet the arena accepts. Must fit in `buffer_size`.
    pub max_packet_size: usize,

    /// Flush once this many packets are buffered.
    pub max_batch_packets: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            max_batch_packets: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetIoConfig {
    /// Local address for outgoing sockets. Port 0 is always used.
    pub bind_host: String,

    /// Optional kernel receive buffer size (SO_RCVBUF).
    pub socket_recv_buffer_size: Option<usize>,

    /// Optional kernel send buffer size (SO_SNDBUF).
    /// Larger buffers absorb a full batch without blocking.
    pub socket_send_buffer_size: Option<usize>,

    pub batch: BatchConfig,
}

impl Default for NetIoConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            socket_recv_buffer_size: None,
            socket_send_buffer_size: Some(1024 * 1024),
            batch: BatchConfig::default(),
        }
    }
}

impl NetIoConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.bind_host.parse::<std::net::IpAddr>().is_err() {
            errors.push(format!("Invalid netio.bind_host: {}", self.bind_host));
        }

        if let Some(size) = self.socket_recv_buffer_size {
            if size == 0 {
                errors.push("netio.socket_recv_buffer_size must be > 0 when set".to_string());
            }
        }
        if let Some(size) = self.socket_send_buffer_size {
            if size == 0 {
                errors.push("netio.socket_send_buffer_size must be > 0 when set".to_string());
            }
        }

        let batch = &self.batch;
        if batch.max_packet_size == 0 {
            errors.push("netio.batch.max_packet_size must be > 0".to_string());
        }
        if batch.max_packet_size > 65_507 {
            errors.push(format!(
                "netio.batch.max_packet_size ({}) exceeds the largest UDP payload (65507)",
                batch.max_packet_size
            ));
        }
        if batch.buffer_size < batch.max_packet_size {
            errors.push(format!(
                "netio.batch.buffer_size ({}) must be at least max_packet_size ({})",
                batch.buffer_size, batch.max_packet_size
            ));
        }
        if batch.max_batch_packets == 0 {
            errors.push("netio.batch.max_batch_packets must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
