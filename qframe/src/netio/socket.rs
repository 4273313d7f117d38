//! UDP socket creation.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket as Socket2, Type};

use crate::netio::config::NetIoConfig;

/// Create and configure a UDP socket.
///
/// Applies SO_REUSEADDR and the optional kernel buffer sizes from `config`,
/// then binds. The socket is left in blocking mode.
pub fn create_udp_socket(bind_addr: SocketAddr, config: &NetIoConfig) -> Result<UdpSocket> {
    let domain = match bind_addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };

    let socket =
        Socket2::new(domain, Type::DGRAM, Some(Protocol::UDP)).context("creating UDP socket")?;

    socket
        .set_reuse_address(true)
        .context("setting SO_REUSEADDR")?;

    if let Some(size) = config.socket_recv_buffer_size {
        socket
            .set_recv_buffer_size(size)
            .with_context(|| format!("setting SO_RCVBUF to {}", size))?;
    }

    if let Some(size) = config.socket_send_buffer_size {
        socket
            .set_send_buffer_size(size)
            .with_context(|| format!("setting SO_SNDBUF to {}", size))?;
    }

    // For IPv6, configure v6-only based on bind address
    if let SocketAddr::V6(addr) = bind_addr {
        socket
            .set_only_v6(!addr.ip().is_unspecified())
            .context("setting IPV6_V6ONLY")?;
    }

    socket
        .bind(&bind_addr.into())
        .with_context(|| format!("binding UDP socket to {}", bind_addr))?;

    Ok(socket.into())
}

/// Local address (port 0) for sending to `peer` from `bind_host`.
///
/// Falls back to the unspecified address of the peer's family when
/// `bind_host` belongs to the other family.
pub fn bind_address_for(bind_host: &str, peer: SocketAddr) -> Result<SocketAddr> {
    let host: IpAddr = bind_host
        .parse()
        .with_context(|| format!("invalid bind host: {}", bind_host))?;

    let ip = match (host, peer) {
        (IpAddr::V4(_), SocketAddr::V4(_)) | (IpAddr::V6(_), SocketAddr::V6(_)) => host,
        (_, SocketAddr::V4(_)) => {
            tracing::warn!(%host, %peer, "bind host family differs from peer, using 0.0.0.0");
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
        (_, SocketAddr::V6(_)) => {
            tracing::warn!(%host, %peer, "bind host family differs from peer, using ::");
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        }
    };

    Ok(SocketAddr::new(ip, 0))
}
