//! UDP socket setup for gateway broadcasts

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Bind a non-blocking UDP socket for telemetry broadcasts.
///
/// Address reuse lets a restarted monitor rebind while the old socket is
/// still draining. `recv_buffer_bytes` of zero keeps the OS default.
pub fn bind_udp(addr: SocketAddr, recv_buffer_bytes: usize) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    if recv_buffer_bytes > 0 {
        socket.set_recv_buffer_size(recv_buffer_bytes)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    let socket = UdpSocket::from_std(socket.into())?;
    tracing::info!(address = %addr, "UDP telemetry socket bound");
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let socket = bind_udp("127.0.0.1:0".parse().unwrap(), 0).unwrap();
        let local = socket.local_addr().unwrap();
        assert_ne!(local.port(), 0);
    }
}
