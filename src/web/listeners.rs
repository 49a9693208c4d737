use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;

const LISTEN_BACKLOG: i32 = 1024;

/// Binds the HTTP listener. `*` means every interface: IPv6 dual-stack when the
/// system supports it, IPv4 otherwise. Anything else is resolved as `host:port`.
pub async fn create_listener(
    host: &str,
    port: u16,
) -> std::io::Result<(String, tokio::net::TcpListener)> {
    if host == "*" {
        return bind_wildcard(port);
    }

    let addr = format!("{}:{}", host, port);
    tracing::info!("Attempting to bind server to {}...", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;

    Ok((local.to_string(), listener))
}

fn bind_wildcard(port: u16) -> std::io::Result<(String, tokio::net::TcpListener)> {
    let ipv6 = SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, port));
    tracing::info!("Attempting to bind server to {}... (IPv6 + IPv4 dual-stack)", ipv6);

    match bind_socket(ipv6, true) {
        Ok(listener) => return Ok(listener),
        Err(e) => tracing::warn!("Failed to bind IPv6 listener ({}). Attempting IPv4 only.", e),
    }

    let ipv4 = SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, port));
    tracing::info!("Attempting to bind server to {}... (IPv4)", ipv4);
    bind_socket(ipv4, false)
}

fn bind_socket(
    addr: SocketAddr,
    dual_stack: bool,
) -> std::io::Result<(String, tokio::net::TcpListener)> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // Some systems refuse dual-stack; an IPv6-only socket is still useful there.
    if dual_stack {
        if let Err(e) = socket.set_only_v6(false) {
            tracing::warn!("Failed to enable dual-stack mode: {}. Continuing anyway.", e);
        }
    }

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;

    let std_listener: std::net::TcpListener = socket.into();
    let listener = tokio::net::TcpListener::from_std(std_listener)?;
    let local = listener.local_addr()?;

    Ok((local.to_string(), listener))
}
