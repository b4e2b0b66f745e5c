//! The server orchestrator: binds the TCP and UDP sockets, accepts
//! connections up to `max_connections`, and owns the shared cycle table all
//! sessions rotate through.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use doip_config::model::Gateway;
use doip_runtime::CycleTable;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{info, warn};

use crate::{session, udp};

/// Binds the TCP listener and UDP socket at `gateway.host:gateway.port`.
/// Split out from [`run`] so tests can bind on an ephemeral port (`port: 0`)
/// and read back the address the OS actually assigned.
pub async fn bind(gateway: &Gateway) -> std::io::Result<(TcpListener, UdpSocket)> {
    let bind_addr: SocketAddr = format!("{}:{}", gateway.host, gateway.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("bad bind address: {e}")))?;

    let tcp_listener = TcpListener::bind(bind_addr).await?;
    let udp_socket = UdpSocket::bind(bind_addr).await?;
    Ok((tcp_listener, udp_socket))
}

/// Runs the gateway until `shutdown` resolves. Returns once the listener is
/// closed and, on a best-effort basis, in-flight sessions have had up to the
/// configured idle timeout to drain.
pub async fn run(gateway: Gateway, shutdown: impl std::future::Future<Output = ()>) -> std::io::Result<()> {
    let (tcp_listener, udp_socket) = bind(&gateway).await?;
    info!(host = gateway.host.as_str(), port = gateway.port, ecus = gateway.ecus.len(), "gateway listening");
    serve(gateway, tcp_listener, udp_socket, shutdown).await
}

/// Drives already-bound sockets to completion. [`run`] is `bind` followed by
/// this; exposed separately so integration tests can bind on port 0 and
/// connect to the OS-assigned address before handing the sockets off here.
pub async fn serve(
    gateway: Gateway,
    tcp_listener: TcpListener,
    udp_socket: UdpSocket,
    shutdown: impl std::future::Future<Output = ()>,
) -> std::io::Result<()> {
    let gateway = Arc::new(gateway);
    let cycle_table = Arc::new(CycleTable::new());
    let open_sockets = Arc::new(AtomicUsize::new(0));

    let udp_task = tokio::spawn(udp::run(udp_socket, gateway.clone(), cycle_table.clone(), open_sockets.clone()));

    let accept_loop = accept_connections(tcp_listener, gateway.clone(), cycle_table.clone(), open_sockets.clone());

    tokio::select! {
        result = accept_loop => {
            if let Err(e) = result {
                warn!(error = %e, "accept loop terminated with an error");
            }
        }
        _ = shutdown => {
            info!("shutdown signal received, draining in-flight sessions");
            tokio::time::sleep(gateway.idle_timeout).await;
        }
    }

    udp_task.abort();
    info!("gateway shut down");
    Ok(())
}

async fn accept_connections(
    listener: TcpListener,
    gateway: Arc<Gateway>,
    cycle_table: Arc<CycleTable>,
    open_sockets: Arc<AtomicUsize>,
) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;

        if open_sockets.load(Ordering::Relaxed) >= gateway.max_connections {
            warn!(%peer, max = gateway.max_connections, "connection limit reached, rejecting");
            drop(stream);
            continue;
        }

        open_sockets.fetch_add(1, Ordering::Relaxed);
        info!(%peer, "accepted connection");

        let gateway = gateway.clone();
        let cycle_table = cycle_table.clone();
        let open_sockets = open_sockets.clone();
        tokio::spawn(async move {
            session::run(stream, peer, gateway, cycle_table).await;
            open_sockets.fetch_sub(1, Ordering::Relaxed);
        });
    }
}
