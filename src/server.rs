//! A thin TCP listener around the connection driver.
//!
//! Everything protocol-shaped lives in the core; this just binds a socket
//! with the configured backlog and spawns one task per accepted
//! connection. TLS and fancier listeners wrap the core the same way from
//! outside the crate: anything `AsyncRead + AsyncWrite` can be fed to
//! [`serve_connection`](crate::proto::serve_connection).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

use crate::error::Error;
use crate::proto::serve_connection;
use crate::response::default_server_header;
use crate::router::Router;
use crate::Result;

/// Listener configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind.
    pub address: IpAddr,
    /// Port to bind.
    pub port: u16,
    /// Listen backlog handed to the OS.
    pub backlog: i32,
    /// The `Server` header value stamped on responses.
    pub server: String,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            backlog: 1024,
            server: default_server_header(),
        }
    }
}

/// Accepts TCP connections and drives each through the router.
#[derive(Debug)]
pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    /// Creates a server over a finished routing tree.
    pub fn new(router: Router, config: ServerConfig) -> Server {
        Server {
            router: Arc::new(router),
            config,
        }
    }

    /// Binds the listener and accepts until the task is dropped.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(self.config.address, self.config.port);
        let listener = bind(addr, self.config.backlog)?;
        log::debug!("listening on {}", addr);
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    log::error!("accept failed: {}", err);
                    continue;
                }
            };
            let _ = stream.set_nodelay(true);
            let router = Arc::clone(&self.router);
            let server = self.config.server.clone();
            tokio::spawn(async move {
                let _ = serve_connection(stream, peer, router, server).await;
            });
        }
    }
}

fn bind(addr: SocketAddr, backlog: i32) -> Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(Error::new_io)?;
    socket.set_reuse_address(true).map_err(Error::new_io)?;
    socket.bind(&addr.into()).map_err(Error::new_io)?;
    socket.listen(backlog).map_err(Error::new_io)?;
    socket.set_nonblocking(true).map_err(Error::new_io)?;
    TcpListener::from_std(socket.into()).map_err(Error::new_io)
}

#[cfg(test)]
mod tests {
    use super::{bind, Server, ServerConfig};
    use crate::router::Router;

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let listener = bind(addr, 16).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn config_defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.backlog > 0);
        assert!(config.server.starts_with("wicket/"));
        let _ = Server::new(Router::new(), config);
    }
}
