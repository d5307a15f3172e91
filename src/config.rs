//! CLI surface: a bind address and a port, nothing else. See DESIGN.md for
//! why this stays a plain `clap` struct rather than the file-backed,
//! multi-section config the teacher crate uses — the wider config surface
//! (auth, rate limits, TLS, database) has no equivalent feature here.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "chat-gateway", about = "Stateful multi-user chat gateway")]
pub struct Args {
    /// Address to bind the HTTP/WebSocket listener to.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Port to bind the HTTP/WebSocket listener to.
    #[arg(long, default_value_t = 31337)]
    pub port: u16,
}

impl Args {
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address '{addr}': {e}"))
    }
}
