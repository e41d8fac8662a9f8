//! layer-gateway — async TCP server hosting the MTProto transport codec.
//!
//! Accepts connections, lets each one negotiate its own wire variant via
//! [`layer_transport::CodecSession`], and hands decoded frames to a
//! [`FrameForwarder`]. Run with:
//!
//!   RUST_LOG=layer_gateway=info cargo run -p layer-gateway
//!
//! Override the listen address or frame size cap via
//! `LAYER_GATEWAY_LISTEN_ADDR` / `LAYER_GATEWAY_MAX_FRAME_SIZE`.

mod config;
mod forwarder;

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use config::GatewayConfig;
use forwarder::{FrameForwarder, LoggingForwarder};
use layer_transport::CodecSession;

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        // SAFETY: set before any other thread is spawned.
        unsafe { std::env::set_var("RUST_LOG", "layer_gateway=info"); }
    }
    env_logger::init();

    if let Err(e) = run().await {
        log::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayConfig::from_env();
    let forwarder: Arc<dyn FrameForwarder> = Arc::new(LoggingForwarder);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    log::info!("listening on {}", config.listen_addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = accepted?;
                let limits = config.limits;
                let forwarder = Arc::clone(&forwarder);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(socket, limits, forwarder).await {
                        log::warn!("connection {peer} ended: {e}");
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down on ctrl-c");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(
    socket: TcpStream,
    limits: layer_transport::FrameLimits,
    forwarder: Arc<dyn FrameForwarder>,
) -> Result<(), layer_transport::CodecError> {
    let mut framed = Framed::new(socket, CodecSession::with_limits(limits));

    while let Some(frame) = framed.next().await {
        let (ack, payload) = frame?;
        if let Some(reply) = forwarder.forward(&payload, ack) {
            framed.send((reply, false)).await?;
        }
    }
    Ok(())
}
