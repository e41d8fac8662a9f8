//! Gateway configuration, read from the environment with hardcoded defaults.
//!
//! No config crate: the codec workspace follows plain consts and `std::env`
//! overrides throughout, and the gateway binary is no exception.

use layer_transport::FrameLimits;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8443";

pub struct GatewayConfig {
    pub listen_addr: String,
    pub limits: FrameLimits,
}

impl GatewayConfig {
    /// Reads `LAYER_GATEWAY_LISTEN_ADDR` and `LAYER_GATEWAY_MAX_FRAME_SIZE`,
    /// falling back to the codec's own defaults for anything unset or
    /// unparseable.
    pub fn from_env() -> Self {
        let listen_addr = std::env::var("LAYER_GATEWAY_LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());

        let mut limits = FrameLimits::default();
        if let Ok(raw) = std::env::var("LAYER_GATEWAY_MAX_FRAME_SIZE") {
            match raw.parse::<usize>() {
                Ok(max_frame_size) => limits.max_frame_size = max_frame_size,
                Err(_) => log::warn!("ignoring unparseable LAYER_GATEWAY_MAX_FRAME_SIZE={raw:?}"),
            }
        }

        Self { listen_addr, limits }
    }
}
