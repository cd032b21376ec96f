//! TCP reachability probe for broker discovery.
//!
//! A plain `connect_timeout` on the std socket layer; lwIP provides it on
//! the device, the host OS in simulation. The connection is dropped as soon
//! as the handshake completes.

use core::net::SocketAddrV4;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use log::debug;

use crate::app::ports::EndpointProbe;

#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProbe;

impl TcpProbe {
    pub fn new() -> Self {
        Self
    }
}

impl EndpointProbe for TcpProbe {
    fn accepts(&mut self, addr: SocketAddrV4, timeout_ms: u32) -> bool {
        let timeout = Duration::from_millis(u64::from(timeout_ms.max(1)));
        match TcpStream::connect_timeout(&SocketAddr::V4(addr), timeout) {
            Ok(_) => true,
            Err(e) => {
                debug!("probe: {} unreachable ({})", addr, e.kind());
                false
            }
        }
    }
}
