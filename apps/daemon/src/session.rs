use sbus::Session;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub const IKE_PORT: u16 = 500;

/// Simulated IKE security association negotiated by a worker.
#[derive(Debug)]
pub struct IkeSa {
    name: String,
    id: u32,
    local: SocketAddr,
    remote: SocketAddr,
}

impl IkeSa {
    #[must_use]
    pub fn new(id: u32) -> Self {
        let [.., hi, lo] = id.to_be_bytes();
        Self {
            name: format!("conn{id}"),
            id,
            local: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), IKE_PORT),
            remote: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(198, 51, hi, lo)), IKE_PORT),
        }
    }

    #[must_use]
    pub const fn local(&self) -> SocketAddr {
        self.local
    }

    #[must_use]
    pub const fn remote(&self) -> SocketAddr {
        self.remote
    }

    #[must_use]
    pub const fn spi(&self) -> u32 {
        0xc100_0000 | (self.id & 0x00ff_ffff)
    }

    /// Fake Diffie-Hellman secret, logged only at the private level.
    #[must_use]
    pub fn shared_secret(&self) -> Vec<u8> {
        self.id.to_be_bytes().repeat(4)
    }
}

impl Session for IkeSa {
    fn name(&self) -> &str {
        &self.name
    }

    fn unique_id(&self) -> u32 {
        self.id
    }
}
