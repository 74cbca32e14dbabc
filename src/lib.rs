use anyhow::Error;
use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub mod engine;
pub mod layers;
pub mod oskbd;
pub mod tcp_server;

#[cfg(any(test, feature = "simulated_output", not(target_os = "windows")))]
pub mod sim;

pub use engine::*;
pub use tcp_server::TcpServer;


pub struct ValidatedArgs {
    pub path: PathBuf,
    #[cfg(feature = "tcp_server")]
    pub tcp_server_address: Option<SocketAddrWrapper>,
    pub nodelay: bool,
}

/// `keylayer.json` in the working directory, else the one in the user's config directory.
pub fn default_cfg() -> Option<PathBuf> {
    let default = PathBuf::from("keylayer.json");
    if default.is_file() {
        return Some(default);
    }
    let fallback = dirs::config_dir()?.join("keylayer").join("keylayer.json");
    fallback.is_file().then_some(fallback)
}

#[derive(Debug, Clone)]
pub struct SocketAddrWrapper(SocketAddr);

impl FromStr for SocketAddrWrapper {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut address = s.to_string();
        if let Ok(port) = s.parse::<u16>() {
            address = format!("127.0.0.1:{port}");
        } else if !is_address_format(s) {
            return Err(anyhow::Error::msg(
                "please specify either a port number, e.g. 8081 or an address, e.g. 127.0.0.1:8081",
            ));
        }
        address
            .parse::<SocketAddr>()
            .map(SocketAddrWrapper)
            .map_err(|e| e.into())
    }
}

impl SocketAddrWrapper {
    pub fn into_inner(self) -> SocketAddr {
        self.0
    }
    pub fn get_ref(&self) -> &SocketAddr {
        &self.0
    }
}

fn is_address_format(addr: &str) -> bool {
    if let Some((host, port)) = addr.rsplit_once(':') {
        if host.is_empty() {
            return false;
        }
        if let Ok(port_num) = port.parse::<u16>() {
            return port_num > 0;
        }
    }
    false
}

#[test]
fn socket_addr_accepts_port_or_address() {
    assert_eq!(
        "8081".parse::<SocketAddrWrapper>().unwrap().into_inner(),
        "127.0.0.1:8081".parse::<SocketAddr>().unwrap()
    );
    assert_eq!(
        "0.0.0.0:9000".parse::<SocketAddrWrapper>().unwrap().get_ref().port(),
        9000
    );
    assert!("localhost".parse::<SocketAddrWrapper>().is_err());
    assert!(":80".parse::<SocketAddrWrapper>().is_err());
}
