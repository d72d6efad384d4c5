use shared::{
    max_list_len, DEFAULT_MAX_MEMBERS, DEFAULT_MAX_ROOMS, DEFAULT_PROBE_PERIOD_SECS,
    DEFAULT_SERVER_PORT, ENCODED_ROOM_SUMMARY, MAX_ENCODED_ENDPOINT, MAX_ENCODED_MEMBER_NAME,
};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// A limit the server cannot honour.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    Zero(&'static str),

    #[error("{what} of {value} does not fit one datagram (at most {max})")]
    TooLarge {
        what: &'static str,
        value: usize,
        max: usize,
    },

    #[error("probe period must be longer than zero")]
    ZeroProbePeriod,
}

/// Runtime limits and bind addresses of the room server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Room/control traffic.
    pub control_addr: SocketAddr,
    /// Liveness probes and their responses.
    pub probe_addr: SocketAddr,
    /// Maximum number of rooms active at once.
    pub max_rooms: usize,
    /// Maximum number of members per room.
    pub max_members: usize,
    /// Length of one liveness cycle.
    pub probe_period: Duration,
}

impl ServerConfig {
    /// Binds control traffic to `port` and liveness traffic to `port + 1`.
    pub fn on_port(host: std::net::IpAddr, port: u16) -> Self {
        Self {
            control_addr: SocketAddr::new(host, port),
            probe_addr: SocketAddr::new(host, port.wrapping_add(1)),
            ..Self::default()
        }
    }

    /// Checks that every list the server sends stays within one payload:
    /// member snapshots, name query answers and the room list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rooms == 0 {
            return Err(ConfigError::Zero("max rooms"));
        }
        if self.max_members == 0 {
            return Err(ConfigError::Zero("max members"));
        }
        if self.probe_period.is_zero() {
            return Err(ConfigError::ZeroProbePeriod);
        }

        let members =
            max_list_len(MAX_ENCODED_ENDPOINT).min(max_list_len(MAX_ENCODED_MEMBER_NAME));
        if self.max_members > members {
            return Err(ConfigError::TooLarge {
                what: "max members",
                value: self.max_members,
                max: members,
            });
        }

        let rooms = max_list_len(ENCODED_ROOM_SUMMARY);
        if self.max_rooms > rooms {
            return Err(ConfigError::TooLarge {
                what: "max rooms",
                value: self.max_rooms,
                max: rooms,
            });
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            control_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_SERVER_PORT)),
            probe_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_SERVER_PORT + 1)),
            max_rooms: DEFAULT_MAX_ROOMS,
            max_members: DEFAULT_MAX_MEMBERS,
            probe_period: Duration::from_secs(DEFAULT_PROBE_PERIOD_SECS),
        }
    }
}
