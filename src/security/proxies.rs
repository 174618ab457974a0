//! Trusted proxy ranges and client IP resolution.
//!
//! # Responsibilities
//! - Parse the configured proxy list (single IPs or CIDR ranges)
//! - Resolve the real client IP from `X-Forwarded-For`
//! - Attach the resolved IP to each request
//!
//! # Design Decisions
//! - Never trust existing X-Forwarded-For from untrusted peers
//! - The client is the right-most hop that is not a trusted proxy

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use thiserror::Error;

/// Name of the forwarding header inspected for the original client.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// A proxy network range, e.g. `10.0.0.0/8` or `::1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedProxy {
    network: IpAddr,
    prefix_len: u8,
}

/// Error for proxy entries that are neither an IP nor a CIDR range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid trusted proxy '{0}', expected an IP address or CIDR range")]
pub struct InvalidProxyError(pub String);

impl TrustedProxy {
    /// Whether `ip` falls inside this range.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, canonical(ip)) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = mask_u32(self.prefix_len);
                u32::from(net) & mask == u32::from(addr) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = mask_u128(self.prefix_len);
                u128::from(net) & mask == u128::from(addr) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for TrustedProxy {
    type Err = InvalidProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidProxyError(s.to_string());
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };

        let network: IpAddr = addr.trim().parse().map_err(|_| invalid())?;
        let max_len = if network.is_ipv4() { 32 } else { 128 };
        let prefix_len = match prefix {
            Some(p) => p.trim().parse::<u8>().map_err(|_| invalid())?,
            None => max_len,
        };
        if prefix_len > max_len {
            return Err(invalid());
        }

        Ok(Self {
            network,
            prefix_len,
        })
    }
}

impl fmt::Display for TrustedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

/// Parse a comma separated proxy list, skipping blank entries.
pub fn parse_proxy_list(raw: &str) -> Result<Vec<TrustedProxy>, InvalidProxyError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(TrustedProxy::from_str)
        .collect()
}

fn mask_u32(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (32 - u32::from(n)),
    }
}

fn mask_u128(prefix_len: u8) -> u128 {
    match prefix_len {
        0 => 0,
        n => u128::MAX << (128 - u32::from(n)),
    }
}

// IPv4-mapped IPv6 peers (dual-stack sockets) compare as IPv4.
fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

/// Resolved address of the client that originated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Resolve the client IP for a request received from `peer`.
pub fn resolve_client_ip(peer: IpAddr, headers: &HeaderMap, trusted: &[TrustedProxy]) -> IpAddr {
    let is_trusted = |ip: IpAddr| trusted.iter().any(|proxy| proxy.contains(ip));
    if !is_trusted(peer) {
        return peer;
    }

    let hops: Vec<IpAddr> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|hop| hop.trim().parse().ok())
        .collect();

    // Walk from the nearest hop outwards until an untrusted address shows up.
    let mut client = peer;
    for hop in hops.into_iter().rev() {
        client = hop;
        if !is_trusted(hop) {
            break;
        }
    }
    client
}

/// Middleware attaching a [`ClientIp`] extension to every request.
///
/// Requests without connection info (e.g. in-process tests) pass through untouched.
pub async fn client_ip_middleware(
    State(trusted): State<Arc<Vec<TrustedProxy>>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if let Some(peer) = peer {
        let client = resolve_client_ip(peer, request.headers(), &trusted);
        tracing::Span::current().record("client_ip", tracing::field::display(client));
        request.extensions_mut().insert(ClientIp(client));
    }

    next.run(request).await
}
