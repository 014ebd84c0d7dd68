//! SSRF protection for the reader endpoint.
//!
//! An untrusted URL must never steer this process into probing internal
//! networks. Before any network I/O the target host is classified: IP
//! literals directly, hostnames through DNS — and if *any* resolved
//! address falls in a blocked range the request is rejected. The check
//! runs again after redirects against the final URL.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;
use url::{Host, Url};

use crate::{Error, Result};

/// Resolves a hostname to all of its addresses.
///
/// A seam for tests: the production [`SystemResolver`] asks the system
/// resolver, suites substitute fixed answer sets.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolve `host` to every address the resolver knows for it
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>>;
}

/// [`HostResolver`] backed by the operating system resolver
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, port)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Reject `url` unless every address it can reach is public.
///
/// IP-literal hosts are classified directly. `localhost` and any
/// `*.localhost` name are rejected without resolving. Other hostnames are
/// resolved with all address families; one blocked answer rejects the
/// whole URL, so a host that fronts a public address while also resolving
/// to a private one cannot slip through.
///
/// # Errors
///
/// [`Error::BlockedUrl`] for hosts in the blocked set,
/// [`Error::Resolve`] when resolution fails or yields no addresses.
pub async fn ensure_public_url(url: &Url, resolver: &dyn HostResolver) -> Result<()> {
    let host = match url.host() {
        Some(host) => host,
        None => return Err(Error::BlockedUrl("url has no host".to_string())),
    };

    match host {
        Host::Ipv4(addr) => {
            if ip_is_blocked(IpAddr::V4(addr)) {
                return Err(Error::BlockedUrl(format!(
                    "url targets a blocked address: {addr}"
                )));
            }
        }
        Host::Ipv6(addr) => {
            if ip_is_blocked(IpAddr::V6(addr)) {
                return Err(Error::BlockedUrl(format!(
                    "url targets a blocked address: {addr}"
                )));
            }
        }
        Host::Domain(name) => {
            let name = name.to_ascii_lowercase();
            if name == "localhost" || name.ends_with(".localhost") {
                return Err(Error::BlockedUrl("url targets localhost".to_string()));
            }

            let port = url.port_or_known_default().unwrap_or(80);
            let addrs = resolver
                .resolve(&name, port)
                .await
                .map_err(|err| Error::Resolve(err.to_string()))?;
            if addrs.is_empty() {
                return Err(Error::Resolve(format!("no addresses for {name}")));
            }
            if let Some(blocked) = addrs.iter().find(|addr| ip_is_blocked(**addr)) {
                return Err(Error::BlockedUrl(format!(
                    "host {name} resolves to a blocked address: {blocked}"
                )));
            }
        }
    }

    Ok(())
}

/// Check whether an address belongs to a range outbound requests must
/// never reach.
#[must_use]
pub fn ip_is_blocked(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(ipv4) => is_blocked_ipv4(ipv4),
        IpAddr::V6(ipv6) => is_blocked_ipv6(ipv6),
    }
}

/// IPv4 ranges that are loopback, private, reserved, or otherwise
/// non-routable from the public internet.
fn is_blocked_ipv4(addr: Ipv4Addr) -> bool {
    addr.is_loopback()          // 127.0.0.0/8
    || addr.is_private()        // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
    || addr.is_link_local()     // 169.254.0.0/16
    || addr.is_broadcast()      // 255.255.255.255
    || addr.is_unspecified()    // 0.0.0.0
    || is_shared_address(addr)  // 100.64.0.0/10 (CGNAT)
    || is_documentation(addr)   // 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
    || addr.octets()[0] >= 224 // multicast and the reserved block above it
}

/// Check 100.64.0.0/10 (Carrier-Grade NAT / shared address space).
fn is_shared_address(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    octets[0] == 100 && (octets[1] & 0xC0) == 64
}

/// Check documentation ranges (TEST-NET-1/2/3).
fn is_documentation(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    // 192.0.2.0/24
    (octets[0] == 192 && octets[1] == 0 && octets[2] == 2)
    // 198.51.100.0/24
    || (octets[0] == 198 && octets[1] == 51 && octets[2] == 100)
    // 203.0.113.0/24
    || (octets[0] == 203 && octets[1] == 0 && octets[2] == 113)
}

/// IPv6 ranges that are loopback, local, multicast, or that embed a
/// blocked IPv4 address.
#[allow(clippy::cast_possible_truncation)] // Extracting u8 octets from u16 IPv6 segments is intentional
fn is_blocked_ipv6(addr: Ipv6Addr) -> bool {
    // Loopback (::1)
    if addr.is_loopback() {
        return true;
    }
    // Unspecified (::)
    if addr.is_unspecified() {
        return true;
    }
    // Multicast (ff00::/8)
    if addr.is_multicast() {
        return true;
    }

    let segments = addr.segments();

    // Link-local (fe80::/10)
    if segments[0] & 0xFFC0 == 0xFE80 {
        return true;
    }

    // Unique Local Address (fc00::/7)
    if segments[0] & 0xFE00 == 0xFC00 {
        return true;
    }

    // IPv4-mapped IPv6 (`::ffff:x.x.x.x`) -- the classic filter bypass
    if let Some(ipv4) = extract_ipv4_mapped(&addr) {
        return is_blocked_ipv4(ipv4);
    }

    // IPv4-compatible IPv6 (deprecated but still parseable: `::x.x.x.x`)
    if let Some(ipv4) = extract_ipv4_compatible(&addr) {
        return is_blocked_ipv4(ipv4);
    }

    // 6to4 (2002::/16) can embed a private IPv4
    if segments[0] == 0x2002 {
        let embedded = Ipv4Addr::new(
            (segments[1] >> 8) as u8,
            segments[1] as u8,
            (segments[2] >> 8) as u8,
            segments[2] as u8,
        );
        return is_blocked_ipv4(embedded);
    }

    // Teredo (2001:0000::/32) embeds the client IPv4 XORed with 0xFFFF
    if segments[0] == 0x2001 && segments[1] == 0x0000 {
        let client_ipv4 = Ipv4Addr::new(
            (segments[6] >> 8) as u8 ^ 0xFF,
            segments[6] as u8 ^ 0xFF,
            (segments[7] >> 8) as u8 ^ 0xFF,
            segments[7] as u8 ^ 0xFF,
        );
        return is_blocked_ipv4(client_ipv4);
    }

    false
}

/// Extract the IPv4 address from IPv4-mapped IPv6 (`::ffff:x.x.x.x`).
#[allow(clippy::cast_possible_truncation)] // Extracting u8 octets from u16 IPv6 segments is intentional
fn extract_ipv4_mapped(addr: &Ipv6Addr) -> Option<Ipv4Addr> {
    let segments = addr.segments();
    // ::ffff:x.x.x.x has segments [0,0,0,0,0,0xFFFF, hi, lo]
    if segments[0] == 0
        && segments[1] == 0
        && segments[2] == 0
        && segments[3] == 0
        && segments[4] == 0
        && segments[5] == 0xFFFF
    {
        Some(Ipv4Addr::new(
            (segments[6] >> 8) as u8,
            segments[6] as u8,
            (segments[7] >> 8) as u8,
            segments[7] as u8,
        ))
    } else {
        None
    }
}

/// Extract the IPv4 address from IPv4-compatible IPv6 (`::x.x.x.x`).
#[allow(clippy::cast_possible_truncation)] // Extracting u8 octets from u16 IPv6 segments is intentional
fn extract_ipv4_compatible(addr: &Ipv6Addr) -> Option<Ipv4Addr> {
    let segments = addr.segments();
    // All-zero prefix with non-zero tail (excluding :: and ::1)
    if segments[0] == 0
        && segments[1] == 0
        && segments[2] == 0
        && segments[3] == 0
        && segments[4] == 0
        && segments[5] == 0
        && (segments[6] != 0 || segments[7] > 1)
    {
        Some(Ipv4Addr::new(
            (segments[6] >> 8) as u8,
            segments[6] as u8,
            (segments[7] >> 8) as u8,
            segments[7] as u8,
        ))
    } else {
        None
    }
}
