//! Broker discovery on the local subnet.
//!
//! When the active network has no fixed broker address the connector probes
//! the default gateway first, then the low host addresses of the subnet.

use core::net::Ipv4Addr;

use crate::app::ports::IpInfo;

/// Per-address TCP probe timeout.
pub const ENDPOINT_PROBE_TIMEOUT_MS: u32 = 200;
/// Highest host number probed after the gateway (`.1 ..= .20`).
pub const SCAN_HOST_LIMIT: u32 = 20;

/// First address of the subnet `info` belongs to.
pub fn network_address(info: &IpInfo) -> Ipv4Addr {
    Ipv4Addr::from(info.address.to_bits() & info.netmask.to_bits())
}

/// Number of usable host addresses in the subnet (excludes network and
/// broadcast addresses).
pub fn host_count(info: &IpInfo) -> u32 {
    let host_bits = !info.netmask.to_bits();
    host_bits.saturating_sub(1)
}

/// Addresses to probe, in order: gateway first, then hosts
/// `1..=min(SCAN_HOST_LIMIT, host_count)`, skipping our own address and the
/// gateway.
pub fn probe_order(info: &IpInfo) -> impl Iterator<Item = Ipv4Addr> + '_ {
    let base = network_address(info).to_bits();
    let last = SCAN_HOST_LIMIT.min(host_count(info));
    let gateway = (!info.gateway.is_unspecified()).then_some(info.gateway);

    gateway.into_iter().chain(
        (1..=last)
            .map(move |host| Ipv4Addr::from(base | host))
            .filter(move |addr| *addr != info.address && *addr != info.gateway),
    )
}
