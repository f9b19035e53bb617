//! IPv4 CIDR matching for the crawler allow-list

use std::net::Ipv4Addr;

/// Whether `ip` falls inside `range` (`a.b.c.d/n`, `n` in 0..=32).
///
/// Malformed input is never in range, including a range without a prefix
/// length or with a prefix that is not plain decimal digits.
pub fn ip_in_range(ip: &str, range: &str) -> bool {
    let Ok(ip) = ip.trim().parse::<Ipv4Addr>() else {
        return false;
    };

    let Some((network, bits)) = range.trim().split_once('/') else {
        return false;
    };
    let Ok(network) = network.parse::<Ipv4Addr>() else {
        return false;
    };
    if bits.is_empty() || bits.len() > 2 || !bits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Ok(bits) = bits.parse::<u32>() else {
        return false;
    };
    if bits > 32 {
        return false;
    }

    let mask = u32::MAX.checked_shl(32 - bits).unwrap_or(0);
    u32::from(ip) & mask == u32::from(network) & mask
}

/// Whether `ip` matches any of `ranges`
pub fn in_any_range<S: AsRef<str>>(ip: &str, ranges: &[S]) -> bool {
    ranges.iter().any(|range| ip_in_range(ip, range.as_ref()))
}
