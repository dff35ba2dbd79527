//! Network indicator scanners: IP addresses, hostnames, URLs and `host:port` pairs

use std::net::IpAddr;

use url::{Host, Url};

use crate::buffer::ValueBuffer;
use crate::field::FieldId;

/// Writes the input to the IP field if it is an IPv4 or IPv6 address
pub fn scan_ip(input: &str, values: &mut ValueBuffer) {
    if input.parse::<IpAddr>().is_ok() {
        values.write_value(FieldId::IP_ADDRESS, input);
    }
}

/// Classifies the input as an IP address or a domain name.
///
/// Bracketed IPv6 literals (`[::1]`) are unwrapped first.
pub fn scan_hostname(input: &str, values: &mut ValueBuffer) {
    let host = input
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(input);
    if host.is_empty() {
        return;
    }
    if host.parse::<IpAddr>().is_ok() {
        values.write_value(FieldId::IP_ADDRESS, host);
    } else {
        values.write_value(FieldId::DOMAIN_NAME, host);
    }
}

/// Scans the host part of an absolute URL
pub fn scan_url(input: &str, values: &mut ValueBuffer) {
    let Ok(url) = Url::parse(input) else {
        return;
    };
    match url.host() {
        Some(Host::Domain(domain)) => scan_hostname(domain, values),
        Some(Host::Ipv4(ip)) => values.write_value(FieldId::IP_ADDRESS, &ip.to_string()),
        Some(Host::Ipv6(ip)) => values.write_value(FieldId::IP_ADDRESS, &ip.to_string()),
        None => {}
    }
}

/// Scans a network address of the form `host:port` or `[v6]:port`.
///
/// Input that does not split into host and port is scanned as a hostname.
pub fn scan_net_addr(input: &str, values: &mut ValueBuffer) {
    match split_host_port(input) {
        Some(host) => scan_hostname(host, values),
        None => scan_hostname(input, values),
    }
}

fn split_host_port(input: &str) -> Option<&str> {
    if let Some(rest) = input.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        after.strip_prefix(':')?;
        return Some(host);
    }
    // More than one colon without brackets is a bare IPv6 address
    let (host, port) = input.rsplit_once(':')?;
    if host.contains(':') || port.contains(']') {
        return None;
    }
    Some(host)
}
