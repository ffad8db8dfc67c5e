// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Network diagnostics: interfaces, ping, traceroute, telnet and port scans.
// Author: Lukas Bower

//! Network operations.
//!
//! `ping`, `traceroute` and `network` wrap the platform tools and track the
//! child process on the cancel token. `telnet` and `scan` use plain TCP
//! connects with a timeout.

use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

use super::{arg, capture};
use crate::engine::CancelToken;
use crate::error::{ArgError, OpError, OpResult};

/// Echo requests sent by `ping`.
pub const PING_COUNT: u32 = 4;

const DEFAULT_SCAN_START: u16 = 1;
const DEFAULT_SCAN_END: u16 = 1024;
const DEFAULT_SCAN_TIMEOUT: f64 = 1.0;
const DEFAULT_TELNET_PORT: u16 = 23;
const DEFAULT_TELNET_TIMEOUT: u64 = 10;

const WELL_KNOWN_PORTS: &[(u16, &str)] = &[
    (21, "ftp"),
    (22, "ssh"),
    (23, "telnet"),
    (25, "smtp"),
    (53, "domain"),
    (80, "http"),
    (110, "pop3"),
    (143, "imap"),
    (443, "https"),
    (445, "microsoft-ds"),
    (993, "imaps"),
    (995, "pop3s"),
    (3306, "mysql"),
    (3389, "ms-wbt-server"),
    (5432, "postgresql"),
    (6379, "redis"),
    (8080, "http-alt"),
];

fn service_name(port: u16) -> &'static str {
    WELL_KNOWN_PORTS
        .iter()
        .find(|(known, _)| *known == port)
        .map_or("unknown service", |(_, name)| name)
}

fn resolve(host: &str) -> Result<IpAddr, OpError> {
    let addrs = (host, 0)
        .to_socket_addrs()
        .map_err(|_| OpError::Resolve(host.to_owned()))?
        .collect::<Vec<_>>();
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .map(SocketAddr::ip)
        .ok_or_else(|| OpError::Resolve(host.to_owned()))
}

/// `network`: interface configuration as reported by the platform tool.
pub fn interfaces(_args: &[String], token: &CancelToken) -> OpResult {
    if cfg!(windows) {
        return capture("ipconfig", &["/all"], token);
    }
    match capture("ifconfig", &[], token) {
        Err(OpError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            debug!("ifconfig unavailable, falling back to ip addr");
            capture("ip", &["addr"], token)
        }
        other => other,
    }
}

/// `ping host`.
pub fn ping(args: &[String], token: &CancelToken) -> OpResult {
    let host = arg(args, 0).unwrap_or_default();
    let count = PING_COUNT.to_string();
    let flag = if cfg!(windows) { "-n" } else { "-c" };
    capture("ping", &[flag, count.as_str(), host], token)
}

/// `traceroute host`.
pub fn traceroute(args: &[String], token: &CancelToken) -> OpResult {
    let host = arg(args, 0).unwrap_or_default();
    if cfg!(windows) {
        capture("tracert", &[host], token)
    } else {
        capture("traceroute", &[host], token)
    }
}

/// Typed arguments of `telnet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelnetRequest {
    /// Target host.
    pub host: String,
    /// Target port.
    pub port: u16,
    /// Connect timeout in whole seconds.
    pub timeout_secs: u64,
}

impl TelnetRequest {
    /// Bind `host [port] [timeout]`.
    pub fn from_args(args: &[String]) -> Result<Self, ArgError> {
        let host = arg(args, 0).unwrap_or_default().to_owned();
        let port = match arg(args, 1) {
            None => DEFAULT_TELNET_PORT,
            Some(text) => text
                .parse()
                .map_err(|_| ArgError::invalid(format!("Invalid port number: {text}")))?,
        };
        let timeout_secs = match arg(args, 2) {
            None => DEFAULT_TELNET_TIMEOUT,
            Some(text) => text
                .parse()
                .map_err(|_| ArgError::invalid("Timeout must be an integer"))?,
        };
        Ok(Self {
            host,
            port,
            timeout_secs,
        })
    }
}

/// `telnet host [port] [timeout]`: report whether a TCP connection can be established.
///
/// A refused or timed-out connect is reported as result text.
pub fn telnet(args: &[String], _token: &CancelToken) -> OpResult {
    let request = TelnetRequest::from_args(args)?;
    let ip = resolve(&request.host)?;
    let timeout = Duration::from_secs(request.timeout_secs.max(1));
    match TcpStream::connect_timeout(&SocketAddr::new(ip, request.port), timeout) {
        Ok(_) => Ok(format!(
            "Successfully connected to {} on port {}. Connection established.",
            request.host, request.port
        )),
        Err(err) => Ok(format!(
            "Failed to connect to {} on port {}. Error code: {} ({err})",
            request.host,
            request.port,
            err.raw_os_error().unwrap_or_default()
        )),
    }
}

/// Typed arguments of `scan`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    /// Target host.
    pub host: String,
    /// First port, inclusive.
    pub start_port: u16,
    /// Last port, inclusive.
    pub end_port: u16,
    /// Per-port connect timeout in seconds.
    pub timeout: f64,
}

impl ScanRequest {
    /// Bind `host [start_port] [end_port] [timeout]`.
    ///
    /// The error text depends on how many fields were supplied.
    pub fn from_args(args: &[String]) -> Result<Self, ArgError> {
        let host = arg(args, 0).unwrap_or_default().to_owned();
        let (start_port, end_port, timeout) = match args.len() {
            0 | 1 => (DEFAULT_SCAN_START, DEFAULT_SCAN_END, DEFAULT_SCAN_TIMEOUT),
            2 => {
                let port = args[1]
                    .parse()
                    .map_err(|_| ArgError::invalid("Port must be an integer"))?;
                (port, DEFAULT_SCAN_END, DEFAULT_SCAN_TIMEOUT)
            }
            3 => {
                match (args[1].parse::<u16>(), args[2].parse::<u16>()) {
                    (Ok(start), Ok(end)) => (start, end, DEFAULT_SCAN_TIMEOUT),
                    _ => return Err(ArgError::invalid("Ports must be integers")),
                }
            }
            _ => {
                match (
                    args[1].parse::<u16>(),
                    args[2].parse::<u16>(),
                    args[3].parse::<f64>(),
                ) {
                    (Ok(start), Ok(end), Ok(timeout)) => (start, end, timeout),
                    _ => return Err(ArgError::invalid("Invalid parameters")),
                }
            }
        };
        if start_port == 0 || start_port > end_port {
            return Err(ArgError::invalid(format!(
                "Invalid port range {start_port}-{end_port}"
            )));
        }
        if !(timeout.is_finite() && timeout > 0.0) {
            return Err(ArgError::invalid("Timeout must be a positive number of seconds"));
        }
        Ok(Self {
            host,
            start_port,
            end_port,
            timeout,
        })
    }
}

/// `scan host [start_port] [end_port] [timeout]`: list open TCP ports.
///
/// Cancellation is checked before every port.
pub fn scan_ports(args: &[String], token: &CancelToken) -> OpResult {
    let request = ScanRequest::from_args(args)?;
    let ip = resolve(&request.host)?;
    let timeout = Duration::from_secs_f64(request.timeout);
    debug!(
        "scanning {} ({ip}) ports {}-{}",
        request.host, request.start_port, request.end_port
    );
    let mut open = Vec::new();
    for port in request.start_port..=request.end_port {
        if token.is_cancelled() {
            return Err(OpError::Cancelled);
        }
        if TcpStream::connect_timeout(&SocketAddr::new(ip, port), timeout).is_ok() {
            open.push(format!("Port {port}: {}", service_name(port)));
        }
    }
    if open.is_empty() {
        return Ok(format!("No open ports found on {}", request.host));
    }
    Ok(open.join("\n"))
}
