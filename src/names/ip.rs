// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! IP range constraints and CIDR containment.
//!
//! IPv4-mapped IPv6 values (`::ffff:a.b.c.d`) are canonicalized to IPv4 on
//! both sides of the containment test, so `127.0.0.1` is contained in
//! `127.0.0.0/24` no matter which representation either side arrived in.
//! Mismatched address families never match.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{PolicyError, Result};

/// An IP network expressed as a base address and prefix length.
///
/// Host bits of the base address are zeroed at construction, so
/// `10.1.2.3/8` and `10.0.0.0/8` denote the same network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNetwork {
    addr: IpAddr,
    prefix_len: u8,
}

impl IpNetwork {
    /// Create a network from a base address and prefix length.
    ///
    /// # Errors
    ///
    /// Fails when the prefix length exceeds the address family width
    /// (32 for IPv4, 128 for IPv6).
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self> {
        let (addr, prefix_len) = match addr {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) if prefix_len >= 96 => (IpAddr::V4(v4), prefix_len - 96),
                _ => (IpAddr::V6(v6), prefix_len),
            },
            v4 => (v4, prefix_len),
        };

        let addr = match addr {
            IpAddr::V4(a) => {
                if prefix_len > 32 {
                    return Err(PolicyError::cannot_parse(
                        "ip range",
                        format!("{a}/{prefix_len}"),
                    ));
                }
                IpAddr::V4(Ipv4Addr::from(u32::from(a) & v4_mask(prefix_len)))
            }
            IpAddr::V6(a) => {
                if prefix_len > 128 {
                    return Err(PolicyError::cannot_parse(
                        "ip range",
                        format!("{a}/{prefix_len}"),
                    ));
                }
                IpAddr::V6(Ipv6Addr::from(u128::from(a) & v6_mask(prefix_len)))
            }
        };

        Ok(Self { addr, prefix_len })
    }

    /// Create a network containing exactly one address.
    pub fn host(addr: IpAddr) -> Self {
        match canonical_ip(addr) {
            v4 @ IpAddr::V4(_) => Self {
                addr: v4,
                prefix_len: 32,
            },
            v6 @ IpAddr::V6(_) => Self {
                addr: v6,
                prefix_len: 128,
            },
        }
    }

    /// The (masked, canonicalized) base address of the network.
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// The prefix length in bits.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Standard CIDR containment: is `ip` inside this network?
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, canonical_ip(ip)) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                u32::from(ip) & v4_mask(self.prefix_len) == u32::from(net)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                u128::from(ip) & v6_mask(self.prefix_len) == u128::from(net)
            }
            _ => false,
        }
    }
}

impl FromStr for IpNetwork {
    type Err = PolicyError;

    /// Parse `"10.0.0.0/8"`, `"2001:db8::/32"`, or a bare address (which
    /// becomes a host-length network).
    fn from_str(s: &str) -> Result<Self> {
        let err = || PolicyError::cannot_parse("ip range", s);
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr.parse().map_err(|_| err())?;
                let prefix_len: u8 = prefix.parse().map_err(|_| err())?;
                Self::new(addr, prefix_len).map_err(|_| err())
            }
            None => {
                let addr: IpAddr = s.parse().map_err(|_| err())?;
                Ok(Self::host(addr))
            }
        }
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

/// Reduce IPv4-mapped IPv6 addresses to their IPv4 form.
fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
        v4 => v4,
    }
}

fn v4_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len.min(32)))
    }
}

fn v6_mask(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix_len.min(128)))
    }
}

/// Check whether `ip` falls within the network `constraint`.
pub(crate) fn match_ip_constraint(ip: IpAddr, constraint: &IpNetwork) -> Result<bool> {
    Ok(constraint.contains(ip))
}
