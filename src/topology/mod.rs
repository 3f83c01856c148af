pub mod builder;
pub mod edge;
pub mod graph;

use std::fmt;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

pub use builder::TopologyBuilder;
pub use edge::{EdgeKey, Successor};
pub use graph::{Interface, Router, TopologyGraph};

/// Handle of an interned interface address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterfaceId(pub u32);

/// Handle of an interned router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouterId(pub u32);

impl InterfaceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl RouterId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Network that contains `address` at the configured prefix length.
pub fn subnet_of(address: IpAddr, v4_prefix: u8, v6_prefix: u8) -> Option<IpNetwork> {
    let prefix = match address {
        IpAddr::V4(_) => v4_prefix,
        IpAddr::V6(_) => v6_prefix,
    };
    let network = IpNetwork::new(address, prefix).ok()?;
    IpNetwork::new(network.network(), prefix).ok()
}

fn address_value(address: IpAddr) -> u128 {
    match address {
        IpAddr::V4(addr) => u32::from(addr) as u128,
        IpAddr::V6(addr) => u128::from(addr),
    }
}

/// Both addresses sit in the same subnet and their host offsets differ by at
/// most one.
pub fn adjacent_in_subnet(a: IpAddr, b: IpAddr, v4_prefix: u8, v6_prefix: u8) -> bool {
    match (subnet_of(a, v4_prefix, v6_prefix), subnet_of(b, v4_prefix, v6_prefix)) {
        (Some(x), Some(y)) if x == y => address_value(a).abs_diff(address_value(b)) <= 1,
        _ => false,
    }
}

/// All addresses fall in one subnet.
pub fn share_subnet(addresses: &[IpAddr], v4_prefix: u8, v6_prefix: u8) -> bool {
    let mut subnets = addresses.iter().map(|a| subnet_of(*a, v4_prefix, v6_prefix));
    match subnets.next() {
        Some(Some(first)) => subnets.all(|s| s == Some(first)),
        _ => false,
    }
}
