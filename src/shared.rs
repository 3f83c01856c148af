use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

pub type ASN = i64;
pub type OrgId = String;

/// IXP space or an address with no origin AS.
pub const UNKNOWN_ASN: ASN = -1;
/// Address space that is not announced in BGP.
pub const UNANNOUNCED_ASN: ASN = 0;

/// True for ASNs that carry an organization, i.e. neither sentinel.
pub fn is_real(asn: ASN) -> bool {
    asn > UNANNOUNCED_ASN
}

/// Strength of the adjacency signal behind an edge. Lower is more reliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    NextHop = 1,
    Echo = 2,
    MultiHop = 3,
    None = 4,
}

impl Priority {
    pub const EDGE_TIERS: [Priority; 3] = [Priority::NextHop, Priority::Echo, Priority::MultiHop];

    /// Classifies a trace adjacency. Returns `None` for a zero hop distance.
    pub fn classify(hop_distance: u32, reply: EdgeType) -> Option<Priority> {
        match hop_distance {
            0 => None,
            1 if reply == EdgeType::EchoReply => Some(Priority::Echo),
            1 => Some(Priority::NextHop),
            _ => Some(Priority::MultiHop),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::NextHop => "NEXT_HOP",
            Priority::Echo => "ECHO",
            Priority::MultiHop => "MULTI_HOP",
            Priority::None => "NONE",
        };
        write!(f, "{}", s)
    }
}

/// ICMP reply kind that revealed the successor address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EdgeType {
    TimeExceeded = 1,
    EchoReply = 2,
    Unreachable = 3,
    Other = 4,
}

impl EdgeType {
    pub fn from_icmp_type(icmp_type: u8) -> Self {
        match icmp_type {
            0 => EdgeType::EchoReply,
            3 => EdgeType::Unreachable,
            11 => EdgeType::TimeExceeded,
            _ => EdgeType::Other,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("unknown interface address: {address}")]
    UnknownAddress { address: IpAddr },

    #[error("invalid interface address: {address}")]
    InvalidAddress { address: String },

    #[error("interface {address} already belongs to router {router}")]
    DuplicateMembership { address: IpAddr, router: String },

    #[error("unknown router: {name}")]
    UnknownRouter { name: String },

    #[error("invalid hop distance {distance} between {pred} and {succ}")]
    InvalidHopDistance { pred: IpAddr, succ: IpAddr, distance: u32 },

    #[error("graph already holds {count} nodes, handle space exhausted")]
    TooManyNodes { count: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed record: {reason}")]
    Malformed { path: String, line: usize, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize run output: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("provider cycle detected in AS graph at AS {asn}")]
pub struct CycleError {
    pub asn: ASN,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_classification() {
        assert_eq!(Priority::classify(1, EdgeType::TimeExceeded), Some(Priority::NextHop));
        assert_eq!(Priority::classify(1, EdgeType::Unreachable), Some(Priority::NextHop));
        assert_eq!(Priority::classify(1, EdgeType::EchoReply), Some(Priority::Echo));
        assert_eq!(Priority::classify(4, EdgeType::EchoReply), Some(Priority::MultiHop));
        assert_eq!(Priority::classify(0, EdgeType::TimeExceeded), None);
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::NextHop < Priority::Echo);
        assert!(Priority::Echo < Priority::MultiHop);
        assert!(Priority::MultiHop < Priority::None);
    }

    #[test]
    fn test_sentinels_are_not_real() {
        assert!(!is_real(UNKNOWN_ASN));
        assert!(!is_real(UNANNOUNCED_ASN));
        assert!(is_real(1));
    }
}
