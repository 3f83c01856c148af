use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::InterfaceId;
use crate::shared::{EdgeType, Priority, ASN};

/// Key of a router's successor edge. Field order makes the derived `Ord`
/// group edges by tier first, so the best tier is always the first range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub priority: Priority,
    pub succ: InterfaceId,
    pub kind: EdgeType,
}

impl EdgeKey {
    pub fn new(priority: Priority, succ: InterfaceId, kind: EdgeType) -> Self {
        EdgeKey { priority, succ, kind }
    }
}

/// A successor interface within one tier, with the origin ASes observed
/// across every subtype of that adjacency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Successor {
    pub interface: InterfaceId,
    pub priority: Priority,
    pub origins: BTreeMap<ASN, usize>,
}

/// Merge the subtype-level edges of one tier into per-interface successors.
pub(crate) fn merge_tier<'a>(
    priority: Priority,
    edges: impl Iterator<Item = (&'a EdgeKey, &'a BTreeMap<ASN, usize>)>,
) -> Vec<Successor> {
    let mut successors: Vec<Successor> = Vec::new();
    for (key, origins) in edges.filter(|(key, _)| key.priority == priority) {
        match successors.last_mut() {
            Some(last) if last.interface == key.succ => {
                for (asn, count) in origins {
                    *last.origins.entry(*asn).or_insert(0) += count;
                }
            }
            _ => successors.push(Successor {
                interface: key.succ,
                priority,
                origins: origins.clone(),
            }),
        }
    }
    successors
}
