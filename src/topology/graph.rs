use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;

use super::edge::{merge_tier, EdgeKey, Successor};
use super::{InterfaceId, RouterId};
use crate::shared::{OrgId, Priority, ASN};

#[derive(Debug, Clone)]
pub struct Interface {
    pub id: InterfaceId,
    pub address: IpAddr,
    pub asn: ASN,
    pub org: OrgId,
    pub router: RouterId,
    pub dests: BTreeSet<ASN>,
    pub modified_dests: BTreeSet<ASN>,
    /// Predecessor interfaces per tier
    pub preds: BTreeMap<Priority, BTreeSet<InterfaceId>>,
    /// Successor interfaces per tier
    pub succs: BTreeMap<Priority, BTreeSet<InterfaceId>>,
}

impl Interface {
    pub fn preds_in(&self, priority: Priority) -> impl Iterator<Item = InterfaceId> + '_ {
        self.preds.get(&priority).into_iter().flatten().copied()
    }

    pub fn has_next_hop_preds(&self) -> bool {
        self.preds
            .get(&Priority::NextHop)
            .map(|preds| !preds.is_empty())
            .unwrap_or(false)
    }

    pub fn all_preds(&self) -> impl Iterator<Item = InterfaceId> + '_ {
        self.preds.values().flatten().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    pub id: RouterId,
    pub name: String,
    pub interfaces: Vec<InterfaceId>,
    /// (tier, successor, subtype) -> origin AS multiset
    pub succ: BTreeMap<EdgeKey, BTreeMap<ASN, usize>>,
    pub dests: BTreeSet<ASN>,
    pub modified_dests: BTreeSet<ASN>,
    pub best_priority: Priority,
}

impl Router {
    pub fn has_successors(&self) -> bool {
        !self.succ.is_empty()
    }

    /// Successors in the router's best non-empty tier.
    pub fn best_successors(&self) -> Vec<Successor> {
        self.successors(self.best_priority)
    }

    pub fn successors(&self, priority: Priority) -> Vec<Successor> {
        merge_tier(priority, self.succ.iter())
    }
}

/// Finalized topology. Built by [`super::TopologyBuilder`] and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct TopologyGraph {
    pub(crate) interfaces: Vec<Interface>,
    pub(crate) routers: Vec<Router>,
    pub(crate) address_ids: HashMap<IpAddr, InterfaceId>,
    pub(crate) router_ids: HashMap<String, RouterId>,
    pub(crate) routers_succ: Vec<RouterId>,
    pub(crate) routers_nosucc: Vec<RouterId>,
    pub(crate) interfaces_pred: Vec<InterfaceId>,
}

impl TopologyGraph {
    pub fn interface(&self, id: InterfaceId) -> &Interface {
        &self.interfaces[id.index()]
    }

    pub fn router(&self, id: RouterId) -> &Router {
        &self.routers[id.index()]
    }

    pub fn router_of(&self, id: InterfaceId) -> RouterId {
        self.interface(id).router
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn interface_by_address(&self, address: &str) -> Option<InterfaceId> {
        let address: IpAddr = address.parse().ok()?;
        self.address_ids.get(&address).copied()
    }

    pub fn router_by_name(&self, name: &str) -> Option<RouterId> {
        self.router_ids.get(name).copied()
    }

    /// Routers with at least one successor edge, in handle order.
    pub fn routers_with_successors(&self) -> &[RouterId] {
        &self.routers_succ
    }

    /// Routers with member interfaces but no successor edges.
    pub fn last_hop_routers(&self) -> &[RouterId] {
        &self.routers_nosucc
    }

    /// Interfaces with at least one next-hop predecessor.
    pub fn interfaces_with_next_hop_preds(&self) -> &[InterfaceId] {
        &self.interfaces_pred
    }
}
