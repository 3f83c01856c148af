use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;

use tracing::{debug, info, warn};

use super::graph::{Interface, Router, TopologyGraph};
use super::{EdgeKey, InterfaceId, RouterId};
use crate::as_graph::RelationshipOracle;
use crate::as_org::{normalize_org, OrgDirectory};
use crate::shared::{EdgeType, GraphError, OrgId, Priority, ASN};

#[derive(Debug, Clone)]
struct PendingInterface {
    address: IpAddr,
    asn: ASN,
    org: Option<OrgId>,
    router: Option<RouterId>,
    dests: BTreeSet<ASN>,
}

#[derive(Debug, Clone)]
struct PendingRouter {
    name: String,
    interfaces: Vec<InterfaceId>,
}

/// Collects traceroute-derived structure and produces a [`TopologyGraph`].
///
/// Every call validates its references immediately, so a collaborator that
/// feeds an unknown address or router is stopped at the offending call.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    interfaces: Vec<PendingInterface>,
    address_ids: HashMap<IpAddr, InterfaceId>,
    routers: Vec<PendingRouter>,
    router_ids: HashMap<String, RouterId>,
    edges: BTreeMap<(InterfaceId, InterfaceId, Priority, EdgeType), usize>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interface. The organization defaults to the directory's
    /// answer for `asn` when `org` is `None`; a given `org` is normalized the
    /// way [`AsOrgMap`](crate::as_org::AsOrgMap) stores real ids.
    pub fn add_interface(
        &mut self,
        address: &str,
        asn: ASN,
        org: Option<&str>,
    ) -> Result<InterfaceId, GraphError> {
        let address = parse_address(address)?;
        if let Some(&id) = self.address_ids.get(&address) {
            warn!("Interface {} added twice, keeping the first observation", address);
            return Ok(id);
        }
        let id = InterfaceId(next_handle(self.interfaces.len())?);
        self.interfaces.push(PendingInterface {
            address,
            asn,
            org: org.map(normalize_org),
            router: None,
            dests: BTreeSet::new(),
        });
        self.address_ids.insert(address, id);
        Ok(id)
    }

    pub fn add_router(&mut self, name: &str) -> Result<RouterId, GraphError> {
        if let Some(&id) = self.router_ids.get(name) {
            return Ok(id);
        }
        let id = RouterId(next_handle(self.routers.len())?);
        self.routers.push(PendingRouter {
            name: name.to_string(),
            interfaces: Vec::new(),
        });
        self.router_ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Assign alias-resolved interfaces to a router.
    pub fn group_interfaces(&mut self, router: &str, addresses: &[&str]) -> Result<(), GraphError> {
        let rid = *self
            .router_ids
            .get(router)
            .ok_or_else(|| GraphError::UnknownRouter { name: router.to_string() })?;

        for address in addresses {
            let iid = self.lookup(address)?;
            let pending = &mut self.interfaces[iid.index()];
            match pending.router {
                Some(existing) if existing == rid => continue,
                Some(existing) => {
                    return Err(GraphError::DuplicateMembership {
                        address: pending.address,
                        router: self.routers[existing.index()].name.clone(),
                    });
                }
                None => {
                    pending.router = Some(rid);
                    self.routers[rid.index()].interfaces.push(iid);
                }
            }
        }
        Ok(())
    }

    /// Record that `succ` followed `pred` in a trace. Repeated observations
    /// accumulate.
    pub fn add_edge(
        &mut self,
        pred: &str,
        succ: &str,
        hop_distance: u32,
        icmp_type: u8,
    ) -> Result<(), GraphError> {
        let pred_id = self.lookup(pred)?;
        let succ_id = self.lookup(succ)?;
        let kind = EdgeType::from_icmp_type(icmp_type);
        let priority = Priority::classify(hop_distance, kind).ok_or(GraphError::InvalidHopDistance {
            pred: self.interfaces[pred_id.index()].address,
            succ: self.interfaces[succ_id.index()].address,
            distance: hop_distance,
        })?;
        *self.edges.entry((pred_id, succ_id, priority, kind)).or_insert(0) += 1;
        Ok(())
    }

    /// Record a traceroute destination AS reached beyond `address`.
    pub fn add_destination(&mut self, address: &str, asn: ASN) -> Result<(), GraphError> {
        let iid = self.lookup(address)?;
        self.interfaces[iid.index()].dests.insert(asn);
        Ok(())
    }

    fn lookup(&self, address: &str) -> Result<InterfaceId, GraphError> {
        let parsed = parse_address(address)?;
        self.address_ids
            .get(&parsed)
            .copied()
            .ok_or(GraphError::UnknownAddress { address: parsed })
    }

    /// Freeze the topology: synthesize singleton routers, attach edges and
    /// derive destination sets.
    pub fn finalize(
        mut self,
        oracle: &dyn RelationshipOracle,
        orgs: &dyn OrgDirectory,
    ) -> Result<TopologyGraph, GraphError> {
        for index in 0..self.interfaces.len() {
            if self.interfaces[index].router.is_some() {
                continue;
            }
            let address = self.interfaces[index].address.to_string();
            let rid = RouterId(next_handle(self.routers.len())?);
            if self.router_ids.contains_key(&address) {
                warn!("Router name {} is shared with a synthesized router", address);
            } else {
                self.router_ids.insert(address.clone(), rid);
            }
            self.routers.push(PendingRouter {
                name: address,
                interfaces: vec![InterfaceId(index as u32)],
            });
            self.interfaces[index].router = Some(rid);
        }

        let mut interfaces: Vec<Interface> = Vec::with_capacity(self.interfaces.len());
        for (index, pending) in self.interfaces.into_iter().enumerate() {
            let org = pending.org.unwrap_or_else(|| orgs.org(pending.asn));
            let router = pending.router.unwrap_or(RouterId(u32::MAX));
            let modified_dests = modify_dests(pending.asn, &pending.dests, oracle, orgs);
            interfaces.push(Interface {
                id: InterfaceId(index as u32),
                address: pending.address,
                asn: pending.asn,
                org,
                router,
                dests: pending.dests,
                modified_dests,
                preds: BTreeMap::new(),
                succs: BTreeMap::new(),
            });
        }

        let mut routers: Vec<Router> = self
            .routers
            .into_iter()
            .enumerate()
            .map(|(index, pending)| Router {
                id: RouterId(index as u32),
                name: pending.name,
                interfaces: pending.interfaces,
                succ: BTreeMap::new(),
                dests: BTreeSet::new(),
                modified_dests: BTreeSet::new(),
                best_priority: Priority::None,
            })
            .collect();

        let mut dropped = 0usize;
        for ((pred, succ, priority, kind), count) in self.edges {
            let rpred = interfaces[pred.index()].router;
            if rpred == interfaces[succ.index()].router {
                dropped += 1;
                continue;
            }
            let origin = interfaces[pred.index()].asn;
            let router = &mut routers[rpred.index()];
            *router
                .succ
                .entry(EdgeKey::new(priority, succ, kind))
                .or_default()
                .entry(origin)
                .or_insert(0) += count;
            interfaces[succ.index()].preds.entry(priority).or_default().insert(pred);
            interfaces[pred.index()].succs.entry(priority).or_default().insert(succ);
        }
        if dropped > 0 {
            debug!("Dropped {} edges between interfaces of the same router", dropped);
        }

        let mut routers_succ = Vec::new();
        let mut routers_nosucc = Vec::new();
        for router in routers.iter_mut() {
            for iid in &router.interfaces {
                let interface = &interfaces[iid.index()];
                router.dests.extend(&interface.dests);
                router.modified_dests.extend(&interface.modified_dests);
            }
            router.best_priority = router
                .succ
                .keys()
                .next()
                .map(|key| key.priority)
                .unwrap_or(Priority::None);
            if router.has_successors() {
                routers_succ.push(router.id);
            } else if !router.interfaces.is_empty() {
                routers_nosucc.push(router.id);
            }
        }

        let interfaces_pred: Vec<InterfaceId> = interfaces
            .iter()
            .filter(|interface| interface.has_next_hop_preds())
            .map(|interface| interface.id)
            .collect();

        info!(
            "Finalized topology: {} interfaces, {} routers ({} with successors, {} last hops)",
            interfaces.len(),
            routers.len(),
            routers_succ.len(),
            routers_nosucc.len()
        );

        Ok(TopologyGraph {
            interfaces,
            routers,
            address_ids: self.address_ids,
            router_ids: self.router_ids,
            routers_succ,
            routers_nosucc,
            interfaces_pred,
        })
    }
}

/// Drop the interface's own AS from its destinations when exactly two
/// organizations are present and the own AS has the largest cone.
fn modify_dests(
    asn: ASN,
    dests: &BTreeSet<ASN>,
    oracle: &dyn RelationshipOracle,
    orgs: &dyn OrgDirectory,
) -> BTreeSet<ASN> {
    if !dests.contains(&asn) {
        return dests.clone();
    }
    let dest_orgs: BTreeSet<OrgId> = dests.iter().map(|d| orgs.org(*d)).collect();
    if dest_orgs.len() != 2 {
        return dests.clone();
    }
    let largest = dests
        .iter()
        .copied()
        .min_by_key(|d| (Reverse(oracle.conesize(*d)), *d));
    if largest == Some(asn) {
        dests.iter().copied().filter(|d| *d != asn).collect()
    } else {
        dests.clone()
    }
}

fn parse_address(address: &str) -> Result<IpAddr, GraphError> {
    address.trim().parse::<IpAddr>().map_err(|_| GraphError::InvalidAddress {
        address: address.to_string(),
    })
}

fn next_handle(count: usize) -> Result<u32, GraphError> {
    u32::try_from(count).map_err(|_| GraphError::TooManyNodes { count })
}
