use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::annotation::{resolve_router, DecisionCode, UpdateStore};
use crate::shared::{is_real, OrgId, Priority, ASN, UNANNOUNCED_ASN, UNKNOWN_ASN};
use crate::topology::{InterfaceId, RouterId, TopologyGraph};

/// Where an annotation row's connected AS came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionSource {
    /// Interface pass result.
    Inferred,
    /// The interface had no inferred value, so the observed origin is used.
    Observed,
    /// The interface belongs to a different organization than its router.
    OtherOrganization,
}

/// One row per interface: the router owner and the AS on the other end of
/// the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub address: IpAddr,
    pub router: String,
    pub asn: ASN,
    pub org: OrgId,
    pub conn_asn: ASN,
    pub conn_org: OrgId,
    pub observed_asn: ASN,
    pub observed_org: OrgId,
    pub router_code: DecisionCode,
    pub conn_source: ConnectionSource,
    pub conn_code: Option<DecisionCode>,
    pub tier: Priority,
}

/// Inferred inter-AS adjacencies of one router, grouped by edge tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsLinkRow {
    pub router: String,
    pub asn: ASN,
    pub conn_asns: BTreeMap<Priority, BTreeSet<ASN>>,
}

pub fn annotation_rows(
    graph: &TopologyGraph,
    last_hops: &UpdateStore<RouterId>,
    routers: &UpdateStore<RouterId>,
    interfaces: &UpdateStore<InterfaceId>,
) -> Vec<AnnotationRow> {
    graph
        .interfaces()
        .iter()
        .map(|interface| {
            let router = graph.router(interface.router);
            let rupdate = resolve_router(last_hops, routers, interface.router);

            let (conn_asn, conn_org, conn_source, conn_code) =
                if interface.org == rupdate.org || interface.asn == UNANNOUNCED_ASN {
                    let iupdate = interfaces.get(interface.id);
                    if iupdate.asn == UNKNOWN_ASN {
                        (interface.asn, interface.org.clone(), ConnectionSource::Observed, None)
                    } else {
                        let source = ConnectionSource::Inferred;
                        (iupdate.asn, iupdate.org.clone(), source, Some(iupdate.code))
                    }
                } else {
                    let source = ConnectionSource::OtherOrganization;
                    (interface.asn, interface.org.clone(), source, None)
                };

            AnnotationRow {
                address: interface.address,
                router: router.name.clone(),
                asn: rupdate.asn,
                org: rupdate.org.clone(),
                conn_asn,
                conn_org,
                observed_asn: interface.asn,
                observed_org: interface.org.clone(),
                router_code: rupdate.code,
                conn_source,
                conn_code,
                tier: router.best_priority,
            }
        })
        .collect()
}

/// Routers whose successors resolve to other ASes. Routers with no such
/// successor produce no row.
pub fn as_link_rows(
    graph: &TopologyGraph,
    last_hops: &UpdateStore<RouterId>,
    routers: &UpdateStore<RouterId>,
) -> Vec<AsLinkRow> {
    let mut rows = Vec::new();
    for &rid in graph.routers_with_successors() {
        let router = graph.router(rid);
        let asn = resolve_router(last_hops, routers, rid).asn;
        let mut conn_asns: BTreeMap<Priority, BTreeSet<ASN>> = BTreeMap::new();
        for tier in Priority::EDGE_TIERS {
            let found: BTreeSet<ASN> = router
                .successors(tier)
                .iter()
                .map(|succ| resolve_router(last_hops, routers, graph.router_of(succ.interface)).asn)
                .filter(|succ_asn| is_real(*succ_asn) && *succ_asn != asn)
                .collect();
            if !found.is_empty() {
                conn_asns.insert(tier, found);
            }
        }
        if !conn_asns.is_empty() {
            rows.push(AsLinkRow {
                router: router.name.clone(),
                asn,
                conn_asns,
            });
        }
    }
    rows
}
