use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use indicatif::ProgressBar;
use tracing::{debug, info};

use super::code::{DecisionCode, HiddenSearch, Rule};
use super::updates::UpdateStore;
use super::utils::{add_vote, hidden_asn, largest_cone, smallest_cone, votes, Tally};
use crate::as_graph::RelationshipOracle;
use crate::as_org::OrgDirectory;
use crate::shared::{is_real, OrgId, ASN, UNKNOWN_ASN};
use crate::topology::{RouterId, TopologyGraph};

/// Annotate a router that has no successor edges from the destinations
/// observed beyond it.
pub fn annotate_last_hop(
    graph: &TopologyGraph,
    oracle: &dyn RelationshipOracle,
    orgs: &dyn OrgDirectory,
    rid: RouterId,
) -> (ASN, DecisionCode) {
    let router = graph.router(rid);
    let iface_asns: Vec<ASN> = router.interfaces.iter().map(|i| graph.interface(*i).asn).collect();
    let dests: BTreeSet<ASN> =
        router.modified_dests.iter().copied().filter(|d| is_real(*d)).collect();
    debug!("Last hop {}: dests={:?}", router.name, dests);

    if dests.is_empty() {
        let distinct: BTreeSet<ASN> = iface_asns.iter().copied().collect();
        return match distinct.len() {
            1 => (iface_asns[0], DecisionCode::new(Rule::LastHopNoDestinations)),
            _ => (UNKNOWN_ASN, DecisionCode::new(Rule::LastHopIndeterminate)),
        };
    }

    let dest_orgs: BTreeSet<OrgId> = dests.iter().map(|d| orgs.org(*d)).collect();
    let (dest, rule) = if dest_orgs.len() == 1 {
        match largest_cone(oracle, dests.iter().copied()) {
            Some(dest) => (dest, Rule::LastHopSingleOrg),
            None => return (UNKNOWN_ASN, DecisionCode::new(Rule::LastHopIndeterminate)),
        }
    } else {
        let ifaces: BTreeSet<ASN> = iface_asns.iter().copied().collect();
        let same: Vec<ASN> = dests.iter().copied().filter(|d| ifaces.contains(d)).collect();
        debug!("Same: {:?}", same);
        if same.len() == 1 {
            return (same[0], DecisionCode::new(Rule::LastHopInterfaceMatch));
        }
        let related = dests.iter().copied().filter(|d| ifaces.iter().any(|i| oracle.rel(*i, *d)));
        if let Some(asn) = smallest_cone(oracle, related) {
            return (asn, DecisionCode::new(Rule::LastHopRelated));
        }
        (heap_test(oracle, &dests, &ifaces), Rule::LastHopHeap)
    };

    let mut iasns = Tally::new();
    for asn in iface_asns.iter().copied().filter(|a| is_real(*a)) {
        add_vote(&mut iasns, asn, 1);
    }
    let unrelated = !iasns.contains_key(&dest) && !iasns.keys().any(|i| oracle.rel(*i, dest));
    if !iasns.is_empty() && unrelated {
        let origins: BTreeSet<ASN> = iasns.keys().copied().collect();
        let (hidden, search) = hidden_asn(oracle, &origins, dest);
        if search == HiddenSearch::Found {
            return (hidden, DecisionCode::new(Rule::LastHopHidden).with_hidden(search));
        }
        // most frequent interface AS, then smaller cone, then smaller AS
        let fallback = iasns
            .keys()
            .copied()
            .min_by_key(|asn| (Reverse(votes(&iasns, *asn)), oracle.conesize(*asn), *asn))
            .unwrap_or(dest);
        let code = DecisionCode::new(Rule::LastHopMissing).with_hidden(HiddenSearch::NotFound);
        return (fallback, code);
    }
    (dest, DecisionCode::new(rule))
}

/// Pop destinations from a min-heap on (cone size, -AS) until one matches or
/// relates to an interface AS. Falls back to the heap's first element.
fn heap_test(
    oracle: &dyn RelationshipOracle,
    dests: &BTreeSet<ASN>,
    ifaces: &BTreeSet<ASN>,
) -> ASN {
    let mut heap: BinaryHeap<Reverse<(usize, Reverse<ASN>)>> = dests
        .iter()
        .map(|d| Reverse((oracle.conesize(*d), Reverse(*d))))
        .collect();
    let fallback = match heap.peek() {
        Some(Reverse((_, Reverse(asn)))) => *asn,
        None => return UNKNOWN_ASN,
    };
    while let Some(Reverse((_, Reverse(dest)))) = heap.pop() {
        if ifaces.iter().any(|i| *i == dest || oracle.rel(*i, dest)) {
            return dest;
        }
    }
    fallback
}

/// Annotate every last-hop router once and commit the results.
pub fn annotate_last_hops(
    graph: &TopologyGraph,
    oracle: &dyn RelationshipOracle,
    orgs: &dyn OrgDirectory,
    store: &mut UpdateStore<RouterId>,
    pb: &ProgressBar,
) {
    let routers = graph.last_hop_routers();
    pb.set_length(routers.len() as u64);
    let mut from_interfaces = 0usize;
    for &rid in routers {
        pb.inc(1);
        let (asn, code) = annotate_last_hop(graph, oracle, orgs, rid);
        if code.rule == Rule::LastHopNoDestinations {
            from_interfaces += 1;
        }
        store.add_update(rid, asn, orgs.org(asn), code);
    }
    pb.finish();
    store.advance();
    info!(
        "Annotated {} last hops ({} from interfaces, {} from destinations)",
        routers.len(),
        from_interfaces,
        routers.len() - from_interfaces
    );
}
