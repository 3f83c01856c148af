use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use tracing::debug;

use super::code::{DecisionCode, HiddenSearch, Rule};
use super::context::AnnotationContext;
use super::utils::{
    add_vote, customers_of, hidden_asn, largest_cone, max_num, max_votes, peek, providers_of,
    smallest_cone, votes, Tally,
};
use crate::shared::{is_real, Priority, ASN, UNANNOUNCED_ASN, UNKNOWN_ASN};
use crate::topology::{share_subnet, InterfaceId, Router, RouterId, Successor};

/// Implied owner of `router` according to one successor edge.
fn router_heuristics(
    ctx: &AnnotationContext<'_>,
    router: &Router,
    tier: Priority,
    isucc: InterfaceId,
    origins: &BTreeSet<ASN>,
) -> ASN {
    let succ = ctx.graph.interface(isucc);
    if succ.asn == UNKNOWN_ASN {
        return UNKNOWN_ASN;
    }
    let rsucc_asn = ctx.router_asn(succ.router);
    debug!("\tASN={}, RASN={}, IASN={}", succ.asn, rsucc_asn, ctx.interface_annotation(isucc).asn);
    if succ.asn == UNANNOUNCED_ASN {
        return rsucc_asn;
    }
    if origins.contains(&succ.asn) {
        return succ.asn;
    }
    if is_real(rsucc_asn) && rsucc_asn != succ.asn {
        let org_match = origins.iter().any(|o| ctx.org(*o) == succ.org);
        let related = origins.iter().any(|o| *o == rsucc_asn || ctx.oracle.rel(*o, rsucc_asn));
        if !org_match && !related && !router.modified_dests.contains(&rsucc_asn) {
            debug!(
                "\tThird party: Router={}, RASN={}",
                ctx.graph.router(succ.router).name,
                rsucc_asn
            );
            return rsucc_asn;
        }
    }
    if tier == Priority::MultiHop {
        let iasn = ctx.interface_annotation(isucc).asn;
        if is_real(iasn) && iasn != succ.asn {
            return iasn;
        }
    }
    succ.asn
}

fn reallocated_test(ctx: &AnnotationContext<'_>, oasn: ASN, newasn: ASN) -> bool {
    let conesize = ctx.oracle.conesize(newasn);
    conesize <= ctx.config.reallocated_cone_max
        && conesize < ctx.oracle.conesize(oasn)
        && !ctx.oracle.peer_rel(newasn, oasn)
}

/// Move the votes of an origin AS onto the customer that now holds a
/// reallocated block of its address space. At most one move per router.
fn reallocated(
    ctx: &AnnotationContext<'_>,
    router: &Router,
    edges: &[Successor],
    succs: &mut Tally,
    succ_origins: &mut BTreeMap<ASN, BTreeSet<ASN>>,
) -> bool {
    if edges.len() < 2 {
        return false;
    }
    let mut same: BTreeMap<ASN, Vec<InterfaceId>> = BTreeMap::new();
    for edge in edges {
        let asn = ctx.graph.interface(edge.interface).asn;
        if edge.origins.contains_key(&asn) {
            same.entry(asn).or_default().push(edge.interface);
        }
    }

    for (oasn, isuccs) in same {
        if isuccs.len() < 2 {
            continue;
        }
        let addresses: Vec<IpAddr> =
            isuccs.iter().map(|i| ctx.graph.interface(*i).address).collect();
        if !share_subnet(&addresses, ctx.config.subnet_prefix_v4, ctx.config.subnet_prefix_v6) {
            continue;
        }
        let rsuccs: BTreeSet<RouterId> = isuccs.iter().map(|i| ctx.graph.router_of(*i)).collect();
        if rsuccs.iter().any(|r| ctx.router_annotation(*r).code.reallocated) {
            continue;
        }
        let mut rasns: BTreeSet<ASN> = rsuccs.iter().map(|r| ctx.router_asn(*r)).collect();
        debug!("RASNs: {:?}", rasns);
        if (rasns.len() > 1 || rasns.contains(&oasn)) && router.modified_dests.len() == 1 {
            rasns = router.modified_dests.clone();
        }
        if let Some(newasn) = peek(&rasns) {
            if is_real(newasn) && newasn != oasn && reallocated_test(ctx, oasn, newasn) {
                debug!("Reallocated: {} -> {}", oasn, newasn);
                if let Some(num) = succs.remove(&oasn) {
                    succs.insert(newasn, num);
                }
                let origins = succ_origins.remove(&oasn).unwrap_or_default();
                succ_origins.insert(newasn, origins);
                return true;
            }
        }
    }
    false
}

/// Infer the AS operating a router that has successor edges.
pub fn annotate_router(ctx: &AnnotationContext<'_>, rid: RouterId) -> (ASN, DecisionCode) {
    let oracle = ctx.oracle;
    let router = ctx.graph.router(rid);
    let tier = router.best_priority;
    let edges = router.best_successors();
    debug!("Router {}: edges={}, tier={}", router.name, edges.len(), tier);

    let mut succs = Tally::new();
    let mut succ_origins: BTreeMap<ASN, BTreeSet<ASN>> = BTreeMap::new();
    for edge in &edges {
        let origins: BTreeSet<ASN> = edge.origins.keys().copied().filter(|o| is_real(*o)).collect();
        let succ_asn = router_heuristics(ctx, router, tier, edge.interface, &origins);
        debug!("Succ={}, Origins={:?}, Heuristic={}", edge.interface, origins, succ_asn);
        if is_real(succ_asn) {
            succ_origins.entry(succ_asn).or_default().extend(origins);
            add_vote(&mut succs, succ_asn, 1);
        }
    }

    let mut iasns = Tally::new();
    for iid in &router.interfaces {
        let asn = ctx.graph.interface(*iid).asn;
        if is_real(asn) {
            add_vote(&mut iasns, asn, 1);
        }
    }

    let was_reallocated = reallocated(ctx, router, &edges, &mut succs, &mut succ_origins);
    let code = |rule: Rule| DecisionCode::new(rule).with_reallocated(was_reallocated);
    debug!("Succs={:?}, IASNs={:?}", succs, iasns);

    if let Some(sasn) = single_successor(ctx, &succs) {
        if iasns.contains_key(&sasn) {
            return (sasn, code(Rule::SingleSuccessorOrigin));
        }
        let total: usize = iasns.values().sum();
        if votes(&succs, sasn) * 4 > total {
            if let Some(result) = single_successor_checks(ctx, &edges, sasn, &succ_origins) {
                let (asn, rule, hidden) = result;
                return (asn, code(rule).with_hidden(hidden));
            }
        }
    }

    let mut votes_all = succs.clone();
    for (asn, count) in &iasns {
        add_vote(&mut votes_all, *asn, *count);
    }
    debug!("Votes: {:?}", votes_all);
    let top = max_votes(&votes_all);
    let iasn_in_succs: Vec<ASN> = iasns.keys().copied().filter(|i| succs.contains_key(i)).collect();

    if succs.len() > 1 {
        if iasn_in_succs.is_empty() {
            let all_peer: Vec<ASN> = iasns
                .keys()
                .copied()
                .filter(|i| succs.keys().all(|s| oracle.peer_rel(*i, *s)))
                .filter(|i| votes(&votes_all, *i) * 2 > top)
                .collect();
            if all_peer.len() == 1 {
                return (all_peer[0], code(Rule::AllPeerSuccessors));
            }
        }
        if let [isasn] = iasn_in_succs[..] {
            let dominated = succs
                .keys()
                .filter(|s| **s != isasn)
                .all(|s| oracle.peer_rel(isasn, *s) || oracle.provider_rel(*s, isasn));
            if dominated && votes(&votes_all, isasn) * 2 > top {
                return (isasn, code(Rule::InterfaceSuccessorMajority));
            }
        }
    }

    if succs.len() == 1 && iasns.len() > 1 && iasn_in_succs.is_empty() {
        if let Some(&sasn) = succs.keys().next() {
            if iasns.keys().all(|i| oracle.peer_rel(*i, sasn)) {
                return (sasn, code(Rule::AllPeerOrigins));
            }
        }
    }

    if votes_all.is_empty() {
        return (UNKNOWN_ASN, DecisionCode::new(Rule::Indeterminate));
    }

    let all_origins: BTreeSet<ASN> = succ_origins.values().flatten().copied().collect();
    let remaining: Vec<ASN> = succs.keys().copied().filter(|s| !all_origins.contains(s)).collect();
    debug!("AllOrigins={:?}, Remaining={:?}", all_origins, remaining);
    if let [asn] = remaining[..] {
        let customer = all_origins.iter().any(|o| oracle.provider_rel(asn, *o));
        if customer && oracle.conesize(asn) == 0 && votes(&votes_all, asn) * 2 >= top {
            return (asn, code(Rule::RemainingCustomer));
        }
    }

    let (asn, rule, hidden) = vote(ctx, tier, &iasns, votes_all);
    if rule == Rule::VoteOverride {
        return (asn, code(rule));
    }
    if !iasns.contains_key(&asn) && !iasns.keys().any(|i| oracle.rel(*i, asn)) {
        let origins: BTreeSet<ASN> = iasns.keys().copied().collect();
        let (substitute, search) = hidden_asn(oracle, &origins, asn);
        return (substitute, code(rule).with_hidden(search));
    }
    (asn, code(rule).with_hidden(hidden))
}

/// The successor vote collapses to one AS, or to one organization.
fn single_successor(ctx: &AnnotationContext<'_>, succs: &Tally) -> Option<ASN> {
    if succs.len() == 1 {
        return succs.keys().next().copied();
    }
    let orgs: BTreeSet<String> = succs.keys().map(|s| ctx.org(*s)).collect();
    if orgs.len() == 1 {
        return largest_cone(ctx.oracle, succs.keys().copied());
    }
    None
}

fn single_successor_checks(
    ctx: &AnnotationContext<'_>,
    edges: &[Successor],
    sasn: ASN,
    succ_origins: &BTreeMap<ASN, BTreeSet<ASN>>,
) -> Option<(ASN, Rule, HiddenSearch)> {
    let oracle = ctx.oracle;
    let empty = BTreeSet::new();
    let origins = succ_origins.get(&sasn).unwrap_or(&empty);

    if let Some(origin) = origins.iter().find(|o| oracle.customer_rel(sasn, **o)) {
        debug!("Provider: {}->{}", sasn, origin);
        return Some((sasn, Rule::SingleSuccessorCustomer, HiddenSearch::NotAttempted));
    }

    let conesize = oracle.conesize(sasn);
    let unrelated = !origins.iter().any(|o| oracle.rel(*o, sasn));
    if unrelated && origins.iter().any(|o| oracle.conesize(*o) > conesize) {
        let (asn, search) = hidden_asn(oracle, origins, sasn);
        return Some((asn, Rule::SingleSuccessorHidden, search));
    }

    for edge in edges {
        let iupdate = ctx.interface_annotation(edge.interface);
        let rasn = ctx.router_asn(ctx.graph.router_of(edge.interface));
        let trusted = rasn != sasn || iupdate.code.is_high_confidence();
        if iupdate.asn == sasn && trusted {
            return Some((sasn, Rule::InterfaceAgreement, HiddenSearch::NotAttempted));
        }
    }

    let rasns: BTreeSet<ASN> = edges
        .iter()
        .map(|edge| {
            let rasn = ctx.router_asn(ctx.graph.router_of(edge.interface));
            if is_real(rasn) {
                rasn
            } else {
                sasn
            }
        })
        .collect();
    debug!("RASNS={:?}, SASN={}", rasns, sasn);
    if !rasns.contains(&sasn) {
        return Some((sasn, Rule::SingleSuccessorUnresolved, HiddenSearch::NotAttempted));
    }
    None
}

/// Restricted-pool vote with override and tie-breaking.
fn vote(
    ctx: &AnnotationContext<'_>,
    tier: Priority,
    iasns: &Tally,
    mut votes_all: Tally,
) -> (ASN, Rule, HiddenSearch) {
    let oracle = ctx.oracle;
    let related = |asn: &ASN| iasns.contains_key(asn) || iasns.keys().any(|i| oracle.rel(*i, *asn));
    let mut candidates: Vec<ASN> = votes_all.keys().copied().filter(|v| related(v)).collect();
    debug!("Vote rels: {:?}", candidates);

    let mut check_hidden = false;
    if candidates.len() < 2 {
        candidates = votes_all.keys().copied().collect();
        check_hidden = true;
    } else {
        let excluded: Vec<ASN> =
            votes_all.keys().copied().filter(|v| !candidates.contains(v)).collect();
        for vasn in excluded {
            let vorg = ctx.org(vasn);
            if let Some(&target) = candidates.iter().find(|c| ctx.org(**c) == vorg) {
                let moved = votes_all.remove(&vasn).unwrap_or(0);
                add_vote(&mut votes_all, target, moved);
            }
        }
    }

    let mut winners = max_num(candidates.iter().copied(), |asn| votes(&votes_all, *asn));
    let global = votes_all
        .keys()
        .copied()
        .min_by_key(|asn| (Reverse(votes(&votes_all, *asn)), oracle.conesize(*asn), *asn));
    if let (Some(global), Some(&first)) = (global, winners.first()) {
        if tier != Priority::MultiHop && votes(&votes_all, global) > votes(&votes_all, first) * 4 {
            return (global, Rule::VoteOverride, HiddenSearch::NotAttempted);
        }
    }

    let mut hidden = HiddenSearch::NotAttempted;
    if winners.len() > 1 && check_hidden {
        let outside: Vec<ASN> =
            winners.iter().copied().filter(|w| !iasns.contains_key(w)).collect();
        let mut intersection: BTreeSet<ASN> = customers_of(oracle, iasns.keys())
            .intersection(&providers_of(oracle, &outside))
            .copied()
            .collect();
        if intersection.is_empty() {
            intersection = providers_of(oracle, iasns.keys())
                .intersection(&customers_of(oracle, &outside))
                .copied()
                .collect();
        }
        if let Some(asn) = peek(&intersection) {
            winners = vec![asn];
            hidden = HiddenSearch::Found;
        }
    }

    match winners[..] {
        [asn] => (asn, Rule::VoteSingle, hidden),
        _ => match smallest_cone(oracle, winners.iter().copied()) {
            Some(asn) => (asn, Rule::VoteTie, hidden),
            None => (UNKNOWN_ASN, Rule::Indeterminate, hidden),
        },
    }
}
