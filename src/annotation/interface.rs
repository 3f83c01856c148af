use std::cmp::Reverse;
use std::collections::BTreeSet;

use tracing::debug;

use super::code::{DecisionCode, Rule};
use super::context::AnnotationContext;
use super::utils::{add_vote, max_num, votes, Tally};
use crate::shared::{Priority, ASN, UNKNOWN_ASN};
use crate::topology::{adjacent_in_subnet, InterfaceId};

/// Infer the AS on the far side of the link that ends at `iid`.
pub fn annotate_interface(ctx: &AnnotationContext<'_>, iid: InterfaceId) -> (ASN, DecisionCode) {
    let oracle = ctx.oracle;
    let interface = ctx.graph.interface(iid);
    let preds: Vec<InterfaceId> = interface.preds_in(Priority::NextHop).collect();

    let mut tally = Tally::new();
    let mut colocated: BTreeSet<ASN> = BTreeSet::new();
    for &ipred in &preds {
        let pred = ctx.graph.interface(ipred);
        let same_subnet = adjacent_in_subnet(
            interface.address,
            pred.address,
            ctx.config.subnet_prefix_v4,
            ctx.config.subnet_prefix_v6,
        );
        let asn = if same_subnet && interface.org == pred.org {
            colocated.insert(pred.asn);
            pred.asn
        } else {
            match ctx.router_asn(pred.router) {
                UNKNOWN_ASN => pred.asn,
                rasn => rasn,
            }
        };
        debug!("Addr={}, ASN={}, Subnet={}, Vote={}", pred.address, pred.asn, same_subnet, asn);
        add_vote(&mut tally, asn, 1);
    }

    if tally.is_empty() {
        return (UNKNOWN_ASN, DecisionCode::new(Rule::Indeterminate));
    }

    if tally.len() == 1 {
        let asn = tally.keys().next().copied().unwrap_or(UNKNOWN_ASN);
        let rule = if preds.len() > 1 {
            Rule::InterfaceConsensus
        } else {
            Rule::InterfaceSinglePredecessor
        };
        return (asn, DecisionCode::new(rule).with_colocated(colocated.contains(&asn)));
    }

    let asns = max_num(tally.keys().copied(), |asn| votes(&tally, *asn));
    debug!("MaxNum: {:?}", asns);
    let own = interface.asn;
    let mut rels: Vec<ASN> =
        asns.iter().copied().filter(|a| *a == own || oracle.rel(own, *a)).collect();
    if rels.is_empty() {
        rels = asns.clone();
    }
    // prefer the observed AS, then its providers, then larger cones
    let asn = rels
        .iter()
        .copied()
        .min_by_key(|x| {
            (*x != own, !oracle.provider_rel(own, *x), Reverse(oracle.conesize(*x)), *x)
        })
        .unwrap_or(own);
    let rule = if asns.len() == 1 && preds.len() > 1 {
        Rule::InterfaceMajority
    } else {
        Rule::InterfaceTieBreak
    };
    (asn, DecisionCode::new(rule).with_colocated(colocated.contains(&asn)))
}
