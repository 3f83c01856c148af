use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::code::HiddenSearch;
use crate::as_graph::RelationshipOracle;
use crate::shared::ASN;

/// Multiset of AS votes, ordered by AS for deterministic iteration.
pub type Tally = BTreeMap<ASN, usize>;

pub fn add_vote(tally: &mut Tally, asn: ASN, count: usize) {
    *tally.entry(asn).or_insert(0) += count;
}

pub fn votes(tally: &Tally, asn: ASN) -> usize {
    tally.get(&asn).copied().unwrap_or(0)
}

pub fn max_votes(tally: &Tally) -> usize {
    tally.values().copied().max().unwrap_or(0)
}

/// All items sharing the maximum key, in input order.
pub fn max_num<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut best: Option<K> = None;
    let mut result = Vec::new();
    for item in items {
        let k = key(&item);
        match &best {
            Some(b) if k < *b => {}
            Some(b) if k == *b => result.push(item),
            _ => {
                best = Some(k);
                result.clear();
                result.push(item);
            }
        }
    }
    result
}

/// Sole member of a set.
pub fn peek<T: Copy>(set: &BTreeSet<T>) -> Option<T> {
    if set.len() == 1 {
        set.iter().next().copied()
    } else {
        None
    }
}

/// Smallest cone, then smallest AS.
pub fn smallest_cone(
    oracle: &dyn RelationshipOracle,
    asns: impl IntoIterator<Item = ASN>,
) -> Option<ASN> {
    asns.into_iter().min_by_key(|asn| (oracle.conesize(*asn), *asn))
}

/// Largest cone, then smallest AS.
pub fn largest_cone(
    oracle: &dyn RelationshipOracle,
    asns: impl IntoIterator<Item = ASN>,
) -> Option<ASN> {
    asns.into_iter().min_by_key(|asn| (Reverse(oracle.conesize(*asn)), *asn))
}

pub fn customers_of<'a>(
    oracle: &dyn RelationshipOracle,
    asns: impl IntoIterator<Item = &'a ASN>,
) -> BTreeSet<ASN> {
    asns.into_iter().flat_map(|asn| oracle.customers(*asn).iter().copied()).collect()
}

pub fn providers_of<'a>(
    oracle: &dyn RelationshipOracle,
    asns: impl IntoIterator<Item = &'a ASN>,
) -> BTreeSet<ASN> {
    asns.into_iter().flat_map(|asn| oracle.providers(*asn).iter().copied()).collect()
}

/// Look for a single AS that sits between `origins` and `candidate` in the
/// relationship graph but never showed up in the traces.
pub fn hidden_asn(
    oracle: &dyn RelationshipOracle,
    origins: &BTreeSet<ASN>,
    candidate: ASN,
) -> (ASN, HiddenSearch) {
    let providers: BTreeSet<ASN> = oracle.providers(candidate).iter().copied().collect();
    let intersection: BTreeSet<ASN> =
        customers_of(oracle, origins).intersection(&providers).copied().collect();
    if let Some(asn) = peek(&intersection) {
        debug!("Hidden: {}", asn);
        return (asn, HiddenSearch::Found);
    }
    if intersection.is_empty() {
        let customers: BTreeSet<ASN> = oracle.customers(candidate).iter().copied().collect();
        let reversed: BTreeSet<ASN> =
            providers_of(oracle, origins).intersection(&customers).copied().collect();
        if let Some(asn) = peek(&reversed) {
            debug!("Hidden reversed: {}", asn);
            return (asn, HiddenSearch::Found);
        }
    }
    debug!("Missing: {:?}-{}", origins, candidate);
    (candidate, HiddenSearch::NotFound)
}
