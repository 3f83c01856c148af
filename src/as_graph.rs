use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::shared::CycleError;

pub use crate::shared::ASN;

lazy_static::lazy_static! {
    static ref EMPTY_SET: HashSet<ASN> = HashSet::new();
}

/// Relationship queries the annotators make against BGP data.
///
/// `customer_rel(a, b)` holds when `b` is a customer of `a`, and
/// `provider_rel(a, b)` when `b` is a provider of `a`. ASes without data
/// have no neighbors and an empty cone.
pub trait RelationshipOracle: Send + Sync {
    fn customers(&self, asn: ASN) -> &HashSet<ASN>;
    fn providers(&self, asn: ASN) -> &HashSet<ASN>;
    fn peers(&self, asn: ASN) -> &HashSet<ASN>;

    /// Customer cone of `asn`, excluding `asn` itself.
    fn cone(&self, asn: ASN) -> &HashSet<ASN>;

    fn conesize(&self, asn: ASN) -> usize {
        self.cone(asn).len()
    }

    fn customer_rel(&self, a: ASN, b: ASN) -> bool {
        self.customers(a).contains(&b)
    }

    fn provider_rel(&self, a: ASN, b: ASN) -> bool {
        self.providers(a).contains(&b)
    }

    fn peer_rel(&self, a: ASN, b: ASN) -> bool {
        self.peers(a).contains(&b)
    }

    fn rel(&self, a: ASN, b: ASN) -> bool {
        self.customer_rel(a, b) || self.provider_rel(a, b) || self.peer_rel(a, b)
    }
}

#[derive(Debug, Clone)]
pub struct AS {
    pub asn: ASN,
    pub peers: HashSet<ASN>,
    pub providers: HashSet<ASN>,
    pub customers: HashSet<ASN>,
    pub customer_cone: HashSet<ASN>,
}

impl AS {
    pub fn new(asn: ASN) -> Self {
        AS {
            asn,
            peers: HashSet::new(),
            providers: HashSet::new(),
            customers: HashSet::new(),
            customer_cone: HashSet::new(),
        }
    }

    pub fn from_asn_sets(
        asn: ASN,
        peer_asns: HashSet<ASN>,
        provider_asns: HashSet<ASN>,
        customer_asns: HashSet<ASN>,
    ) -> Self {
        AS {
            asn,
            peers: peer_asns,
            providers: provider_asns,
            customers: customer_asns,
            customer_cone: HashSet::new(),
        }
    }
}

/// Builder used to describe an AS before the graph is assembled
#[derive(Debug, Clone)]
pub struct ASBuilder {
    pub asn: ASN,
    pub peer_asns: Vec<ASN>,
    pub provider_asns: Vec<ASN>,
    pub customer_asns: Vec<ASN>,
}

impl ASBuilder {
    pub fn new(asn: ASN) -> Self {
        ASBuilder {
            asn,
            peer_asns: Vec::new(),
            provider_asns: Vec::new(),
            customer_asns: Vec::new(),
        }
    }

    pub fn with_peers(mut self, peers: Vec<ASN>) -> Self {
        self.peer_asns = peers;
        self
    }

    pub fn with_providers(mut self, providers: Vec<ASN>) -> Self {
        self.provider_asns = providers;
        self
    }

    pub fn with_customers(mut self, customers: Vec<ASN>) -> Self {
        self.customer_asns = customers;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ASGraph {
    pub as_dict: HashMap<ASN, AS>,
}

impl ASGraph {
    pub fn new() -> Self {
        ASGraph {
            as_dict: HashMap::new(),
        }
    }

    /// Build a graph from builders, mirroring every relationship onto the
    /// other endpoint and computing customer cones.
    pub fn build(builders: Vec<ASBuilder>) -> ASGraph {
        let mut as_graph = ASGraph::new();
        for builder in builders {
            for provider in builder.provider_asns {
                as_graph.add_provider_customer(provider, builder.asn);
            }
            for customer in builder.customer_asns {
                as_graph.add_provider_customer(builder.asn, customer);
            }
            for peer in builder.peer_asns {
                as_graph.add_peers(builder.asn, peer);
            }
            as_graph.as_dict.entry(builder.asn).or_insert_with(|| AS::new(builder.asn));
        }
        as_graph.add_customer_cones();
        as_graph
    }

    pub fn get(&self, asn: &ASN) -> Option<&AS> {
        self.as_dict.get(asn)
    }

    pub fn get_mut(&mut self, asn: &ASN) -> Option<&mut AS> {
        self.as_dict.get_mut(asn)
    }

    pub fn insert(&mut self, as_obj: AS) {
        self.as_dict.insert(as_obj.asn, as_obj);
    }

    pub fn iter(&self) -> impl Iterator<Item = &AS> {
        self.as_dict.values()
    }

    pub fn len(&self) -> usize {
        self.as_dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_dict.is_empty()
    }

    pub fn add_provider_customer(&mut self, provider: ASN, customer: ASN) {
        self.as_dict
            .entry(provider)
            .or_insert_with(|| AS::new(provider))
            .customers
            .insert(customer);
        self.as_dict
            .entry(customer)
            .or_insert_with(|| AS::new(customer))
            .providers
            .insert(provider);
    }

    pub fn add_peers(&mut self, a: ASN, b: ASN) {
        self.as_dict.entry(a).or_insert_with(|| AS::new(a)).peers.insert(b);
        self.as_dict.entry(b).or_insert_with(|| AS::new(b)).peers.insert(a);
    }

    pub fn check_for_cycles(&self) -> Result<(), CycleError> {
        let mut done: HashSet<ASN> = HashSet::new();
        let mut asns: Vec<ASN> = self.as_dict.keys().copied().collect();
        asns.sort_unstable();

        for start in asns {
            if done.contains(&start) {
                continue;
            }
            let mut on_path: HashSet<ASN> = HashSet::new();
            // (asn, whether its providers were already pushed)
            let mut stack: Vec<(ASN, bool)> = vec![(start, false)];

            while let Some((current_asn, expanded)) = stack.pop() {
                if expanded {
                    on_path.remove(&current_asn);
                    done.insert(current_asn);
                    continue;
                }
                if on_path.contains(&current_asn) {
                    return Err(CycleError { asn: current_asn });
                }
                if done.contains(&current_asn) {
                    continue;
                }
                on_path.insert(current_asn);
                stack.push((current_asn, true));

                if let Some(current_as) = self.as_dict.get(&current_asn) {
                    for &provider_asn in &current_as.providers {
                        if on_path.contains(&provider_asn) {
                            return Err(CycleError { asn: provider_asn });
                        }
                        if !done.contains(&provider_asn) {
                            stack.push((provider_asn, false));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Compute customer cones from the customer edges. Cones never contain
    /// their own AS, so a provider cycle does not inflate them.
    pub fn add_customer_cones(&mut self) {
        if let Err(e) = self.check_for_cycles() {
            warn!("{}; cones are truncated at the cycle", e);
        }

        let mut cones: HashMap<ASN, HashSet<ASN>> = HashMap::new();
        let all_asns: Vec<ASN> = self.as_dict.keys().copied().collect();
        for asn in all_asns {
            let mut in_progress = HashSet::new();
            self.calculate_customer_cone(asn, &mut cones, &mut in_progress);
        }

        for (asn, mut cone) in cones {
            cone.remove(&asn);
            if let Some(as_obj) = self.as_dict.get_mut(&asn) {
                as_obj.customer_cone = cone;
            }
        }
    }

    fn calculate_customer_cone(
        &self,
        asn: ASN,
        visited: &mut HashMap<ASN, HashSet<ASN>>,
        in_progress: &mut HashSet<ASN>,
    ) -> HashSet<ASN> {
        if let Some(cone) = visited.get(&asn) {
            return cone.clone();
        }
        if !in_progress.insert(asn) {
            return HashSet::new();
        }

        let mut cone = HashSet::new();
        if let Some(as_obj) = self.as_dict.get(&asn) {
            for &customer_asn in &as_obj.customers {
                cone.insert(customer_asn);
                let customer_cone =
                    self.calculate_customer_cone(customer_asn, visited, in_progress);
                cone.extend(customer_cone);
            }
        }

        in_progress.remove(&asn);
        visited.insert(asn, cone.clone());
        cone
    }

    /// Replace computed cones with externally supplied ones (CAIDA ppdc-ases).
    pub fn set_customer_cone(&mut self, asn: ASN, mut cone: HashSet<ASN>) {
        cone.remove(&asn);
        self.as_dict.entry(asn).or_insert_with(|| AS::new(asn)).customer_cone = cone;
    }
}

impl Default for ASGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationshipOracle for ASGraph {
    fn customers(&self, asn: ASN) -> &HashSet<ASN> {
        self.as_dict.get(&asn).map(|a| &a.customers).unwrap_or(&*EMPTY_SET)
    }

    fn providers(&self, asn: ASN) -> &HashSet<ASN> {
        self.as_dict.get(&asn).map(|a| &a.providers).unwrap_or(&*EMPTY_SET)
    }

    fn peers(&self, asn: ASN) -> &HashSet<ASN> {
        self.as_dict.get(&asn).map(|a| &a.peers).unwrap_or(&*EMPTY_SET)
    }

    fn cone(&self, asn: ASN) -> &HashSet<ASN> {
        self.as_dict.get(&asn).map(|a| &a.customer_cone).unwrap_or(&*EMPTY_SET)
    }
}
