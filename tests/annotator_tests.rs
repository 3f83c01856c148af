use std::collections::BTreeSet;
use router_owner::annotation::utils::hidden_asn;
use router_owner::annotation::{
    annotate_last_hop, annotate_router, AnnotationContext, DecisionCode, HiddenSearch, Rule,
    UpdateStore,
};
use router_owner::as_graph::{ASBuilder, ASGraph};
use router_owner::as_org::AsOrgMap;
use router_owner::engine::{RefinementEngine, RefinementResult, Termination};
use router_owner::engine_runner::EngineRunConfig;
use router_owner::shared::ASN;
use router_owner::topology::{InterfaceId, RouterId, TopologyBuilder, TopologyGraph};

fn run(
    graph: &TopologyGraph,
    as_graph: &ASGraph,
    orgs: &AsOrgMap,
) -> (UpdateStore<RouterId>, RefinementResult) {
    let config = EngineRunConfig::new("test").with_threads(2);
    let mut engine = RefinementEngine::new(graph, as_graph, orgs, config).unwrap();
    let result = engine.run();
    (engine.last_hops, result)
}

#[test]
fn test_single_successor_origin() {
    let as_graph = ASGraph::new();
    let orgs = AsOrgMap::new();
    let mut builder = TopologyBuilder::new();
    builder.add_interface("10.0.0.1", 100, None).unwrap();
    builder.add_interface("10.0.1.1", 100, None).unwrap();
    builder.add_router("R1").unwrap();
    builder.group_interfaces("R1", &["10.0.0.1"]).unwrap();
    builder.add_edge("10.0.0.1", "10.0.1.1", 1, 11).unwrap();
    let graph = builder.finalize(&as_graph, &orgs).unwrap();

    let (last_hops, result) = run(&graph, &as_graph, &orgs);
    let r1 = graph.router_by_name("R1").unwrap();
    let annotation = result.routers.get(r1);
    assert_eq!(annotation.asn, 100);
    assert_eq!(annotation.code.rule, Rule::SingleSuccessorOrigin);
    assert_eq!(result.termination, Termination::Converged);

    let last_hop = graph.router_by_name("10.0.1.1").unwrap();
    assert_eq!(last_hops.get(last_hop).asn, 100);
    assert_eq!(last_hops.get(last_hop).code.rule, Rule::LastHopNoDestinations);

    let succ = graph.interface_by_address("10.0.1.1").unwrap();
    assert_eq!(result.interfaces.get(succ).asn, 100);
    assert_eq!(result.interfaces.get(succ).code.rule, Rule::InterfaceSinglePredecessor);
}

#[test]
fn test_last_hop_destinations() {
    let as_graph = ASGraph::build(vec![
        ASBuilder::new(100).with_customers(vec![200]),
        ASBuilder::new(200),
    ]);
    let orgs = AsOrgMap::new();
    let mut builder = TopologyBuilder::new();
    builder.add_interface("10.0.0.1", 100, None).unwrap();
    builder.add_interface("10.0.1.1", 100, None).unwrap();
    builder.add_destination("10.0.0.1", 100).unwrap();
    builder.add_destination("10.0.1.1", 100).unwrap();
    builder.add_destination("10.0.1.1", 200).unwrap();
    let graph = builder.finalize(&as_graph, &orgs).unwrap();

    let first = graph.router_by_name("10.0.0.1").unwrap();
    let second = graph.router_by_name("10.0.1.1").unwrap();
    assert_eq!(graph.router(second).modified_dests, BTreeSet::from([200]));

    let (asn, code) = annotate_last_hop(&graph, &as_graph, &orgs, first);
    assert_eq!((asn, code.rule), (100, Rule::LastHopSingleOrg));
    let (asn, code) = annotate_last_hop(&graph, &as_graph, &orgs, second);
    assert_eq!((asn, code.rule), (200, Rule::LastHopSingleOrg));

    let (last_hops, result) = run(&graph, &as_graph, &orgs);
    assert_eq!(last_hops.get(first).asn, 100);
    assert_eq!(last_hops.get(second).asn, 200);
    assert!(result.routers.is_empty());
}

#[test]
fn test_last_hop_without_destinations_or_agreement() {
    let as_graph = ASGraph::new();
    let orgs = AsOrgMap::new();
    let mut builder = TopologyBuilder::new();
    builder.add_interface("10.0.0.1", 100, None).unwrap();
    builder.add_interface("10.0.0.2", 200, None).unwrap();
    builder.add_router("R1").unwrap();
    builder.group_interfaces("R1", &["10.0.0.1", "10.0.0.2"]).unwrap();
    let graph = builder.finalize(&as_graph, &orgs).unwrap();

    let r1 = graph.router_by_name("R1").unwrap();
    let (asn, code) = annotate_last_hop(&graph, &as_graph, &orgs, r1);
    assert_eq!((asn, code.rule), (-1, Rule::LastHopIndeterminate));
}

fn hidden_fixture() -> (ASGraph, TopologyGraph) {
    let as_graph = ASGraph::build(vec![
        ASBuilder::new(10).with_customers(vec![50]),
        ASBuilder::new(50).with_customers(vec![300]),
        ASBuilder::new(20),
        ASBuilder::new(300),
    ]);
    let mut builder = TopologyBuilder::new();
    builder.add_interface("10.0.0.1", 10, None).unwrap();
    builder.add_interface("10.5.0.1", 20, None).unwrap();
    builder.add_interface("10.9.0.1", 300, None).unwrap();
    builder.add_router("R").unwrap();
    builder.group_interfaces("R", &["10.0.0.1", "10.5.0.1"]).unwrap();
    builder.add_edge("10.0.0.1", "10.9.0.1", 1, 11).unwrap();
    let graph = builder.finalize(&as_graph, &AsOrgMap::new()).unwrap();
    (as_graph, graph)
}

#[test]
fn test_hidden_intermediary() {
    let (as_graph, graph) = hidden_fixture();
    let orgs = AsOrgMap::new();

    let (_, result) = run(&graph, &as_graph, &orgs);
    let annotation = result.routers.get(graph.router_by_name("R").unwrap());
    assert_eq!(annotation.asn, 50);
    assert_eq!(annotation.code.rule, Rule::SingleSuccessorHidden);
    assert_eq!(annotation.code.hidden, HiddenSearch::Found);
    assert_eq!(annotation.code.to_string(), "SINGLE_SUCC_HIDDEN+HIDDEN_INTER");
    assert_eq!(result.termination, Termination::Converged);
}

#[test]
fn test_hidden_intermediary_requires_unique_match() {
    let as_graph = ASGraph::build(vec![
        ASBuilder::new(1).with_customers(vec![2, 3]),
        ASBuilder::new(9).with_providers(vec![2, 3]),
    ]);
    let origins = BTreeSet::from([1]);
    assert_eq!(hidden_asn(&as_graph, &origins, 9), (9, HiddenSearch::NotFound));

    let as_graph = ASGraph::build(vec![
        ASBuilder::new(1).with_customers(vec![2]),
        ASBuilder::new(9).with_providers(vec![2, 3]),
    ]);
    assert_eq!(hidden_asn(&as_graph, &origins, 9), (2, HiddenSearch::Found));
}

fn colocated_fixture(target_org: Option<&str>) -> TopologyGraph {
    let mut builder = TopologyBuilder::new();
    builder.add_interface("10.0.0.1", 100, None).unwrap();
    builder.add_interface("10.0.0.2", 100, target_org).unwrap();
    builder.add_interface("10.0.0.3", 100, None).unwrap();
    builder.add_edge("10.0.0.1", "10.0.0.2", 1, 11).unwrap();
    builder.add_edge("10.0.0.3", "10.0.0.2", 1, 11).unwrap();
    builder.finalize(&ASGraph::new(), &AsOrgMap::new()).unwrap()
}

#[test]
fn test_same_subnet_predecessors_are_colocated() {
    let graph = colocated_fixture(None);
    let (_, result) = run(&graph, &ASGraph::new(), &AsOrgMap::new());

    let target = graph.interface_by_address("10.0.0.2").unwrap();
    let annotation = result.interfaces.get(target);
    assert_eq!(annotation.asn, 100);
    assert_eq!(annotation.code.rule, Rule::InterfaceConsensus);
    assert!(annotation.code.colocated);
}

#[test]
fn test_different_org_uses_router_annotation() {
    let graph = colocated_fixture(Some("ORG-T"));
    let (_, result) = run(&graph, &ASGraph::new(), &AsOrgMap::new());

    let target = graph.interface_by_address("10.0.0.2").unwrap();
    let annotation = result.interfaces.get(target);
    assert_eq!(annotation.asn, 100);
    assert!(!annotation.code.colocated);
}

fn tie_fixture(as_graph: &ASGraph) -> TopologyGraph {
    let mut builder = TopologyBuilder::new();
    builder.add_interface("10.0.0.1", 5, None).unwrap();
    builder.add_interface("10.0.9.1", 7, None).unwrap();
    builder.add_interface("10.1.0.1", 5, None).unwrap();
    builder.add_interface("10.2.0.1", 7, None).unwrap();
    builder.add_router("R").unwrap();
    builder.group_interfaces("R", &["10.0.0.1", "10.0.9.1"]).unwrap();
    builder.add_edge("10.0.0.1", "10.1.0.1", 1, 11).unwrap();
    builder.add_edge("10.0.9.1", "10.2.0.1", 1, 11).unwrap();
    builder.finalize(as_graph, &AsOrgMap::new()).unwrap()
}

#[test]
fn test_tie_prefers_smaller_as() {
    let as_graph = ASGraph::new();
    let graph = tie_fixture(&as_graph);
    let (_, result) = run(&graph, &as_graph, &AsOrgMap::new());

    let annotation = result.routers.get(graph.router_by_name("R").unwrap());
    assert_eq!((annotation.asn, annotation.code.rule), (5, Rule::VoteTie));
}

#[test]
fn test_tie_prefers_smaller_cone() {
    let as_graph = ASGraph::build(vec![
        ASBuilder::new(5).with_customers(vec![99]),
        ASBuilder::new(7),
    ]);
    let graph = tie_fixture(&as_graph);
    let (_, result) = run(&graph, &as_graph, &AsOrgMap::new());

    let annotation = result.routers.get(graph.router_by_name("R").unwrap());
    assert_eq!((annotation.asn, annotation.code.rule), (7, Rule::VoteTie));
}

fn tiered_fixture(multi_hop_asn: i64) -> TopologyGraph {
    let mut builder = TopologyBuilder::new();
    builder.add_interface("10.0.0.1", 100, None).unwrap();
    builder.add_interface("10.1.0.1", 100, None).unwrap();
    builder.add_interface("10.2.0.1", multi_hop_asn, None).unwrap();
    builder.add_edge("10.0.0.1", "10.1.0.1", 1, 11).unwrap();
    builder.add_edge("10.0.0.1", "10.2.0.1", 2, 11).unwrap();
    builder.finalize(&ASGraph::new(), &AsOrgMap::new()).unwrap()
}

#[test]
fn test_only_best_tier_is_used() {
    let mut seen = Vec::new();
    for multi_hop_asn in [100, 200, 300] {
        let graph = tiered_fixture(multi_hop_asn);
        let (_, result) = run(&graph, &ASGraph::new(), &AsOrgMap::new());
        let annotation = result.routers.get(graph.router_by_name("10.0.0.1").unwrap()).clone();
        seen.push(annotation);
    }
    assert!(seen.iter().all(|annotation| *annotation == seen[0]));
    assert_eq!(seen[0].asn, 100);
}

/// Committed annotations a single router decision reads from.
struct Stores {
    last_hops: UpdateStore<RouterId>,
    routers: UpdateStore<RouterId>,
    interfaces: UpdateStore<InterfaceId>,
}

impl Stores {
    fn new() -> Self {
        Stores {
            last_hops: UpdateStore::new(),
            routers: UpdateStore::new(),
            interfaces: UpdateStore::new(),
        }
    }

    fn last_hop(mut self, graph: &TopologyGraph, name: &str, asn: ASN) -> Self {
        let rid = graph.router_by_name(name).unwrap();
        let code = DecisionCode::new(Rule::LastHopSingleOrg);
        self.last_hops.add_update(rid, asn, asn.to_string(), code);
        self.last_hops.advance();
        self
    }

    fn interface(mut self, graph: &TopologyGraph, address: &str, asn: ASN, rule: Rule) -> Self {
        let iid = graph.interface_by_address(address).unwrap();
        self.interfaces.add_update(iid, asn, asn.to_string(), DecisionCode::new(rule));
        self.interfaces.advance();
        self
    }
}

fn annotate(
    graph: &TopologyGraph,
    as_graph: &ASGraph,
    stores: &Stores,
    name: &str,
) -> (ASN, DecisionCode) {
    let orgs = AsOrgMap::new();
    let config = EngineRunConfig::default();
    let ctx = AnnotationContext {
        graph,
        oracle: as_graph,
        orgs: &orgs,
        config: &config,
        last_hops: &stores.last_hops,
        routers: &stores.routers,
        interfaces: &stores.interfaces,
    };
    annotate_router(&ctx, graph.router_by_name(name).unwrap())
}

/// Router `R` holding `interfaces`, with `edges` as (pred, succ, succ AS,
/// hop distance). Successor interfaces become singleton routers.
fn router_fixture(
    as_graph: &ASGraph,
    interfaces: &[(&str, ASN)],
    edges: &[(&str, &str, ASN, u32)],
    dests: &[(&str, ASN)],
) -> TopologyGraph {
    let mut builder = TopologyBuilder::new();
    for (address, asn) in interfaces {
        builder.add_interface(address, *asn, None).unwrap();
    }
    for (_, succ, asn, _) in edges {
        builder.add_interface(succ, *asn, None).unwrap();
    }
    builder.add_router("R").unwrap();
    let addresses: Vec<&str> = interfaces.iter().map(|(address, _)| *address).collect();
    builder.group_interfaces("R", &addresses).unwrap();
    for (pred, succ, _, distance) in edges {
        builder.add_edge(pred, succ, *distance, 11).unwrap();
    }
    for (address, asn) in dests {
        builder.add_destination(address, *asn).unwrap();
    }
    builder.finalize(as_graph, &AsOrgMap::new()).unwrap()
}

/// Router `R` with one interface and a single successor edge.
fn single_edge_fixture(
    as_graph: &ASGraph,
    own: ASN,
    succ: ASN,
    distance: u32,
    dests: &[(&str, ASN)],
) -> TopologyGraph {
    let edges = [("10.0.0.1", "10.5.0.1", succ, distance)];
    router_fixture(as_graph, &[("10.0.0.1", own)], &edges, dests)
}

fn reallocation_fixture(dests: &[(&str, ASN)]) -> (ASGraph, TopologyGraph) {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_customers(vec![500])]);
    let graph = router_fixture(
        &as_graph,
        &[("10.0.0.1", 100)],
        &[("10.0.0.1", "10.1.0.1", 100, 1), ("10.0.0.1", "10.1.0.2", 100, 1)],
        dests,
    );
    (as_graph, graph)
}

#[test]
fn test_reallocated_prefix_moves_votes_to_customer() {
    let (as_graph, graph) = reallocation_fixture(&[]);
    let stores = Stores::new()
        .last_hop(&graph, "10.1.0.1", 500)
        .last_hop(&graph, "10.1.0.2", 500);

    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!(asn, 500);
    assert_eq!(code.rule, Rule::RemainingCustomer);
    assert!(code.reallocated);
    assert_eq!(code.to_string(), "REMAINING_4+REALLOCATED");
}

#[test]
fn test_reallocated_prefix_end_to_end() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_customers(vec![500])]);
    let orgs = AsOrgMap::new();
    let mut builder = TopologyBuilder::new();
    builder.add_interface("10.0.0.1", 100, None).unwrap();
    builder.add_interface("10.1.0.1", 100, None).unwrap();
    builder.add_interface("10.1.0.2", 100, None).unwrap();
    builder.add_edge("10.0.0.1", "10.1.0.1", 1, 11).unwrap();
    builder.add_edge("10.0.0.1", "10.1.0.2", 1, 11).unwrap();
    builder.add_destination("10.1.0.1", 500).unwrap();
    builder.add_destination("10.1.0.2", 500).unwrap();
    let graph = builder.finalize(&as_graph, &orgs).unwrap();

    let (last_hops, result) = run(&graph, &as_graph, &orgs);
    let succ = graph.router_by_name("10.1.0.1").unwrap();
    assert_eq!(last_hops.get(succ).asn, 500);

    let annotation = result.routers.get(graph.router_by_name("10.0.0.1").unwrap());
    assert_eq!(annotation.asn, 500);
    assert!(annotation.code.reallocated);
}

#[test]
fn test_reallocation_needs_a_different_owner() {
    let (as_graph, graph) = reallocation_fixture(&[]);
    let stores = Stores::new()
        .last_hop(&graph, "10.1.0.1", 100)
        .last_hop(&graph, "10.1.0.2", 100);

    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!((asn, code.rule), (100, Rule::SingleSuccessorOrigin));
    assert!(!code.reallocated);
}

#[test]
fn test_reallocation_uses_single_modified_destination() {
    let (as_graph, graph) = reallocation_fixture(&[("10.0.0.1", 500)]);
    let stores = Stores::new()
        .last_hop(&graph, "10.1.0.1", 100)
        .last_hop(&graph, "10.1.0.2", 100);

    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!((asn, code.rule), (500, Rule::SingleSuccessorUnresolved));
    assert!(code.reallocated);
}

#[test]
fn test_single_successor_provider() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_customers(vec![200])]);
    let graph = single_edge_fixture(&as_graph, 200, 100, 1, &[]);

    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (100, Rule::SingleSuccessorCustomer));
}

fn peer_successor_fixture() -> (ASGraph, TopologyGraph) {
    let as_graph = ASGraph::build(vec![ASBuilder::new(200).with_peers(vec![300])]);
    let graph = single_edge_fixture(&as_graph, 200, 300, 1, &[]);
    (as_graph, graph)
}

#[test]
fn test_interface_agreement() {
    let (as_graph, graph) = peer_successor_fixture();
    let stores = Stores::new().interface(&graph, "10.5.0.1", 300, Rule::InterfaceSinglePredecessor);

    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!((asn, code.rule), (300, Rule::InterfaceAgreement));
}

#[test]
fn test_interface_agreement_needs_confidence_when_router_agrees() {
    let (as_graph, graph) = peer_successor_fixture();
    let stores = Stores::new()
        .last_hop(&graph, "10.5.0.1", 300)
        .interface(&graph, "10.5.0.1", 300, Rule::InterfaceSinglePredecessor);
    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!((asn, code.rule), (200, Rule::VoteTie));

    let stores = Stores::new()
        .last_hop(&graph, "10.5.0.1", 300)
        .interface(&graph, "10.5.0.1", 300, Rule::InterfaceConsensus);
    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!((asn, code.rule), (300, Rule::InterfaceAgreement));
}

#[test]
fn test_single_successor_unresolved() {
    let as_graph =
        ASGraph::build(vec![ASBuilder::new(200).with_peers(vec![300]).with_customers(vec![400])]);
    let graph = single_edge_fixture(&as_graph, 200, 300, 1, &[]);
    let stores = Stores::new().last_hop(&graph, "10.5.0.1", 400);

    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!((asn, code.rule), (300, Rule::SingleSuccessorUnresolved));
}

fn third_party_fixture(dests: &[(&str, ASN)]) -> (ASGraph, TopologyGraph) {
    let as_graph = ASGraph::build(vec![
        ASBuilder::new(200).with_customers(vec![50]),
        ASBuilder::new(50).with_customers(vec![400]),
    ]);
    let graph = single_edge_fixture(&as_graph, 200, 300, 1, dests);
    (as_graph, graph)
}

#[test]
fn test_third_party_successor_votes_its_router() {
    let (as_graph, graph) = third_party_fixture(&[]);
    let stores = Stores::new().last_hop(&graph, "10.5.0.1", 400);

    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!((asn, code.rule), (50, Rule::SingleSuccessorHidden));
    assert_eq!(code.hidden, HiddenSearch::Found);
}

#[test]
fn test_third_party_skipped_for_modified_destination() {
    let (as_graph, graph) = third_party_fixture(&[("10.0.0.1", 400)]);
    let stores = Stores::new().last_hop(&graph, "10.5.0.1", 400);

    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!((asn, code.rule), (300, Rule::SingleSuccessorHidden));
    assert_eq!(code.hidden, HiddenSearch::NotFound);
}

#[test]
fn test_unannounced_successor_votes_its_router() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_customers(vec![200])]);
    let graph = single_edge_fixture(&as_graph, 100, 0, 1, &[]);

    let stores = Stores::new().last_hop(&graph, "10.5.0.1", 200);
    let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
    assert_eq!((asn, code.rule), (200, Rule::RemainingCustomer));

    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (100, Rule::VoteSingle));
}

#[test]
fn test_multi_hop_uses_successor_interface_annotation() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_customers(vec![400])]);
    for (distance, expected) in [
        (2, (400, Rule::InterfaceAgreement)),
        (1, (300, Rule::SingleSuccessorHidden)),
    ] {
        let graph = single_edge_fixture(&as_graph, 100, 300, distance, &[]);
        let stores =
            Stores::new().interface(&graph, "10.5.0.1", 400, Rule::InterfaceSinglePredecessor);
        let (asn, code) = annotate(&graph, &as_graph, &stores, "R");
        assert_eq!((asn, code.rule), expected, "hop distance {}", distance);
    }
}

#[test]
fn test_all_peer_successors() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_peers(vec![200, 300])]);
    let graph = router_fixture(
        &as_graph,
        &[("10.0.0.1", 100)],
        &[("10.0.0.1", "10.1.0.1", 200, 1), ("10.0.0.1", "10.2.0.1", 300, 1)],
        &[],
    );

    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (100, Rule::AllPeerSuccessors));
}

#[test]
fn test_interface_successor_majority() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_customers(vec![300])]);
    let graph = router_fixture(
        &as_graph,
        &[("10.0.0.1", 100)],
        &[("10.0.0.1", "10.1.0.1", 100, 1), ("10.0.0.1", "10.2.0.1", 300, 1)],
        &[],
    );

    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (100, Rule::InterfaceSuccessorMajority));
}

#[test]
fn test_all_peer_origins() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(500).with_peers(vec![100, 101])]);
    let graph = router_fixture(
        &as_graph,
        &[("10.0.0.1", 100), ("10.0.7.1", 101)],
        &[("10.0.0.1", "10.9.0.1", 500, 1)],
        &[],
    );

    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (500, Rule::AllPeerOrigins));
}

#[test]
fn test_remaining_customer() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_customers(vec![500])]);
    let graph = router_fixture(
        &as_graph,
        &[("10.0.0.1", 100), ("10.0.9.1", 200)],
        &[
            ("10.0.0.1", "10.1.0.1", 100, 1),
            ("10.0.9.1", "10.2.0.1", 200, 1),
            ("10.0.0.1", "10.3.0.1", 500, 1),
        ],
        &[],
    );

    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (500, Rule::RemainingCustomer));
}

fn override_fixture(distance: u32) -> (ASGraph, TopologyGraph) {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_peers(vec![200])]);
    let mut edges = vec![("10.0.0.1", "10.2.0.1", 200, distance)];
    for succ in ["10.9.1.1", "10.9.2.1", "10.9.3.1", "10.9.4.1", "10.9.5.1"] {
        edges.push(("10.0.0.1", succ, 900, distance));
    }
    let graph = router_fixture(&as_graph, &[("10.0.0.1", 100)], &edges, &[]);
    (as_graph, graph)
}

#[test]
fn test_vote_override_outside_multi_hop() {
    let (as_graph, graph) = override_fixture(1);
    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (900, Rule::VoteOverride));
    assert_eq!(code.hidden, HiddenSearch::NotAttempted);

    let (as_graph, graph) = override_fixture(2);
    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (100, Rule::VoteTie));
}

#[test]
fn test_vote_tie_finds_hidden_intermediary() {
    let as_graph = ASGraph::build(vec![
        ASBuilder::new(10).with_customers(vec![50]),
        ASBuilder::new(50).with_customers(vec![20, 30]),
    ]);
    let graph = router_fixture(
        &as_graph,
        &[("10.0.0.1", 10)],
        &[("10.0.0.1", "10.1.0.1", 20, 1), ("10.0.0.1", "10.2.0.1", 30, 1)],
        &[],
    );

    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (50, Rule::VoteSingle));
    assert_eq!(code.hidden, HiddenSearch::Found);
}

#[test]
fn test_unrelated_vote_winner_is_replaced_by_hidden_as() {
    let as_graph = ASGraph::build(vec![
        ASBuilder::new(10).with_customers(vec![50]),
        ASBuilder::new(50).with_customers(vec![30]),
    ]);
    let graph = router_fixture(
        &as_graph,
        &[("10.0.0.1", 10)],
        &[
            ("10.0.0.1", "10.1.0.1", 30, 1),
            ("10.0.0.1", "10.2.0.1", 30, 1),
            ("10.0.0.1", "10.3.0.1", 40, 1),
        ],
        &[],
    );

    let (asn, code) = annotate(&graph, &as_graph, &Stores::new(), "R");
    assert_eq!((asn, code.rule), (50, Rule::VoteSingle));
    assert_eq!(code.hidden, HiddenSearch::Found);
}

fn last_hop_fixture(as_graph: &ASGraph, asn: ASN, dests: &[ASN]) -> TopologyGraph {
    let mut builder = TopologyBuilder::new();
    builder.add_interface("10.0.0.1", asn, None).unwrap();
    for dest in dests {
        builder.add_destination("10.0.0.1", *dest).unwrap();
    }
    builder.finalize(as_graph, &AsOrgMap::new()).unwrap()
}

fn last_hop(as_graph: &ASGraph, graph: &TopologyGraph) -> (ASN, DecisionCode) {
    let rid = graph.router_by_name("10.0.0.1").unwrap();
    annotate_last_hop(graph, as_graph, &AsOrgMap::new(), rid)
}

#[test]
fn test_last_hop_interface_match() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(200).with_customers(vec![999])]);
    let graph = last_hop_fixture(&as_graph, 100, &[100, 200]);

    let (asn, code) = last_hop(&as_graph, &graph);
    assert_eq!((asn, code.rule), (100, Rule::LastHopInterfaceMatch));
}

#[test]
fn test_last_hop_related_destination() {
    let as_graph = ASGraph::build(vec![ASBuilder::new(100).with_customers(vec![200])]);
    let graph = last_hop_fixture(&as_graph, 100, &[200, 300]);

    let (asn, code) = last_hop(&as_graph, &graph);
    assert_eq!((asn, code.rule), (200, Rule::LastHopRelated));
}

#[test]
fn test_last_hop_heap_without_announced_interfaces() {
    let as_graph = ASGraph::new();
    let graph = last_hop_fixture(&as_graph, 0, &[200, 300]);

    let (asn, code) = last_hop(&as_graph, &graph);
    assert_eq!((asn, code.rule), (300, Rule::LastHopHeap));
}

#[test]
fn test_last_hop_hidden_intermediary() {
    let as_graph = ASGraph::build(vec![
        ASBuilder::new(100).with_customers(vec![50]),
        ASBuilder::new(50).with_customers(vec![300]),
    ]);
    let graph = last_hop_fixture(&as_graph, 100, &[300]);

    let (asn, code) = last_hop(&as_graph, &graph);
    assert_eq!((asn, code.rule), (50, Rule::LastHopHidden));
    assert_eq!(code.hidden, HiddenSearch::Found);
}

#[test]
fn test_last_hop_missing_intermediary() {
    let as_graph = ASGraph::new();
    for dests in [vec![300], vec![200, 300]] {
        let graph = last_hop_fixture(&as_graph, 100, &dests);
        let (asn, code) = last_hop(&as_graph, &graph);
        assert_eq!((asn, code.rule), (100, Rule::LastHopMissing), "dests {:?}", dests);
        assert_eq!(code.hidden, HiddenSearch::NotFound);
    }
}
