use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::annotation::{
    annotate_interface, annotate_last_hops, annotate_router, Annotation, AnnotationContext,
    DecisionCode, UpdateStore,
};
use crate::as_graph::RelationshipOracle;
use crate::as_org::OrgDirectory;
use crate::engine_runner::EngineRunConfig;
use crate::shared::{ConfigError, ASN};
use crate::topology::{InterfaceId, RouterId, TopologyGraph};

/// Why the refinement loop stopped. Every variant is a normal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Termination {
    /// A round changed no node.
    Converged,
    /// A round reproduced a state already seen.
    CycleDetected,
    /// The configured round limit was reached.
    IterationCap,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::Converged => "CONVERGED",
            Termination::CycleDetected => "CYCLE_DETECTED",
            Termination::IterationCap => "ITERATION_CAP",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct RefinementResult {
    pub routers: UpdateStore<RouterId>,
    pub interfaces: UpdateStore<InterfaceId>,
    pub termination: Termination,
    pub iterations: usize,
}

type Snapshot = (
    Arc<HashMap<RouterId, Annotation>>,
    Arc<HashMap<InterfaceId, Annotation>>,
);

/// Alternates router and interface passes over a finalized topology until
/// the annotations stop changing.
pub struct RefinementEngine<'a> {
    pub graph: &'a TopologyGraph,
    pub oracle: &'a dyn RelationshipOracle,
    pub orgs: &'a dyn OrgDirectory,
    pub config: EngineRunConfig,
    pub last_hops: UpdateStore<RouterId>,
    pool: rayon::ThreadPool,
}

impl<'a> RefinementEngine<'a> {
    pub fn new(
        graph: &'a TopologyGraph,
        oracle: &'a dyn RelationshipOracle,
        orgs: &'a dyn OrgDirectory,
        config: EngineRunConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.thread_count())
            .build()?;
        Ok(RefinementEngine {
            graph,
            oracle,
            orgs,
            config,
            last_hops: UpdateStore::new(),
            pool,
        })
    }

    pub fn annotate_last_hops(&mut self) {
        let pb = self.progress_bar(0, "Last hops");
        annotate_last_hops(self.graph, self.oracle, self.orgs, &mut self.last_hops, &pb);
    }

    fn ensure_last_hops(&mut self) {
        if self.last_hops.generation() == 0 {
            self.annotate_last_hops();
        }
    }

    /// Whole-graph run: every router with successors and every interface
    /// with next-hop predecessors starts in the frontier.
    pub fn run(&mut self) -> RefinementResult {
        self.ensure_last_hops();
        let routers: BTreeSet<RouterId> =
            self.graph.routers_with_successors().iter().copied().collect();
        let interfaces: BTreeSet<InterfaceId> =
            self.graph.interfaces_with_next_hop_preds().iter().copied().collect();
        self.refine(UpdateStore::new(), UpdateStore::new(), routers, interfaces)
    }

    /// Incremental run that treats earlier results as defaults and only
    /// starts from the given nodes.
    pub fn run_with_defaults(
        &mut self,
        prior_routers: &UpdateStore<RouterId>,
        prior_interfaces: &UpdateStore<InterfaceId>,
        routers: &[RouterId],
        interfaces: &[InterfaceId],
    ) -> RefinementResult {
        self.ensure_last_hops();
        self.refine(
            UpdateStore::view(prior_routers),
            UpdateStore::view(prior_interfaces),
            routers.iter().copied().collect(),
            interfaces.iter().copied().collect(),
        )
    }

    pub fn context<'b>(
        &'b self,
        routers: &'b UpdateStore<RouterId>,
        interfaces: &'b UpdateStore<InterfaceId>,
    ) -> AnnotationContext<'b> {
        AnnotationContext {
            graph: self.graph,
            oracle: self.oracle,
            orgs: self.orgs,
            config: &self.config,
            last_hops: &self.last_hops,
            routers,
            interfaces,
        }
    }

    fn refine(
        &self,
        mut rstore: UpdateStore<RouterId>,
        mut istore: UpdateStore<InterfaceId>,
        mut rfrontier: BTreeSet<RouterId>,
        mut ifrontier: BTreeSet<InterfaceId>,
    ) -> RefinementResult {
        let mut history: VecDeque<Snapshot> = VecDeque::new();
        let mut iteration = 0usize;

        let termination = loop {
            if let Some(max_iterations) = self.config.max_iterations {
                if iteration >= max_iterations {
                    break Termination::IterationCap;
                }
            }
            info!(
                "Iteration {}: {} routers, {} interfaces queued",
                iteration,
                rfrontier.len(),
                ifrontier.len()
            );

            for (rid, asn, code) in self.annotate_routers(&rstore, &istore, &rfrontier) {
                rstore.add_update(rid, asn, self.orgs.org(asn), code);
            }
            let rchanged = rstore.advance();

            let mut next_routers = BTreeSet::new();
            self.router_changed(rstore.changes(), &mut next_routers, &mut ifrontier);

            for (iid, asn, code) in self.annotate_interfaces(&rstore, &istore, &ifrontier) {
                istore.add_update(iid, asn, self.orgs.org(asn), code);
            }
            let ichanged = istore.advance();
            self.interface_changed(istore.changes(), &mut next_routers);
            ifrontier.clear();
            iteration += 1;

            info!(
                "Iteration {}: {} routers changed, {} interfaces changed",
                iteration - 1,
                rchanged,
                ichanged
            );
            if rchanged == 0 && ichanged == 0 {
                break Termination::Converged;
            }

            let snapshot: Snapshot = (rstore.snapshot(), istore.snapshot());
            if history.iter().any(|(r, i)| **r == *snapshot.0 && **i == *snapshot.1) {
                warn!("Iteration {} repeated an earlier state, stopping", iteration - 1);
                break Termination::CycleDetected;
            }
            history.push_back(snapshot);
            if history.len() > self.config.history_limit {
                history.pop_front();
            }
            rfrontier = next_routers;
        };

        info!("Refinement finished after {} iterations: {}", iteration, termination);
        RefinementResult {
            routers: rstore,
            interfaces: istore,
            termination,
            iterations: iteration,
        }
    }

    fn annotate_routers(
        &self,
        rstore: &UpdateStore<RouterId>,
        istore: &UpdateStore<InterfaceId>,
        frontier: &BTreeSet<RouterId>,
    ) -> Vec<(RouterId, ASN, DecisionCode)> {
        let ctx = self.context(rstore, istore);
        let targets: Vec<RouterId> = frontier.iter().copied().collect();
        let pb = self.progress_bar(targets.len(), "Annotating routers");
        let results = self.pool.install(|| {
            targets
                .par_iter()
                .map(|&rid| {
                    let (asn, code) = annotate_router(&ctx, rid);
                    pb.inc(1);
                    (rid, asn, code)
                })
                .collect::<Vec<_>>()
        });
        pb.finish();
        results
    }

    fn annotate_interfaces(
        &self,
        rstore: &UpdateStore<RouterId>,
        istore: &UpdateStore<InterfaceId>,
        frontier: &BTreeSet<InterfaceId>,
    ) -> Vec<(InterfaceId, ASN, DecisionCode)> {
        let ctx = self.context(rstore, istore);
        let targets: Vec<InterfaceId> = frontier
            .iter()
            .copied()
            .filter(|iid| self.graph.interface(*iid).asn >= 0)
            .collect();
        let pb = self.progress_bar(targets.len(), "Adding links");
        let results = self.pool.install(|| {
            targets
                .par_iter()
                .map(|&iid| {
                    let (asn, code) = annotate_interface(&ctx, iid);
                    pb.inc(1);
                    (iid, asn, code)
                })
                .collect::<Vec<_>>()
        });
        pb.finish();
        results
    }

    /// Queue the next-hop successors of changed routers for the interface
    /// pass and the routers upstream of them for the next round.
    fn router_changed(
        &self,
        changes: &BTreeSet<RouterId>,
        routers: &mut BTreeSet<RouterId>,
        interfaces: &mut BTreeSet<InterfaceId>,
    ) {
        for &rid in changes {
            let router = self.graph.router(rid);
            for succ in router.best_successors() {
                if self.graph.interface(succ.interface).has_next_hop_preds() {
                    interfaces.insert(succ.interface);
                }
            }
            for iid in &router.interfaces {
                for pred in self.graph.interface(*iid).all_preds() {
                    routers.insert(self.graph.router_of(pred));
                }
            }
        }
    }

    fn interface_changed(&self, changes: &BTreeSet<InterfaceId>, routers: &mut BTreeSet<RouterId>) {
        for &iid in changes {
            for pred in self.graph.interface(iid).all_preds() {
                routers.insert(self.graph.router_of(pred));
            }
        }
    }

    fn progress_bar(&self, len: usize, message: &'static str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let template = "[{elapsed_precise}] {bar:40} {pos}/{len} {msg}";
        match ProgressStyle::default_bar().template(template) {
            Ok(style) => pb.set_style(style.progress_chars("##-")),
            Err(e) => warn!("Invalid progress bar template: {}", e),
        }
        pb.set_message(message);
        pb
    }
}
