use super::updates::{Annotation, UpdateStore};
use crate::as_graph::RelationshipOracle;
use crate::as_org::OrgDirectory;
use crate::engine_runner::EngineRunConfig;
use crate::shared::{OrgId, ASN, UNKNOWN_ASN};
use crate::topology::{InterfaceId, RouterId, TopologyGraph};

/// Everything one annotation call may read. Built once per pass over the
/// committed generation, never mutated while the pass runs.
#[derive(Clone, Copy)]
pub struct AnnotationContext<'a> {
    pub graph: &'a TopologyGraph,
    pub oracle: &'a dyn RelationshipOracle,
    pub orgs: &'a dyn OrgDirectory,
    pub config: &'a EngineRunConfig,
    pub last_hops: &'a UpdateStore<RouterId>,
    pub routers: &'a UpdateStore<RouterId>,
    pub interfaces: &'a UpdateStore<InterfaceId>,
}

/// Best-known annotation of a router: the last-hop result when it names an
/// AS, the refinement result otherwise.
pub fn resolve_router<'a>(
    last_hops: &'a UpdateStore<RouterId>,
    routers: &'a UpdateStore<RouterId>,
    router: RouterId,
) -> &'a Annotation {
    let last_hop = last_hops.get(router);
    if last_hop.asn != UNKNOWN_ASN {
        return last_hop;
    }
    routers.get(router)
}

impl<'a> AnnotationContext<'a> {
    pub fn router_annotation(&self, router: RouterId) -> &'a Annotation {
        resolve_router(self.last_hops, self.routers, router)
    }

    pub fn router_asn(&self, router: RouterId) -> ASN {
        self.router_annotation(router).asn
    }

    pub fn interface_annotation(&self, interface: InterfaceId) -> &'a Annotation {
        self.interfaces.get(interface)
    }

    pub fn org(&self, asn: ASN) -> OrgId {
        self.orgs.org(asn)
    }
}
