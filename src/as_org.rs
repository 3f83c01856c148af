use std::collections::HashMap;

use crate::shared::{OrgId, ASN};

/// Maps an AS to the organization that operates it.
pub trait OrgDirectory: Send + Sync {
    fn org(&self, asn: ASN) -> OrgId;
}

/// In-memory AS to organization table.
///
/// ASes that are missing from the table get the synthesized id `"<asn>"`.
/// Real ids that would read as a bare number are stored with an `org:`
/// prefix, so a synthesized id never matches a real organization.
#[derive(Debug, Clone, Default)]
pub struct AsOrgMap {
    orgs: HashMap<ASN, OrgId>,
    names: HashMap<OrgId, String>,
}

impl AsOrgMap {
    pub fn new() -> Self {
        AsOrgMap {
            orgs: HashMap::new(),
            names: HashMap::new(),
        }
    }

    pub fn with_org(mut self, asn: ASN, org: &str) -> Self {
        self.insert(asn, org);
        self
    }

    pub fn insert(&mut self, asn: ASN, org: &str) {
        self.orgs.insert(asn, normalize_org(org));
    }

    pub fn insert_name(&mut self, org: &str, name: &str) {
        self.names.insert(normalize_org(org), name.to_string());
    }

    pub fn name(&self, org: &str) -> Option<&str> {
        self.names.get(org).map(String::as_str)
    }

    pub fn get(&self, asn: &ASN) -> Option<&OrgId> {
        self.orgs.get(asn)
    }

    pub fn len(&self) -> usize {
        self.orgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orgs.is_empty()
    }
}

/// Real organization id as stored. Ids that read as a bare number get an
/// `org:` prefix so they stay apart from synthesized per-AS ids.
pub fn normalize_org(org: &str) -> OrgId {
    if org.parse::<i64>().is_ok() {
        format!("org:{}", org)
    } else {
        org.to_string()
    }
}

impl OrgDirectory for AsOrgMap {
    fn org(&self, asn: ASN) -> OrgId {
        match self.orgs.get(&asn) {
            Some(org) => org.clone(),
            None => asn.to_string(),
        }
    }
}
