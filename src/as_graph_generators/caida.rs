use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::as_graph::{ASGraph, ASN};
use crate::as_org::AsOrgMap;
use crate::shared::LoadError;

use super::{open_input, ASGraphGenerator};

/// Reads CAIDA `as-rel` relationships and, optionally, `ppdc-ases` cones.
///
/// Without a cone file the cones are derived from the customer edges.
pub struct CAIDAASGraphReader {
    rel_path: PathBuf,
    cone_path: Option<PathBuf>,
}

impl CAIDAASGraphReader {
    pub fn new(rel_path: &Path) -> Self {
        CAIDAASGraphReader {
            rel_path: rel_path.to_path_buf(),
            cone_path: None,
        }
    }

    pub fn with_cone_file(mut self, cone_path: &Path) -> Self {
        self.cone_path = Some(cone_path.to_path_buf());
        self
    }

    pub fn read(&self) -> Result<ASGraph, LoadError> {
        let mut as_graph = ASGraph::new();
        let path = self.rel_path.display().to_string();
        let reader = open_input(&self.rel_path)?;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| LoadError::Io { path: path.clone(), source })?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split('|').collect();
            if parts.len() < 3 {
                return Err(malformed(&path, lineno, "expected asn|asn|relationship"));
            }
            let asn1 = parse_asn(parts[0], &path, lineno)?;
            let asn2 = parse_asn(parts[1], &path, lineno)?;

            match parts[2].trim() {
                // asn1 is the provider of asn2
                "-1" => as_graph.add_provider_customer(asn1, asn2),
                "0" => as_graph.add_peers(asn1, asn2),
                other => warn!("{}:{}: unknown relationship type {}", path, lineno + 1, other),
            }
        }

        match &self.cone_path {
            Some(cone_path) => self.read_cones(cone_path, &mut as_graph)?,
            None => as_graph.add_customer_cones(),
        }

        info!("Loaded {} ASes from {}", as_graph.len(), path);
        Ok(as_graph)
    }

    fn read_cones(&self, cone_path: &Path, as_graph: &mut ASGraph) -> Result<(), LoadError> {
        let path = cone_path.display().to_string();
        let reader = open_input(cone_path)?;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| LoadError::Io { path: path.clone(), source })?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let provider = match fields.next() {
                Some(field) => parse_asn(field, &path, lineno)?,
                None => continue,
            };
            let cone = fields
                .map(|field| parse_asn(field, &path, lineno))
                .collect::<Result<HashSet<ASN>, LoadError>>()?;
            as_graph.set_customer_cone(provider, cone);
        }
        Ok(())
    }
}

impl ASGraphGenerator for CAIDAASGraphReader {
    fn generate(&self) -> Result<ASGraph, LoadError> {
        self.read()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrgSection {
    None,
    Orgs,
    Auts,
}

/// Reads a CAIDA `as-org2info` file into an [`AsOrgMap`].
pub struct CAIDAOrgReader {
    path: PathBuf,
}

impl CAIDAOrgReader {
    pub fn new(path: &Path) -> Self {
        CAIDAOrgReader {
            path: path.to_path_buf(),
        }
    }

    pub fn read(&self) -> Result<AsOrgMap, LoadError> {
        let path = self.path.display().to_string();
        let reader = open_input(&self.path)?;
        let mut orgs = AsOrgMap::new();
        let mut section = OrgSection::None;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| LoadError::Io { path: path.clone(), source })?;
            if let Some(format) = line.strip_prefix("# format:") {
                section = if format.starts_with("aut|") {
                    OrgSection::Auts
                } else if format.starts_with("org_id|") {
                    OrgSection::Orgs
                } else {
                    OrgSection::None
                };
                continue;
            }
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.split('|').collect();
            match section {
                OrgSection::Orgs if parts.len() >= 3 => orgs.insert_name(parts[0], parts[2]),
                OrgSection::Auts if parts.len() >= 4 => {
                    let asn = parse_asn(parts[0], &path, lineno)?;
                    orgs.insert(asn, parts[3]);
                }
                OrgSection::None => {}
                _ => return Err(malformed(&path, lineno, "too few fields")),
            }
        }

        info!("Loaded organizations for {} ASes from {}", orgs.len(), path);
        Ok(orgs)
    }
}

fn parse_asn(field: &str, path: &str, lineno: usize) -> Result<ASN, LoadError> {
    field
        .trim()
        .parse::<ASN>()
        .map_err(|e| malformed(path, lineno, &format!("bad AS number {:?}: {}", field, e)))
}

fn malformed(path: &str, lineno: usize, reason: &str) -> LoadError {
    LoadError::Malformed {
        path: path.to_string(),
        line: lineno + 1,
        reason: reason.to_string(),
    }
}
