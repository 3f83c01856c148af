use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::mem;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::code::DecisionCode;
use crate::shared::{OrgId, ASN, UNKNOWN_ASN};

lazy_static::lazy_static! {
    static ref UNKNOWN: Annotation = Annotation {
        asn: UNKNOWN_ASN,
        org: UNKNOWN_ASN.to_string(),
        code: DecisionCode::UNKNOWN,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub asn: ASN,
    pub org: OrgId,
    pub code: DecisionCode,
}

impl Annotation {
    pub fn unknown() -> &'static Annotation {
        &*UNKNOWN
    }
}

/// Versioned node -> annotation mapping.
///
/// Reads go to the committed generation, then to any frozen default layers,
/// then to the unknown sentinel. Writes are staged and only become visible
/// after [`UpdateStore::advance`]. Committed maps are shared `Arc`s, so a
/// snapshot costs a reference count and the next advance copies on write.
#[derive(Debug, Clone)]
pub struct UpdateStore<K> {
    defaults: Vec<Arc<HashMap<K, Annotation>>>,
    committed: Arc<HashMap<K, Annotation>>,
    staged: HashMap<K, Annotation>,
    changes: BTreeSet<K>,
    generation: usize,
}

impl<K> UpdateStore<K>
where
    K: Copy + Eq + Hash + Ord,
{
    pub fn new() -> Self {
        UpdateStore {
            defaults: Vec::new(),
            committed: Arc::new(HashMap::new()),
            staged: HashMap::new(),
            changes: BTreeSet::new(),
            generation: 0,
        }
    }

    /// Overlay on top of `base`'s committed state. The base is shared, not
    /// copied, and later changes to `base` are not observed.
    pub fn view(base: &UpdateStore<K>) -> Self {
        let mut defaults = Vec::with_capacity(base.defaults.len() + 1);
        defaults.push(Arc::clone(&base.committed));
        defaults.extend(base.defaults.iter().cloned());
        UpdateStore {
            defaults,
            ..Self::new()
        }
    }

    pub fn get(&self, key: K) -> &Annotation {
        if let Some(annotation) = self.committed.get(&key) {
            return annotation;
        }
        self.defaults
            .iter()
            .find_map(|layer| layer.get(&key))
            .unwrap_or(&*UNKNOWN)
    }

    pub fn contains(&self, key: K) -> bool {
        self.committed.contains_key(&key)
            || self.defaults.iter().any(|layer| layer.contains_key(&key))
    }

    pub fn add_update(&mut self, key: K, asn: ASN, org: OrgId, code: DecisionCode) {
        self.staged.insert(key, Annotation { asn, org, code });
    }

    /// Commit staged values and record which nodes changed. Returns the
    /// number of changed nodes.
    pub fn advance(&mut self) -> usize {
        self.changes.clear();
        self.generation += 1;
        if self.staged.is_empty() {
            return 0;
        }

        let staged = mem::take(&mut self.staged);
        for (key, annotation) in &staged {
            if self.get(*key) != annotation {
                self.changes.insert(*key);
            }
        }

        let committed = Arc::make_mut(&mut self.committed);
        for (key, annotation) in staged {
            committed.insert(key, annotation);
        }
        self.changes.len()
    }

    /// Nodes whose value changed in the latest advance.
    pub fn changes(&self) -> &BTreeSet<K> {
        &self.changes
    }

    pub fn snapshot(&self) -> Arc<HashMap<K, Annotation>> {
        Arc::clone(&self.committed)
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Every visible annotation in key order, overlay values shadowing
    /// defaults.
    pub fn iter(&self) -> impl Iterator<Item = (K, &Annotation)> {
        let mut merged: BTreeMap<K, &Annotation> = BTreeMap::new();
        for layer in self.defaults.iter().rev() {
            for (key, annotation) in layer.iter() {
                merged.insert(*key, annotation);
            }
        }
        for (key, annotation) in self.committed.iter() {
            merged.insert(*key, annotation);
        }
        merged.into_iter()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty() && self.defaults.iter().all(|layer| layer.is_empty())
    }
}

impl<K> Default for UpdateStore<K>
where
    K: Copy + Eq + Hash + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}
