use crate::walker::EntityKey;
use fnv::FnvHashMap;

/// Maps each entity to the watched queries that read it, in registration order.
///
/// The same query may be listed more than once for an entity if it registered more than once
/// before being woken. Waking is deduplicated per response, so this is harmless.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyIndex {
    entries: FnvHashMap<EntityKey, Vec<u64>>
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entity: EntityKey, query_key: u64) {
        self.entries.entry(entity).or_default().push(query_key);
    }

    pub fn lookup(&self, entity: &EntityKey) -> &[u64] {
        self.entries
            .get(entity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn remove(&mut self, entity: &EntityKey) -> Option<Vec<u64>> {
        self.entries.remove(entity)
    }

    /// Keeps only the queries of `entity` matching `keep`. The entry is dropped once empty.
    pub fn retain<F: FnMut(u64) -> bool>(&mut self, entity: &EntityKey, mut keep: F) {
        let now_empty = match self.entries.get_mut(entity) {
            Some(queries) => {
                queries.retain(|query_key| keep(*query_key));
                queries.is_empty()
            }
            None => false
        };
        if now_empty {
            self.entries.remove(entity);
        }
    }

    /// Forgets a query everywhere it's listed.
    pub fn remove_query(&mut self, query_key: u64) {
        self.entries.retain(|_, queries| {
            queries.retain(|key| *key != query_key);
            !queries.is_empty()
        });
    }

    pub fn contains(&self, entity: &EntityKey) -> bool {
        self.entries.contains_key(entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &[u64])> {
        self.entries
            .iter()
            .map(|(entity, queries)| (entity, queries.as_slice()))
    }
}
