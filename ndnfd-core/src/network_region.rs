//! NetworkRegionTable and NetworkPredicate (§2, component I): small helpers
//! used by pipelines to decide whether this node considers itself inside a
//! forwarding-hint's named region.

use ndnfd_common::name::Name;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct NetworkRegionTable {
    regions: HashSet<Name>,
}

impl NetworkRegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names(names: impl IntoIterator<Item = Name>) -> Self {
        Self { regions: names.into_iter().collect() }
    }

    pub fn insert(&mut self, name: Name) {
        self.regions.insert(name);
    }

    pub fn remove(&mut self, name: &Name) {
        self.regions.remove(name);
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.regions.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// A predicate over names, used to gate forwarding-hint admission: "is this
/// node inside any of the regions a forwarding hint names?"
pub struct NetworkPredicate<'a> {
    table: &'a NetworkRegionTable,
}

impl<'a> NetworkPredicate<'a> {
    pub fn new(table: &'a NetworkRegionTable) -> Self {
        Self { table }
    }

    /// True if this node is in the region named by `forwarding_hint`, or
    /// any of its ancestors (a hint names the region, not a specific node).
    pub fn admits(&self, forwarding_hint: &Name) -> bool {
        if self.table.is_empty() {
            return true;
        }
        for len in (0..=forwarding_hint.len()).rev() {
            if self.table.contains(&forwarding_hint.prefix(len)) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_admits_everything() {
        let table = NetworkRegionTable::new();
        let predicate = NetworkPredicate::new(&table);
        assert!(predicate.admits(&Name::from_str("/some/hint")));
    }

    #[test]
    fn admits_only_matching_region() {
        let table = NetworkRegionTable::from_names([Name::from_str("/region/a")]);
        let predicate = NetworkPredicate::new(&table);
        assert!(predicate.admits(&Name::from_str("/region/a")));
        assert!(!predicate.admits(&Name::from_str("/region/b")));
    }
}
