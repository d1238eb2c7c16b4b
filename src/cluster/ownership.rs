use super::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static filename → primary node assignment.
///
/// Unlike a hash ring, the assignment is an explicit table: a filename that is
/// not listed has no primary and cannot be read through or written to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct OwnershipMap {
    primaries: BTreeMap<String, NodeId>,
}

impl OwnershipMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, filename: impl Into<String>, primary: NodeId) {
        self.primaries.insert(filename.into(), primary);
    }

    pub fn with(mut self, filename: impl Into<String>, primary: impl Into<NodeId>) -> Self {
        self.assign(filename, primary.into());
        self
    }

    pub fn primary_of(&self, filename: &str) -> Option<&NodeId> {
        self.primaries.get(filename)
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.primaries.keys().map(String::as_str)
    }

    pub fn files_owned_by<'a>(&'a self, node: &'a NodeId) -> impl Iterator<Item = &'a str> {
        self.primaries
            .iter()
            .filter(move |(_, owner)| *owner == node)
            .map(|(filename, _)| filename.as_str())
    }
}
