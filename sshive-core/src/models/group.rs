//! Group paths and the group tree used for hierarchical organisation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::Connection;

/// Ordered group-name segments, e.g. `["Work", "Production"]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupPath(Vec<String>);

impl GroupPath {
    /// Creates a group path from segments, dropping blank ones
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            segments
                .into_iter()
                .map(Into::into)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    /// Parses a `/`-separated path such as `Work/Production`
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self::new(path.split('/'))
    }

    /// Returns the path segments
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns true for ungrouped connections
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of segments
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Display for GroupPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// A node in the group tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupNode {
    /// Segment name (empty for the root)
    pub name: String,
    /// Child groups, ordered by name
    pub children: BTreeMap<String, GroupNode>,
    /// Connections directly in this group, in catalog order
    pub connections: Vec<Uuid>,
}

impl GroupNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Total number of connections in this group and all subgroups
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
            + self
                .children
                .values()
                .map(Self::connection_count)
                .sum::<usize>()
    }
}

/// Tree of groups derived from the connections' group paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTree {
    root: GroupNode,
}

impl GroupTree {
    /// Builds the tree from a connection catalog
    #[must_use]
    pub fn from_connections(connections: &[Connection]) -> Self {
        let mut root = GroupNode::default();
        for connection in connections {
            let mut node = &mut root;
            for segment in connection.group_path.segments() {
                node = node
                    .children
                    .entry(segment.clone())
                    .or_insert_with(|| GroupNode::named(segment));
            }
            node.connections.push(connection.id);
        }
        Self { root }
    }

    /// Returns the root node (ungrouped connections live here)
    #[must_use]
    pub const fn root(&self) -> &GroupNode {
        &self.root
    }

    /// Finds the node for a group path
    #[must_use]
    pub fn find(&self, path: &GroupPath) -> Option<&GroupNode> {
        path.segments()
            .iter()
            .try_fold(&self.root, |node, segment| node.children.get(segment))
    }
}
