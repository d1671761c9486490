// 🌳 Hierarchy Builder - Account tree with roll-up aggregation
//
// "Account name is a VALUE (can change), account UUID is IDENTITY (never changes)"
//
// Problem solved:
// - Multi-level account rollups: "US Public Sector" → "US Federal Government"
//   → "Department of Defense" → "United States Navy"
// - Classified records attach to leaves and aggregate at any level
// - Renaming doesn't break record attachments
//
// Invariants enforced here:
// - Every node except the root has exactly one existing parent
// - reparent() refuses moves that would create a cycle
// - Sibling canonical names stay unique (same name merges, not duplicates)

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::normalizer::Normalizer;
use crate::parser::RawRecord;

/// Display name of the tree root
pub const ROOT_NAME: &str = "All Accounts";

/// Display name of the bucket that collects unmatched customers
pub const UNCLASSIFIED_NAME: &str = "Unclassified";

// ============================================================================
// ACCOUNT NODE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountNode {
    /// Stable identity (UUID) - never changes
    pub id: String,

    /// Display name (e.g. "United States Navy")
    pub name: String,

    /// Normalizer output for `name`, kept in sync on rename
    pub canonical_name: String,

    /// Parent node UUID. None only for the root.
    pub parent_id: Option<String>,

    /// Records attached directly to this node (not descendants)
    pub record_count: u64,

    /// Revenue attached directly to this node (not descendants)
    pub total_revenue: f64,

    pub created_at: DateTime<Utc>,

    /// Extensible metadata
    pub metadata: serde_json::Value,
}

impl AccountNode {
    pub fn new(name: String, canonical_name: String, parent_id: Option<String>) -> Self {
        AccountNode {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            canonical_name,
            parent_id,
            record_count: 0,
            total_revenue: 0.0,
            created_at: Utc::now(),
            metadata: serde_json::json!({}),
        }
    }

    /// Check if this is the root (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// ============================================================================
// ACCOUNT TREE
// ============================================================================

/// The account hierarchy. Always has a root and an "Unclassified" bucket
/// under it; everything else hangs off those.
pub struct AccountTree {
    nodes: HashMap<String, AccountNode>,
    root_id: String,
    unclassified_id: String,
    normalizer: Normalizer,
}

impl AccountTree {
    /// Create a tree containing only the root and the Unclassified bucket
    pub fn new() -> Self {
        let normalizer = Normalizer::new();

        let root = AccountNode::new(
            ROOT_NAME.to_string(),
            normalizer.canonical(ROOT_NAME).unwrap_or_default(),
            None,
        );
        let root_id = root.id.clone();

        let unclassified = AccountNode::new(
            UNCLASSIFIED_NAME.to_string(),
            normalizer.canonical(UNCLASSIFIED_NAME).unwrap_or_default(),
            Some(root_id.clone()),
        );
        let unclassified_id = unclassified.id.clone();

        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), root);
        nodes.insert(unclassified_id.clone(), unclassified);

        AccountTree {
            nodes,
            root_id,
            unclassified_id,
            normalizer,
        }
    }

    /// Rebuild a tree from stored nodes, validating the parent invariant.
    /// Expects exactly one root and an Unclassified bucket under it.
    pub fn from_nodes(stored: Vec<AccountNode>) -> Result<Self> {
        let mut nodes = HashMap::new();
        let mut root_id: Option<String> = None;

        for node in stored {
            if node.parent_id.is_none() {
                if let Some(existing) = &root_id {
                    return Err(anyhow!(
                        "Tree has two roots: {} and {}",
                        existing,
                        node.id
                    ));
                }
                root_id = Some(node.id.clone());
            }
            nodes.insert(node.id.clone(), node);
        }

        let root_id = root_id.ok_or_else(|| anyhow!("Tree has no root node"))?;

        // Every parent reference must resolve, and walking up from any
        // node must reach the root without looping
        for node in nodes.values() {
            let mut current = node;
            let mut steps = 0;
            while let Some(parent_id) = &current.parent_id {
                current = nodes
                    .get(parent_id)
                    .ok_or_else(|| anyhow!("Node {} references missing parent {}", node.id, parent_id))?;
                steps += 1;
                if steps > nodes.len() {
                    return Err(anyhow!("Cycle detected at node {}", node.id));
                }
            }
        }

        let normalizer = Normalizer::new();
        let unclassified_key = normalizer
            .canonical(UNCLASSIFIED_NAME)
            .unwrap_or_default();
        let unclassified_id = nodes
            .values()
            .find(|n| {
                n.parent_id.as_deref() == Some(root_id.as_str())
                    && n.canonical_name == unclassified_key
            })
            .map(|n| n.id.clone())
            .ok_or_else(|| anyhow!("Tree has no Unclassified bucket under the root"))?;

        Ok(AccountTree {
            nodes,
            root_id,
            unclassified_id,
            normalizer,
        })
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn unclassified_id(&self) -> &str {
        &self.unclassified_id
    }

    /// Total node count, root and bucket included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AccountNode> {
        self.nodes.get(id)
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Add a child under `parent_id`. If a sibling with the same canonical
    /// name already exists, returns that node's id instead of duplicating.
    pub fn add_child(&mut self, parent_id: &str, name: &str) -> Result<String> {
        if !self.nodes.contains_key(parent_id) {
            return Err(anyhow!("Parent node not found: {}", parent_id));
        }

        let canonical = self
            .normalizer
            .canonical(name)
            .ok_or_else(|| anyhow!("Name too short to form an account key: {:?}", name))?;

        if let Some(existing) = self.child_by_canonical(parent_id, &canonical) {
            return Ok(existing);
        }

        let node = AccountNode::new(
            name.trim().to_string(),
            canonical,
            Some(parent_id.to_string()),
        );
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        Ok(id)
    }

    /// Walk or create a chain of nodes below the root.
    /// ensure_path(&["US Public Sector", "US Federal Government"]) returns
    /// the id of the last segment, creating what is missing along the way.
    pub fn ensure_path(&mut self, segments: &[&str]) -> Result<String> {
        let mut current = self.root_id.clone();
        for segment in segments {
            current = self.add_child(&current, segment)?;
        }
        Ok(current)
    }

    /// Merge a classified record into a node: bump its direct count and
    /// revenue aggregate
    pub fn attach_record(&mut self, node_id: &str, record: &RawRecord) -> Result<()> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| anyhow!("Account node not found: {}", node_id))?;
        node.record_count += 1;
        node.total_revenue += record.revenue.unwrap_or(0.0);
        Ok(())
    }

    /// Move a node under a new parent. Refuses the root, unknown ids,
    /// moves that would create a cycle, and sibling name collisions.
    pub fn reparent(&mut self, node_id: &str, new_parent_id: &str) -> Result<()> {
        if node_id == self.root_id {
            return Err(anyhow!("Cannot reparent the root node"));
        }
        if !self.nodes.contains_key(node_id) {
            return Err(anyhow!("Account node not found: {}", node_id));
        }
        if !self.nodes.contains_key(new_parent_id) {
            return Err(anyhow!("Parent node not found: {}", new_parent_id));
        }
        // Moving a node under its own descendant (or itself) would loop
        if self.is_ancestor(node_id, new_parent_id) {
            return Err(anyhow!(
                "Cannot reparent {} under its own descendant {}",
                node_id,
                new_parent_id
            ));
        }

        let canonical = self.nodes[node_id].canonical_name.clone();
        if let Some(existing) = self.child_by_canonical(new_parent_id, &canonical) {
            if existing != node_id {
                return Err(anyhow!(
                    "Parent already has a child named {:?}",
                    self.nodes[node_id].name
                ));
            }
        }

        if let Some(node) = self.nodes.get_mut(node_id) {
            node.parent_id = Some(new_parent_id.to_string());
        }
        Ok(())
    }

    /// Rename a node, keeping its canonical key in sync
    pub fn rename(&mut self, node_id: &str, new_name: &str) -> Result<()> {
        if !self.nodes.contains_key(node_id) {
            return Err(anyhow!("Account node not found: {}", node_id));
        }

        let canonical = self
            .normalizer
            .canonical(new_name)
            .ok_or_else(|| anyhow!("Name too short to form an account key: {:?}", new_name))?;

        // No sibling may already carry the new canonical name
        if let Some(parent_id) = self.nodes[node_id].parent_id.clone() {
            if let Some(existing) = self.child_by_canonical(&parent_id, &canonical) {
                if existing != node_id {
                    return Err(anyhow!("Sibling already named {:?}", new_name));
                }
            }
        }

        if let Some(node) = self.nodes.get_mut(node_id) {
            node.name = new_name.trim().to_string();
            node.canonical_name = canonical;
        }
        Ok(())
    }

    /// Remove a leaf node. The root and the Unclassified bucket stay.
    pub fn remove_leaf(&mut self, node_id: &str) -> Result<AccountNode> {
        if node_id == self.root_id {
            return Err(anyhow!("Cannot remove the root node"));
        }
        if node_id == self.unclassified_id {
            return Err(anyhow!("Cannot remove the Unclassified bucket"));
        }
        if !self.nodes.contains_key(node_id) {
            return Err(anyhow!("Account node not found: {}", node_id));
        }
        if !self.children(node_id).is_empty() {
            return Err(anyhow!("Node {} still has children", node_id));
        }

        self.nodes
            .remove(node_id)
            .ok_or_else(|| anyhow!("Account node not found: {}", node_id))
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Find node by display name (exact match, case-insensitive).
    /// Names are only unique among siblings; when the same name exists in
    /// more than one subtree, the node whose path sorts first wins.
    pub fn find_by_name(&self, name: &str) -> Option<AccountNode> {
        let lower_name = name.to_lowercase();
        self.all_nodes()
            .into_iter()
            .find(|n| n.name.to_lowercase() == lower_name)
    }

    /// Find node by canonical key (exact match), first in path order
    pub fn find_by_canonical(&self, canonical: &str) -> Option<AccountNode> {
        self.all_nodes()
            .into_iter()
            .find(|n| n.canonical_name == canonical)
    }

    /// Children of a node, sorted by display name for stable output
    pub fn children(&self, parent_id: &str) -> Vec<AccountNode> {
        let mut children: Vec<AccountNode> = self
            .nodes
            .values()
            .filter(|n| n.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    pub fn parent(&self, node: &AccountNode) -> Option<AccountNode> {
        node.parent_id
            .as_ref()
            .and_then(|parent_id| self.nodes.get(parent_id))
            .cloned()
    }

    /// Full path of a node (root → ... → node)
    ///
    /// Example: ["All Accounts", "US Public Sector", "US Federal Government"]
    pub fn path(&self, node: &AccountNode) -> Vec<String> {
        let mut path = vec![node.name.clone()];
        let mut current = node.clone();

        while let Some(parent) = self.parent(&current) {
            path.insert(0, parent.name.clone());
            current = parent;
        }

        path
    }

    /// Full path as string (root → ... → node)
    pub fn path_string(&self, node: &AccountNode) -> String {
        self.path(node).join(" → ")
    }

    /// Check if one node is an ancestor of another. A node counts as its
    /// own ancestor.
    pub fn is_ancestor(&self, ancestor_id: &str, descendant_id: &str) -> bool {
        if ancestor_id == descendant_id {
            return true;
        }

        let Some(descendant) = self.nodes.get(descendant_id) else {
            return false;
        };

        let Some(parent_id) = &descendant.parent_id else {
            return false;
        };

        if parent_id == ancestor_id {
            return true;
        }

        self.is_ancestor(ancestor_id, parent_id)
    }

    /// All descendants of a node (recursive)
    pub fn descendants(&self, node_id: &str) -> Vec<AccountNode> {
        let mut descendants = Vec::new();
        for child in self.children(node_id) {
            let child_id = child.id.clone();
            descendants.push(child);
            descendants.extend(self.descendants(&child_id));
        }
        descendants
    }

    /// Distance from the root (root itself is 0)
    pub fn depth(&self, node: &AccountNode) -> usize {
        let mut depth = 0;
        let mut current = node.clone();

        while let Some(parent) = self.parent(&current) {
            depth += 1;
            current = parent;
        }

        depth
    }

    /// All nodes, sorted by their path strings (parents before children)
    pub fn all_nodes(&self) -> Vec<AccountNode> {
        let mut nodes: Vec<AccountNode> = self.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| self.path(n).join("\u{1}"));
        nodes
    }

    // ========================================================================
    // ROLL-UPS
    // ========================================================================

    /// Revenue of a node plus all of its descendants
    pub fn rolled_up_revenue(&self, node_id: &str) -> f64 {
        let own = self
            .nodes
            .get(node_id)
            .map(|n| n.total_revenue)
            .unwrap_or(0.0);
        own + self
            .descendants(node_id)
            .iter()
            .map(|n| n.total_revenue)
            .sum::<f64>()
    }

    /// Record count of a node plus all of its descendants
    pub fn rolled_up_records(&self, node_id: &str) -> u64 {
        let own = self
            .nodes
            .get(node_id)
            .map(|n| n.record_count)
            .unwrap_or(0);
        own + self
            .descendants(node_id)
            .iter()
            .map(|n| n.record_count)
            .sum::<u64>()
    }

    fn child_by_canonical(&self, parent_id: &str, canonical: &str) -> Option<String> {
        self.nodes
            .values()
            .find(|n| {
                n.parent_id.as_deref() == Some(parent_id) && n.canonical_name == canonical
            })
            .map(|n| n.id.clone())
    }
}

impl Default for AccountTree {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceType;

    fn record_with_revenue(name: &str, revenue: f64) -> RawRecord {
        RawRecord::new(
            name.to_string(),
            SourceType::CsvExport,
            "test.csv".to_string(),
            2,
            format!("{},,,{},", name, revenue),
        )
        .with_revenue(revenue)
    }

    #[test]
    fn test_new_tree_has_root_and_unclassified() {
        let tree = AccountTree::new();

        assert_eq!(tree.len(), 2);
        let root = tree.get(tree.root_id()).unwrap();
        assert!(root.is_root());
        assert_eq!(root.name, ROOT_NAME);

        let bucket = tree.get(tree.unclassified_id()).unwrap();
        assert_eq!(bucket.parent_id.as_deref(), Some(tree.root_id()));
        assert_eq!(bucket.name, UNCLASSIFIED_NAME);
    }

    #[test]
    fn test_add_child() {
        let mut tree = AccountTree::new();
        let root = tree.root_id().to_string();

        let id = tree.add_child(&root, "US Public Sector").unwrap();
        let node = tree.get(&id).unwrap();

        assert_eq!(node.name, "US Public Sector");
        assert_eq!(node.canonical_name, "us public sector");
        assert_eq!(node.parent_id.as_deref(), Some(root.as_str()));
    }

    #[test]
    fn test_add_child_unknown_parent_fails() {
        let mut tree = AccountTree::new();
        let result = tree.add_child("no-such-id", "Anything");
        assert!(result.is_err());
    }

    #[test]
    fn test_add_child_merges_same_canonical_sibling() {
        let mut tree = AccountTree::new();
        let root = tree.root_id().to_string();

        let first = tree.add_child(&root, "Lockheed Martin Corporation").unwrap();
        // Same canonical key after suffix stripping
        let second = tree.add_child(&root, "Lockheed Martin Corp.").unwrap();

        assert_eq!(first, second);
        assert_eq!(tree.len(), 3); // root + unclassified + one node
    }

    #[test]
    fn test_ensure_path_builds_chain() {
        let mut tree = AccountTree::new();

        let navy = tree
            .ensure_path(&[
                "US Public Sector",
                "US Federal Government",
                "Department of Defense",
                "United States Navy",
            ])
            .unwrap();

        let node = tree.get(&navy).unwrap();
        assert_eq!(node.name, "United States Navy");
        assert_eq!(tree.depth(node), 4);
        assert_eq!(
            tree.path_string(node),
            "All Accounts → US Public Sector → US Federal Government → Department of Defense → United States Navy"
        );

        // Repeating the walk creates nothing new
        let again = tree
            .ensure_path(&[
                "US Public Sector",
                "US Federal Government",
                "Department of Defense",
                "United States Navy",
            ])
            .unwrap();
        assert_eq!(navy, again);
    }

    #[test]
    fn test_attach_record_aggregates() {
        let mut tree = AccountTree::new();
        let root = tree.root_id().to_string();
        let navy = tree.add_child(&root, "United States Navy").unwrap();

        tree.attach_record(&navy, &record_with_revenue("US Navy", 1000.0))
            .unwrap();
        tree.attach_record(&navy, &record_with_revenue("USN", 500.0))
            .unwrap();

        let node = tree.get(&navy).unwrap();
        assert_eq!(node.record_count, 2);
        assert_eq!(node.total_revenue, 1500.0);
    }

    #[test]
    fn test_attach_record_unknown_node_fails() {
        let mut tree = AccountTree::new();
        let result = tree.attach_record("no-such-id", &record_with_revenue("X Co", 1.0));
        assert!(result.is_err());
    }

    #[test]
    fn test_rolled_up_aggregates() {
        let mut tree = AccountTree::new();
        let dod = tree
            .ensure_path(&["US Public Sector", "Department of Defense"])
            .unwrap();
        let navy = tree.add_child(&dod, "United States Navy").unwrap();
        let usaf = tree.add_child(&dod, "United States Air Force").unwrap();

        tree.attach_record(&navy, &record_with_revenue("USN", 1000.0))
            .unwrap();
        tree.attach_record(&usaf, &record_with_revenue("USAF", 2000.0))
            .unwrap();

        assert_eq!(tree.rolled_up_revenue(&dod), 3000.0);
        assert_eq!(tree.rolled_up_records(&dod), 2);
        assert_eq!(tree.rolled_up_revenue(&navy), 1000.0);
        // Root sees everything
        assert_eq!(tree.rolled_up_revenue(tree.root_id()), 3000.0);
        assert_eq!(tree.rolled_up_records(tree.root_id()), 2);
    }

    #[test]
    fn test_is_ancestor() {
        let mut tree = AccountTree::new();
        let sector = tree.ensure_path(&["US Public Sector"]).unwrap();
        let navy = tree
            .ensure_path(&["US Public Sector", "Department of Defense", "United States Navy"])
            .unwrap();

        assert!(tree.is_ancestor(&sector, &navy));
        assert!(!tree.is_ancestor(&navy, &sector));
        assert!(tree.is_ancestor(&navy, &navy));
        assert!(tree.is_ancestor(tree.root_id(), &navy));
    }

    #[test]
    fn test_descendants() {
        let mut tree = AccountTree::new();
        let dod = tree
            .ensure_path(&["US Public Sector", "Department of Defense"])
            .unwrap();
        tree.add_child(&dod, "United States Navy").unwrap();
        tree.add_child(&dod, "United States Air Force").unwrap();

        let sector = tree.find_by_name("US Public Sector").unwrap();
        let descendants = tree.descendants(&sector.id);
        let names: Vec<String> = descendants.iter().map(|n| n.name.clone()).collect();

        assert_eq!(descendants.len(), 3);
        assert!(names.contains(&"Department of Defense".to_string()));
        assert!(names.contains(&"United States Navy".to_string()));
        assert!(names.contains(&"United States Air Force".to_string()));
    }

    #[test]
    fn test_reparent_refuses_cycle() {
        let mut tree = AccountTree::new();
        let sector = tree.ensure_path(&["US Public Sector"]).unwrap();
        let dod = tree
            .ensure_path(&["US Public Sector", "Department of Defense"])
            .unwrap();

        // Moving an ancestor under its descendant would loop
        let result = tree.reparent(&sector, &dod);
        assert!(result.is_err());

        // Root never moves
        let root = tree.root_id().to_string();
        assert!(tree.reparent(&root, &dod).is_err());
    }

    #[test]
    fn test_reparent_moves_subtree() {
        let mut tree = AccountTree::new();
        let commercial = tree.ensure_path(&["Commercial"]).unwrap();
        let bucket = tree.unclassified_id().to_string();
        let lockheed = tree.add_child(&bucket, "Lockheed Martin").unwrap();

        tree.reparent(&lockheed, &commercial).unwrap();

        let node = tree.get(&lockheed).unwrap();
        assert_eq!(node.parent_id.as_deref(), Some(commercial.as_str()));
        assert_eq!(
            tree.path_string(node),
            "All Accounts → Commercial → Lockheed Martin"
        );
    }

    #[test]
    fn test_reparent_refuses_sibling_collision() {
        let mut tree = AccountTree::new();
        let commercial = tree.ensure_path(&["Commercial"]).unwrap();
        tree.add_child(&commercial, "Lockheed Martin").unwrap();
        let bucket = tree.unclassified_id().to_string();
        let stray = tree.add_child(&bucket, "Lockheed Martin").unwrap();

        let result = tree.reparent(&stray, &commercial);
        assert!(result.is_err());
    }

    #[test]
    fn test_rename_updates_canonical() {
        let mut tree = AccountTree::new();
        let root = tree.root_id().to_string();
        let id = tree.add_child(&root, "Lockheed").unwrap();

        tree.rename(&id, "Lockheed Martin Corporation").unwrap();

        let node = tree.get(&id).unwrap();
        assert_eq!(node.name, "Lockheed Martin Corporation");
        assert_eq!(node.canonical_name, "lockheed martin");
    }

    #[test]
    fn test_remove_leaf_rules() {
        let mut tree = AccountTree::new();
        let sector = tree.ensure_path(&["US Public Sector"]).unwrap();
        let dod = tree
            .ensure_path(&["US Public Sector", "Department of Defense"])
            .unwrap();

        // Not a leaf
        assert!(tree.remove_leaf(&sector).is_err());
        // Structural nodes stay
        let root = tree.root_id().to_string();
        let bucket = tree.unclassified_id().to_string();
        assert!(tree.remove_leaf(&root).is_err());
        assert!(tree.remove_leaf(&bucket).is_err());

        let removed = tree.remove_leaf(&dod).unwrap();
        assert_eq!(removed.name, "Department of Defense");
        assert!(tree.get(&dod).is_none());
    }

    #[test]
    fn test_find_by_name_case_insensitive() {
        let mut tree = AccountTree::new();
        let root = tree.root_id().to_string();
        tree.add_child(&root, "United States Navy").unwrap();

        assert!(tree.find_by_name("united states navy").is_some());
        assert!(tree.find_by_name("UNITED STATES NAVY").is_some());
        assert!(tree.find_by_name("United States Army").is_none());
    }

    #[test]
    fn test_find_by_name_prefers_path_order() {
        let mut tree = AccountTree::new();
        let commercial = tree.ensure_path(&["Commercial"]).unwrap();
        let sector = tree.ensure_path(&["US Public Sector"]).unwrap();
        tree.add_child(&commercial, "Field Office").unwrap();
        tree.add_child(&sector, "Field Office").unwrap();

        // The same name under two parents is legal; lookup always lands
        // on the copy whose path sorts first
        let found = tree.find_by_name("Field Office").unwrap();
        assert_eq!(tree.parent(&found).unwrap().name, "Commercial");

        let again = tree.find_by_name("Field Office").unwrap();
        assert_eq!(found.id, again.id);
    }

    #[test]
    fn test_find_by_canonical_prefers_path_order() {
        let mut tree = AccountTree::new();
        let commercial = tree.ensure_path(&["Commercial"]).unwrap();
        let sector = tree.ensure_path(&["US Public Sector"]).unwrap();
        tree.add_child(&commercial, "Field Office").unwrap();
        tree.add_child(&sector, "Field Office").unwrap();

        let found = tree.find_by_canonical("field office").unwrap();
        assert_eq!(tree.parent(&found).unwrap().name, "Commercial");
    }

    #[test]
    fn test_from_nodes_round_trip() {
        let mut tree = AccountTree::new();
        tree.ensure_path(&["US Public Sector", "Department of Defense", "United States Navy"])
            .unwrap();

        let stored = tree.all_nodes();
        let rebuilt = AccountTree::from_nodes(stored).unwrap();

        assert_eq!(rebuilt.len(), tree.len());
        assert_eq!(rebuilt.root_id(), tree.root_id());
        assert!(rebuilt.find_by_name("United States Navy").is_some());
    }

    #[test]
    fn test_from_nodes_rejects_missing_parent() {
        let orphan = AccountNode::new(
            "Orphan".to_string(),
            "orphan".to_string(),
            Some("missing-parent".to_string()),
        );
        let root = AccountNode::new(ROOT_NAME.to_string(), "all accounts".to_string(), None);
        let bucket = AccountNode::new(
            UNCLASSIFIED_NAME.to_string(),
            "unclassified".to_string(),
            Some(root.id.clone()),
        );

        let result = AccountTree::from_nodes(vec![root, bucket, orphan]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_nodes_rejects_two_roots() {
        let root1 = AccountNode::new(ROOT_NAME.to_string(), "all accounts".to_string(), None);
        let root2 = AccountNode::new("Other Root".to_string(), "other root".to_string(), None);

        let result = AccountTree::from_nodes(vec![root1, root2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_all_nodes_parents_before_children() {
        let mut tree = AccountTree::new();
        tree.ensure_path(&["US Public Sector", "Department of Defense"])
            .unwrap();

        let nodes = tree.all_nodes();
        let index_of = |name: &str| nodes.iter().position(|n| n.name == name).unwrap();

        assert_eq!(index_of(ROOT_NAME), 0);
        assert!(index_of("US Public Sector") < index_of("Department of Defense"));
    }
}
