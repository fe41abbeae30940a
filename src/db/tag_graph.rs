//! Tag graph planning
//!
//! Pure decision logic for the tag hierarchy. The tag repository loads the
//! full edge set inside a transaction, asks this module what to change, and
//! applies the answer before committing. Tag graphs are small, so loading
//! every edge is cheap and keeps the planning logic free of SQL.
//!
//! Edges point from the broader tag (parent) to the narrower tag (child).
//! The graph must stay acyclic and free of redundant edges: an edge is never
//! added between two tags that are already connected through the hierarchy.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::TagRelation;

/// Why a proposed edge was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeRejection {
    /// The two tags are already connected (duplicate, self-edge, or an edge
    /// made redundant by an existing path). Contains the overlapping tag IDs.
    AlreadyConnected(Vec<i64>),
    /// The edge would close a cycle. Contains the two endpoint IDs.
    WouldCycle(Vec<i64>),
}

/// In-memory view of the tag hierarchy
#[derive(Debug, Clone, Default)]
pub struct TagGraph {
    children: HashMap<i64, Vec<i64>>,
    parents: HashMap<i64, Vec<i64>>,
}

impl TagGraph {
    /// Build a graph from the full edge set
    pub fn new(relations: &[TagRelation]) -> Self {
        let mut graph = TagGraph::default();
        for rel in relations {
            graph
                .children
                .entry(rel.parent_id)
                .or_default()
                .push(rel.child_id);
            graph
                .parents
                .entry(rel.child_id)
                .or_default()
                .push(rel.parent_id);
        }
        graph
    }

    /// All transitive ancestors of a tag (excluding the tag itself)
    pub fn ancestors_of(&self, id: i64) -> HashSet<i64> {
        self.walk(id, &self.parents)
    }

    /// All transitive descendants of a tag (excluding the tag itself)
    pub fn descendants_of(&self, id: i64) -> HashSet<i64> {
        self.walk(id, &self.children)
    }

    fn walk(&self, start: i64, adjacency: &HashMap<i64, Vec<i64>>) -> HashSet<i64> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(id) = queue.pop_front() {
            if let Some(next) = adjacency.get(&id) {
                for &n in next {
                    if seen.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }

        seen.remove(&start);
        seen
    }

    /// Validate a proposed parent/child edge.
    ///
    /// Rejects self-edges, duplicates, edges made redundant by an existing
    /// path, and edges that would close a cycle.
    pub fn check_new_edge(&self, parent_id: i64, child_id: i64) -> Result<(), EdgeRejection> {
        // Upward closure of the child against downward closure of the parent.
        // Any overlap means the two tags are already connected along the
        // direction of the proposed edge.
        let mut up = self.ancestors_of(child_id);
        up.insert(child_id);
        let mut down = self.descendants_of(parent_id);
        down.insert(parent_id);

        let mut overlap: Vec<i64> = up.intersection(&down).copied().collect();
        if !overlap.is_empty() {
            overlap.sort_unstable();
            return Err(EdgeRejection::AlreadyConnected(overlap));
        }

        // A path from child down to parent means the new edge closes a loop
        if self.descendants_of(child_id).contains(&parent_id) {
            return Err(EdgeRejection::WouldCycle(vec![parent_id, child_id]));
        }

        Ok(())
    }

    /// Expand a set of tags with all of their ancestors.
    ///
    /// Attaching a narrow tag to an article implicitly attaches every broader
    /// tag above it.
    pub fn expand_attachment(&self, tag_ids: &[i64]) -> HashSet<i64> {
        let mut expanded = HashSet::new();
        for &id in tag_ids {
            expanded.insert(id);
            expanded.extend(self.ancestors_of(id));
        }
        expanded
    }

    /// Plan which tags to remove when detaching `requested` from an article
    /// currently tagged with `current`.
    ///
    /// Removing a tag also removes its attached descendants, since their
    /// presence would imply the removed tag. A candidate survives when it is
    /// still reachable from a tag that stays, walking child edges without
    /// passing through an explicitly removed tag.
    pub fn plan_detachment(&self, current: &HashSet<i64>, requested: &[i64]) -> HashSet<i64> {
        let explicit: HashSet<i64> = requested
            .iter()
            .copied()
            .filter(|id| current.contains(id))
            .collect();
        if explicit.is_empty() {
            return HashSet::new();
        }

        let mut candidates = explicit.clone();
        for &id in &explicit {
            for d in self.descendants_of(id) {
                if current.contains(&d) {
                    candidates.insert(d);
                }
            }
        }

        // Walk down from the tags that stay; anything reached is justified
        // and survives. Explicitly removed tags block the walk.
        let kept: Vec<i64> = current.difference(&candidates).copied().collect();
        let mut justified: HashSet<i64> = kept.iter().copied().collect();
        let mut queue: VecDeque<i64> = kept.into();

        while let Some(id) = queue.pop_front() {
            if let Some(children) = self.children.get(&id) {
                for &c in children {
                    if current.contains(&c) && !explicit.contains(&c) && justified.insert(c) {
                        queue.push_back(c);
                    }
                }
            }
        }

        candidates.difference(&justified).copied().collect()
    }
}
