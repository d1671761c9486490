// 📋 Review Queue - Ambiguous classifications awaiting a human decision
// Confirmations and reassignments feed the alias book, so every
// correction makes the next import smarter

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{
    AliasBook, ClassificationDecision, ClassificationOutcome, DecisionStatus, MatchCandidate,
};
use crate::hierarchy::AccountTree;
use crate::parser::RawRecord;

// ============================================================================
// PENDING REVIEW
// ============================================================================

/// A parked classification: the decision, the ranked suggestions that
/// informed it, and the record waiting to be attached somewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReview {
    pub decision: ClassificationDecision,

    /// Suggested targets, best first
    pub candidates: Vec<MatchCandidate>,

    pub record: RawRecord,

    pub queued_at: DateTime<Utc>,
}

impl PendingReview {
    /// Wrap a classification outcome, if it actually needs review
    pub fn from_outcome(outcome: ClassificationOutcome, record: RawRecord) -> Option<Self> {
        if outcome.decision.status != DecisionStatus::PendingReview {
            return None;
        }
        Some(PendingReview {
            decision: outcome.decision,
            candidates: outcome.candidates,
            record,
            queued_at: Utc::now(),
        })
    }
}

// ============================================================================
// RESOLUTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewResolution {
    /// The suggested node was right
    Confirmed,

    /// The reviewer picked a different node
    Reassigned { node_id: String },

    /// No candidate fits; make a fresh leaf under Unclassified
    RejectedCreateNew,
}

// ============================================================================
// REVIEW QUEUE
// ============================================================================

/// FIFO queue of pending classifications, keyed by decision id
pub struct ReviewQueue {
    entries: Vec<PendingReview>,
}

impl ReviewQueue {
    pub fn new() -> Self {
        ReviewQueue {
            entries: Vec::new(),
        }
    }

    pub fn enqueue(&mut self, pending: PendingReview) {
        self.entries.push(pending);
    }

    /// Pending entries, oldest first
    pub fn pending(&self) -> &[PendingReview] {
        &self.entries
    }

    pub fn get(&self, decision_id: &str) -> Option<&PendingReview> {
        self.entries.iter().find(|p| p.decision.id == decision_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply a human decision to a queued entry.
    ///
    /// Confirmed/Reassigned attach the record to the chosen node and learn
    /// the raw name as an alias of it. RejectedCreateNew marks the match
    /// rejected and gives the record a fresh leaf under Unclassified.
    ///
    /// The entry leaves the queue only when the resolution succeeds, so a
    /// confirm onto a node deleted since queueing can be retried.
    pub fn resolve(
        &mut self,
        decision_id: &str,
        resolution: ReviewResolution,
        tree: &mut AccountTree,
        aliases: &mut AliasBook,
    ) -> Result<ClassificationDecision> {
        let index = self
            .entries
            .iter()
            .position(|p| p.decision.id == decision_id)
            .ok_or_else(|| anyhow!("No pending review with id: {}", decision_id))?;

        // Validate the target before touching the queue
        let target: Option<String> = match &resolution {
            ReviewResolution::Confirmed => {
                let suggested = self.entries[index]
                    .decision
                    .node_id
                    .clone()
                    .ok_or_else(|| anyhow!("Pending entry has no suggested node"))?;
                if tree.get(&suggested).is_none() {
                    return Err(anyhow!(
                        "Suggested node {} no longer exists; reassign or reject",
                        suggested
                    ));
                }
                Some(suggested)
            }
            ReviewResolution::Reassigned { node_id } => {
                if tree.get(node_id).is_none() {
                    return Err(anyhow!("Account node not found: {}", node_id));
                }
                Some(node_id.clone())
            }
            ReviewResolution::RejectedCreateNew => None,
        };

        let entry = self.entries.remove(index);
        let mut decision = entry.decision;

        match target {
            Some(node_id) => {
                tree.attach_record(&node_id, &entry.record)?;
                if let Some(key) = &decision.canonical_key {
                    aliases.learn(key, &entry.record.raw_name, &node_id, "review");
                }
                let node_name = tree.get(&node_id).map(|n| n.name.clone());
                decision.node_id = Some(node_id);
                decision.matched_text = node_name;
                decision.status = DecisionStatus::AutoAccepted;
                decision.decided_at = Utc::now();
            }
            None => {
                let bucket = tree.unclassified_id().to_string();
                let node_id = tree.add_child(&bucket, &entry.record.raw_name)?;
                tree.attach_record(&node_id, &entry.record)?;
                if let Some(key) = &decision.canonical_key {
                    aliases.learn(key, &entry.record.raw_name, &node_id, "review");
                }
                decision.node_id = Some(node_id);
                decision.matched_text = None;
                decision.score = 0.0;
                decision.status = DecisionStatus::Rejected;
                decision.created_new_node = true;
                decision.decided_at = Utc::now();
            }
        }

        Ok(decision)
    }
}

impl Default for ReviewQueue {
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
    use crate::classifier::Classifier;
    use crate::parser::SourceType;

    fn test_record(name: &str) -> RawRecord {
        RawRecord::new(
            name.to_string(),
            SourceType::CsvExport,
            "test.csv".to_string(),
            2,
            name.to_string(),
        )
        .with_revenue(250.0)
    }

    /// Classify "Navy" against a seeded tree; it lands in the review band
    fn pending_world() -> (AccountTree, AliasBook, ReviewQueue, String, String, String) {
        let mut tree = AccountTree::new();
        let navy = tree
            .ensure_path(&["Department of Defense", "United States Navy"])
            .unwrap();
        let usaf = tree
            .ensure_path(&["Department of Defense", "United States Air Force"])
            .unwrap();

        let mut aliases = AliasBook::new();
        let classifier = Classifier::new();
        let record = test_record("Navy");
        let outcome = classifier
            .classify_record(&record, &mut tree, &mut aliases)
            .unwrap();
        assert_eq!(outcome.decision.status, DecisionStatus::PendingReview);
        let decision_id = outcome.decision.id.clone();

        let mut queue = ReviewQueue::new();
        queue.enqueue(PendingReview::from_outcome(outcome, record).unwrap());

        (tree, aliases, queue, navy, usaf, decision_id)
    }

    #[test]
    fn test_from_outcome_only_wraps_pending() {
        let mut tree = AccountTree::new();
        tree.ensure_path(&["United States Navy"]).unwrap();
        let mut aliases = AliasBook::new();
        let classifier = Classifier::new();

        let record = test_record("United States Navy");
        let outcome = classifier
            .classify_record(&record, &mut tree, &mut aliases)
            .unwrap();
        assert_eq!(outcome.decision.status, DecisionStatus::AutoAccepted);
        assert!(PendingReview::from_outcome(outcome, record).is_none());
    }

    #[test]
    fn test_confirm_attaches_and_learns() {
        let (mut tree, mut aliases, mut queue, navy, _, decision_id) = pending_world();

        let decision = queue
            .resolve(&decision_id, ReviewResolution::Confirmed, &mut tree, &mut aliases)
            .unwrap();

        assert_eq!(decision.status, DecisionStatus::AutoAccepted);
        assert_eq!(decision.node_id.as_deref(), Some(navy.as_str()));
        assert!(queue.is_empty());

        let node = tree.get(&navy).unwrap();
        assert_eq!(node.record_count, 1);
        assert_eq!(node.total_revenue, 250.0);

        // The correction trains future matching
        let learned = aliases.get("navy").unwrap();
        assert_eq!(learned.node_id, navy);
        assert_eq!(learned.learned_from, "review");
        assert_eq!(learned.raw_alias, "Navy");
    }

    #[test]
    fn test_reassign_to_other_node() {
        let (mut tree, mut aliases, mut queue, navy, usaf, decision_id) = pending_world();

        let decision = queue
            .resolve(
                &decision_id,
                ReviewResolution::Reassigned {
                    node_id: usaf.clone(),
                },
                &mut tree,
                &mut aliases,
            )
            .unwrap();

        assert_eq!(decision.node_id.as_deref(), Some(usaf.as_str()));
        assert_eq!(tree.get(&usaf).unwrap().record_count, 1);
        assert_eq!(tree.get(&navy).unwrap().record_count, 0);
        assert_eq!(aliases.get("navy").unwrap().node_id, usaf);
    }

    #[test]
    fn test_reject_creates_new_leaf() {
        let (mut tree, mut aliases, mut queue, navy, _, decision_id) = pending_world();
        let nodes_before = tree.len();

        let decision = queue
            .resolve(
                &decision_id,
                ReviewResolution::RejectedCreateNew,
                &mut tree,
                &mut aliases,
            )
            .unwrap();

        assert_eq!(decision.status, DecisionStatus::Rejected);
        assert!(decision.created_new_node);
        assert_eq!(tree.len(), nodes_before + 1);

        let node_id = decision.node_id.unwrap();
        let node = tree.get(&node_id).unwrap();
        assert_eq!(node.name, "Navy");
        assert_eq!(node.parent_id.as_deref(), Some(tree.unclassified_id()));
        assert_eq!(node.record_count, 1);
        assert_eq!(tree.get(&navy).unwrap().record_count, 0);

        // Next "Navy" sighting resolves straight to the new node
        assert_eq!(aliases.get("navy").unwrap().node_id, node_id);
    }

    #[test]
    fn test_resolve_twice_fails() {
        let (mut tree, mut aliases, mut queue, _, _, decision_id) = pending_world();

        queue
            .resolve(&decision_id, ReviewResolution::Confirmed, &mut tree, &mut aliases)
            .unwrap();
        let second = queue.resolve(
            &decision_id,
            ReviewResolution::Confirmed,
            &mut tree,
            &mut aliases,
        );
        assert!(second.is_err());
    }

    #[test]
    fn test_resolve_unknown_id_fails() {
        let (mut tree, mut aliases, mut queue, _, _, _) = pending_world();

        let result = queue.resolve(
            "no-such-decision",
            ReviewResolution::Confirmed,
            &mut tree,
            &mut aliases,
        );
        assert!(result.is_err());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_confirm_onto_deleted_node_keeps_entry() {
        let (mut tree, mut aliases, mut queue, navy, _, decision_id) = pending_world();

        tree.remove_leaf(&navy).unwrap();

        let result = queue.resolve(
            &decision_id,
            ReviewResolution::Confirmed,
            &mut tree,
            &mut aliases,
        );
        assert!(result.is_err());
        // Entry stays queued so the reviewer can pick another target
        assert_eq!(queue.len(), 1);

        let decision = queue
            .resolve(
                &decision_id,
                ReviewResolution::RejectedCreateNew,
                &mut tree,
                &mut aliases,
            )
            .unwrap();
        assert!(decision.created_new_node);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_is_fifo() {
        let (mut tree, mut aliases, mut queue, _, _, first_id) = pending_world();

        let classifier = Classifier::new();
        let record = test_record("Air Force");
        let outcome = classifier
            .classify_record(&record, &mut tree, &mut aliases)
            .unwrap();
        assert_eq!(outcome.decision.status, DecisionStatus::PendingReview);
        queue.enqueue(PendingReview::from_outcome(outcome, record).unwrap());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pending()[0].decision.id, first_id);
        assert_eq!(queue.pending()[1].record.raw_name, "Air Force");
        assert!(queue.get(&first_id).is_some());
    }
}
