// 🔍 Classifier - Match normalized customer names to account nodes
// Jaro-Winkler scoring over node names AND learned aliases, with
// configurable thresholds deciding auto-accept / review / new-node

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::Settings;
use crate::hierarchy::AccountTree;
use crate::normalizer::Normalizer;
use crate::parser::RawRecord;

// ============================================================================
// CONFIDENCE LEVEL
// ============================================================================

/// Fixed confidence bands. The decision thresholds are configurable;
/// these labels are not.
const HIGH_CONFIDENCE: f64 = 0.8;
const MEDIUM_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE {
            ConfidenceLevel::High
        } else if score >= MEDIUM_CONFIDENCE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

// ============================================================================
// MATCH KIND
// ============================================================================

/// What the query matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    AccountName,
    Alias,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::AccountName => "account_name",
            MatchKind::Alias => "alias",
        }
    }
}

// ============================================================================
// MATCH CANDIDATE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Account node the candidate points at
    pub node_id: String,

    /// Display name of that node
    pub node_name: String,

    /// The text that actually matched (node name or a learned alias)
    pub matched_text: String,

    /// Similarity score (0.0 - 1.0)
    pub score: f64,

    pub kind: MatchKind,

    pub confidence: ConfidenceLevel,
}

// ============================================================================
// CLASSIFICATION DECISION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// Confident match applied to the tree (or a new node created)
    AutoAccepted,

    /// Parked in the review queue; the tree was not touched
    PendingReview,

    /// Record could not or should not be matched
    Rejected,
}

impl DecisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::AutoAccepted => "auto_accepted",
            DecisionStatus::PendingReview => "pending_review",
            DecisionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto_accepted" => Some(DecisionStatus::AutoAccepted),
            "pending_review" => Some(DecisionStatus::PendingReview),
            "rejected" => Some(DecisionStatus::Rejected),
            _ => None,
        }
    }
}

/// One record's classification outcome, durable in the decisions table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationDecision {
    /// Stable identity (UUID)
    pub id: String,

    /// Customer name as it appeared in the report
    pub raw_name: String,

    /// Canonical key the match ran on. None when the name was unusable.
    pub canonical_key: Option<String>,

    /// Chosen account node, if any
    pub node_id: Option<String>,

    /// Node name or alias the score was computed against
    pub matched_text: Option<String>,

    /// Similarity score (0.0 - 1.0); 1.0 for exact hits, 0.0 for new nodes
    pub score: f64,

    pub status: DecisionStatus,

    /// True when a fresh leaf was created for this record
    pub created_new_node: bool,

    pub source_file: String,
    pub line_number: usize,
    pub decided_at: DateTime<Utc>,
}

/// Decision plus the ranked candidates that informed it.
/// The candidates feed the review queue when the status is PendingReview.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub decision: ClassificationDecision,
    pub candidates: Vec<MatchCandidate>,
}

// ============================================================================
// ALIAS BOOK
// ============================================================================

/// One learned name mapping. Corrections overwrite: an alias key points
/// at exactly one node, and the latest correction wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alias {
    /// Canonical form of the alias (lookup key)
    pub alias_key: String,

    /// The alias as it appeared in the wild
    pub raw_alias: String,

    pub node_id: String,

    /// Where the mapping came from: "seed", "auto_accept", "review"
    pub learned_from: String,

    pub created_at: DateTime<Utc>,
}

/// The similarity model's memory: alias keys learned from auto-accepts,
/// review confirmations, and seeding.
pub struct AliasBook {
    aliases: HashMap<String, Alias>,
}

impl AliasBook {
    pub fn new() -> Self {
        AliasBook {
            aliases: HashMap::new(),
        }
    }

    pub fn from_aliases(stored: Vec<Alias>) -> Self {
        let mut book = AliasBook::new();
        for alias in stored {
            book.aliases.insert(alias.alias_key.clone(), alias);
        }
        book
    }

    /// Learn (or overwrite) a mapping from a canonical alias key to a node
    pub fn learn(&mut self, alias_key: &str, raw_alias: &str, node_id: &str, learned_from: &str) {
        self.aliases.insert(
            alias_key.to_string(),
            Alias {
                alias_key: alias_key.to_string(),
                raw_alias: raw_alias.to_string(),
                node_id: node_id.to_string(),
                learned_from: learned_from.to_string(),
                created_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, alias_key: &str) -> Option<&Alias> {
        self.aliases.get(alias_key)
    }

    /// Drop all aliases pointing at a node, returning how many went
    pub fn forget_node(&mut self, node_id: &str) -> usize {
        let before = self.aliases.len();
        self.aliases.retain(|_, a| a.node_id != node_id);
        before - self.aliases.len()
    }

    /// All aliases, sorted by key for stable persistence
    pub fn all(&self) -> Vec<Alias> {
        let mut all: Vec<Alias> = self.aliases.values().cloned().collect();
        all.sort_by(|a, b| a.alias_key.cmp(&b.alias_key));
        all
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for AliasBook {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct Classifier {
    /// Minimum similarity for a candidate to be considered at all (default: 0.6)
    pub fuzzy_match_threshold: f64,

    /// At or above this, a match is applied without review (default: 0.8)
    pub auto_accept_threshold: f64,

    /// Maximum candidates returned per lookup (default: 10)
    pub max_candidates: usize,

    /// Canonicalizer applied to incoming raw names
    pub normalizer: Normalizer,
}

impl Classifier {
    /// Create classifier with default thresholds
    pub fn new() -> Self {
        Classifier {
            fuzzy_match_threshold: 0.6,
            auto_accept_threshold: 0.8,
            max_candidates: 10,
            normalizer: Normalizer::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Classifier {
            fuzzy_match_threshold: settings.fuzzy_match_threshold,
            auto_accept_threshold: settings.auto_accept_threshold,
            max_candidates: settings.max_candidates,
            normalizer: Normalizer::new(),
        }
    }

    /// Similarity between two canonical keys: Jaro-Winkler, floored at the
    /// fuzzy threshold when every token of the shorter key appears in the
    /// longer one ("navy" is contained in "united states navy").
    pub fn score(&self, query: &str, candidate: &str) -> f64 {
        let base = strsim::jaro_winkler(&query.to_lowercase(), &candidate.to_lowercase());

        let (short, long) = if query.len() <= candidate.len() {
            (query, candidate)
        } else {
            (candidate, query)
        };
        if base < self.fuzzy_match_threshold && tokens_contained(short, long) {
            return self.fuzzy_match_threshold;
        }

        base
    }

    /// Rank every node name and learned alias against a canonical key.
    /// One candidate per node (best match wins); ties prefer the account
    /// name over an alias.
    pub fn find_candidates(
        &self,
        canonical_key: &str,
        tree: &AccountTree,
        aliases: &AliasBook,
    ) -> Vec<MatchCandidate> {
        let mut scored: Vec<MatchCandidate> = Vec::new();

        for node in tree.all_nodes() {
            // Structural nodes never attract matches
            if node.id == tree.root_id() || node.id == tree.unclassified_id() {
                continue;
            }
            let score = self.score(canonical_key, &node.canonical_name);
            if score >= self.fuzzy_match_threshold {
                scored.push(MatchCandidate {
                    node_id: node.id.clone(),
                    node_name: node.name.clone(),
                    matched_text: node.name.clone(),
                    score,
                    kind: MatchKind::AccountName,
                    confidence: ConfidenceLevel::from_score(score),
                });
            }
        }

        for alias in aliases.all() {
            // Skip aliases whose node has since been removed
            let Some(node) = tree.get(&alias.node_id) else {
                continue;
            };
            let score = self.score(canonical_key, &alias.alias_key);
            if score >= self.fuzzy_match_threshold {
                scored.push(MatchCandidate {
                    node_id: node.id.clone(),
                    node_name: node.name.clone(),
                    matched_text: alias.raw_alias.clone(),
                    score,
                    kind: MatchKind::Alias,
                    confidence: ConfidenceLevel::from_score(score),
                });
            }
        }

        // Best first; at equal score the account name outranks an alias
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| rank_of_kind(a.kind).cmp(&rank_of_kind(b.kind)))
                .then_with(|| a.node_name.cmp(&b.node_name))
        });

        // One candidate per node
        let mut seen = std::collections::HashSet::new();
        scored.retain(|c| seen.insert(c.node_id.clone()));

        scored.truncate(self.max_candidates);
        scored
    }

    /// Top candidate for a canonical key, or None below the threshold
    pub fn find_best(
        &self,
        canonical_key: &str,
        tree: &AccountTree,
        aliases: &AliasBook,
    ) -> Option<MatchCandidate> {
        self.find_candidates(canonical_key, tree, aliases)
            .into_iter()
            .next()
    }

    /// Candidates for a raw (un-normalized) name. Unusable names return
    /// an empty list.
    pub fn search(
        &self,
        raw_name: &str,
        tree: &AccountTree,
        aliases: &AliasBook,
    ) -> Vec<MatchCandidate> {
        match self.normalizer.canonical(raw_name) {
            Some(key) => self.find_candidates(&key, tree, aliases),
            None => Vec::new(),
        }
    }

    /// Classify one parsed record against the tree.
    ///
    /// - exact key hit (node name or alias) → auto-accept, score 1.0
    /// - best score ≥ auto_accept_threshold → auto-accept + learn alias
    /// - best score in the review band → pending review, tree untouched
    /// - nothing above the fuzzy threshold → new leaf under Unclassified
    /// - unusable name → rejected
    pub fn classify_record(
        &self,
        record: &RawRecord,
        tree: &mut AccountTree,
        aliases: &mut AliasBook,
    ) -> Result<ClassificationOutcome> {
        let Some(key) = self.normalizer.normalize(&record.raw_name) else {
            return Ok(ClassificationOutcome {
                decision: self.decision_for(record, None, None, None, 0.0, DecisionStatus::Rejected, false),
                candidates: Vec::new(),
            });
        };
        let canonical = key.canonical;

        // Exact node-name hit
        if let Some(node) = tree.find_by_canonical(&canonical) {
            if node.id != tree.root_id() && node.id != tree.unclassified_id() {
                tree.attach_record(&node.id, record)?;
                return Ok(ClassificationOutcome {
                    decision: self.decision_for(
                        record,
                        Some(&canonical),
                        Some(&node.id),
                        Some(&node.name),
                        1.0,
                        DecisionStatus::AutoAccepted,
                        false,
                    ),
                    candidates: Vec::new(),
                });
            }
        }

        // Exact learned-alias hit
        if let Some(alias) = aliases.get(&canonical) {
            if let Some(node) = tree.get(&alias.node_id).cloned() {
                let matched = alias.raw_alias.clone();
                tree.attach_record(&node.id, record)?;
                return Ok(ClassificationOutcome {
                    decision: self.decision_for(
                        record,
                        Some(&canonical),
                        Some(&node.id),
                        Some(&matched),
                        1.0,
                        DecisionStatus::AutoAccepted,
                        false,
                    ),
                    candidates: Vec::new(),
                });
            }
        }

        let candidates = self.find_candidates(&canonical, tree, aliases);

        if let Some(best) = candidates.first() {
            if best.score >= self.auto_accept_threshold {
                tree.attach_record(&best.node_id, record)?;
                // The raw spelling now matches exactly next time
                aliases.learn(&canonical, &record.raw_name, &best.node_id, "auto_accept");
                return Ok(ClassificationOutcome {
                    decision: self.decision_for(
                        record,
                        Some(&canonical),
                        Some(&best.node_id),
                        Some(&best.matched_text),
                        best.score,
                        DecisionStatus::AutoAccepted,
                        false,
                    ),
                    candidates,
                });
            }

            // Review band: park it, touch nothing
            let decision = self.decision_for(
                record,
                Some(&canonical),
                Some(&best.node_id),
                Some(&best.matched_text),
                best.score,
                DecisionStatus::PendingReview,
                false,
            );
            return Ok(ClassificationOutcome {
                decision,
                candidates,
            });
        }

        // No candidate at all: new leaf under the Unclassified bucket
        let bucket = tree.unclassified_id().to_string();
        let node_id = tree.add_child(&bucket, &record.raw_name)?;
        tree.attach_record(&node_id, record)?;
        Ok(ClassificationOutcome {
            decision: self.decision_for(
                record,
                Some(&canonical),
                Some(&node_id),
                None,
                0.0,
                DecisionStatus::AutoAccepted,
                true,
            ),
            candidates: Vec::new(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn decision_for(
        &self,
        record: &RawRecord,
        canonical_key: Option<&str>,
        node_id: Option<&str>,
        matched_text: Option<&str>,
        score: f64,
        status: DecisionStatus,
        created_new_node: bool,
    ) -> ClassificationDecision {
        ClassificationDecision {
            id: uuid::Uuid::new_v4().to_string(),
            raw_name: record.raw_name.clone(),
            canonical_key: canonical_key.map(|s| s.to_string()),
            node_id: node_id.map(|s| s.to_string()),
            matched_text: matched_text.map(|s| s.to_string()),
            score,
            status,
            created_new_node,
            source_file: record.source_file.clone(),
            line_number: record.line_number,
            decided_at: Utc::now(),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

fn rank_of_kind(kind: MatchKind) -> u8 {
    match kind {
        MatchKind::AccountName => 0,
        MatchKind::Alias => 1,
    }
}

/// Every token of `short` appears in `long`
fn tokens_contained(short: &str, long: &str) -> bool {
    let short_tokens: Vec<&str> = short.split_whitespace().collect();
    if short_tokens.is_empty() {
        return false;
    }
    let long_tokens: std::collections::HashSet<&str> = long.split_whitespace().collect();
    short_tokens.iter().all(|t| long_tokens.contains(t))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SourceType;

    fn test_record(name: &str) -> RawRecord {
        RawRecord::new(
            name.to_string(),
            SourceType::CsvExport,
            "test.csv".to_string(),
            2,
            name.to_string(),
        )
        .with_revenue(100.0)
    }

    /// Tree with the usual defense accounts plus a couple of aliases
    fn sample_world() -> (AccountTree, AliasBook, String, String) {
        let mut tree = AccountTree::new();
        let navy = tree
            .ensure_path(&[
                "US Public Sector",
                "US Federal Government",
                "Department of Defense",
                "United States Navy",
            ])
            .unwrap();
        let lockheed = tree
            .ensure_path(&[
                "Commercial",
                "Defense Contractors",
                "Lockheed Martin Corporation",
            ])
            .unwrap();

        let mut aliases = AliasBook::new();
        aliases.learn("usn", "USN", &navy, "seed");
        aliases.learn("lmt", "LMT", &lockheed, "seed");

        (tree, aliases, navy, lockheed)
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.8), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.7), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.6), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.3), ConfidenceLevel::Low);
    }

    #[test]
    fn test_score_exact() {
        let classifier = Classifier::new();
        assert!(classifier.score("united states navy", "united states navy") > 0.99);
    }

    #[test]
    fn test_score_containment_floor() {
        let classifier = Classifier::new();
        // Plain Jaro-Winkler puts "navy" vs the full name below threshold;
        // token containment floors it into the review band
        let score = classifier.score("navy", "united states navy");
        assert_eq!(score, 0.6);
        assert_eq!(ConfidenceLevel::from_score(score), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_score_unrelated_stays_low() {
        let classifier = Classifier::new();
        let score = classifier.score("starbucks coffee", "united states navy");
        assert!(score < 0.6);
    }

    #[test]
    fn test_find_candidates_ranks_and_dedups() {
        let (tree, aliases, navy, _) = sample_world();
        let classifier = Classifier::new();

        let candidates = classifier.find_candidates("united states navy", &tree, &aliases);
        assert!(!candidates.is_empty());
        assert_eq!(candidates[0].node_id, navy);
        assert_eq!(candidates[0].kind, MatchKind::AccountName);
        assert!(candidates[0].score > 0.99);

        // One entry per node even though the node also has an alias
        let navy_entries = candidates.iter().filter(|c| c.node_id == navy).count();
        assert_eq!(navy_entries, 1);
    }

    #[test]
    fn test_find_candidates_via_alias() {
        let (tree, aliases, navy, _) = sample_world();
        let classifier = Classifier::new();

        let candidates = classifier.find_candidates("usn", &tree, &aliases);
        assert!(!candidates.is_empty());
        assert_eq!(candidates[0].node_id, navy);
        assert_eq!(candidates[0].kind, MatchKind::Alias);
        assert_eq!(candidates[0].matched_text, "USN");
    }

    #[test]
    fn test_find_best_none_below_threshold() {
        let (tree, aliases, _, _) = sample_world();
        let classifier = Classifier::new();

        assert!(classifier.find_best("zzqq 9341", &tree, &aliases).is_none());
    }

    #[test]
    fn test_classify_exact_name() {
        let (mut tree, mut aliases, navy, _) = sample_world();
        let classifier = Classifier::new();

        let outcome = classifier
            .classify_record(&test_record("United States Navy"), &mut tree, &mut aliases)
            .unwrap();

        assert_eq!(outcome.decision.status, DecisionStatus::AutoAccepted);
        assert_eq!(outcome.decision.node_id.as_deref(), Some(navy.as_str()));
        assert_eq!(outcome.decision.score, 1.0);
        assert!(!outcome.decision.created_new_node);
        assert_eq!(tree.get(&navy).unwrap().record_count, 1);
    }

    #[test]
    fn test_classify_exact_alias() {
        let (mut tree, mut aliases, navy, _) = sample_world();
        let classifier = Classifier::new();

        let outcome = classifier
            .classify_record(&test_record("USN"), &mut tree, &mut aliases)
            .unwrap();

        assert_eq!(outcome.decision.status, DecisionStatus::AutoAccepted);
        assert_eq!(outcome.decision.node_id.as_deref(), Some(navy.as_str()));
        assert_eq!(outcome.decision.score, 1.0);
        assert_eq!(outcome.decision.matched_text.as_deref(), Some("USN"));
    }

    #[test]
    fn test_classify_close_spelling_auto_accepts_and_learns() {
        let (mut tree, mut aliases, _, lockheed) = sample_world();
        let classifier = Classifier::new();

        // "Lockheed Martin Corp." shares the canonical key; use a variant
        // that differs after normalization but scores above 0.8
        let outcome = classifier
            .classify_record(
                &test_record("Lockheed Martin Corporation USA"),
                &mut tree,
                &mut aliases,
            )
            .unwrap();

        assert_eq!(outcome.decision.status, DecisionStatus::AutoAccepted);
        assert_eq!(outcome.decision.node_id.as_deref(), Some(lockheed.as_str()));
        assert!(outcome.decision.score >= 0.8);

        // The spelling is now a learned alias
        let learned = aliases.get("lockheed martin usa").unwrap();
        assert_eq!(learned.node_id, lockheed);
        assert_eq!(learned.learned_from, "auto_accept");

        // Second sighting is an exact alias hit
        let again = classifier
            .classify_record(
                &test_record("Lockheed Martin Corporation USA"),
                &mut tree,
                &mut aliases,
            )
            .unwrap();
        assert_eq!(again.decision.score, 1.0);
        assert_eq!(tree.get(&lockheed).unwrap().record_count, 2);
    }

    #[test]
    fn test_classify_medium_goes_to_review_without_mutation() {
        let (mut tree, mut aliases, navy, _) = sample_world();
        let classifier = Classifier::new();
        let nodes_before = tree.len();

        let outcome = classifier
            .classify_record(&test_record("Navy"), &mut tree, &mut aliases)
            .unwrap();

        assert_eq!(outcome.decision.status, DecisionStatus::PendingReview);
        assert_eq!(outcome.decision.node_id.as_deref(), Some(navy.as_str()));
        assert!(!outcome.candidates.is_empty());
        // Pending review never touches the tree or the alias book
        assert_eq!(tree.len(), nodes_before);
        assert_eq!(tree.get(&navy).unwrap().record_count, 0);
        assert!(aliases.get("navy").is_none());
    }

    #[test]
    fn test_classify_no_match_creates_new_leaf() {
        let (mut tree, mut aliases, _, _) = sample_world();
        let classifier = Classifier::new();
        let nodes_before = tree.len();

        let outcome = classifier
            .classify_record(&test_record("Starbucks Coffee"), &mut tree, &mut aliases)
            .unwrap();

        assert_eq!(outcome.decision.status, DecisionStatus::AutoAccepted);
        assert!(outcome.decision.created_new_node);
        assert_eq!(outcome.decision.score, 0.0);
        assert_eq!(tree.len(), nodes_before + 1);

        let node_id = outcome.decision.node_id.unwrap();
        let node = tree.get(&node_id).unwrap();
        assert_eq!(node.name, "Starbucks Coffee");
        assert_eq!(node.parent_id.as_deref(), Some(tree.unclassified_id()));
        assert_eq!(node.record_count, 1);
    }

    #[test]
    fn test_classify_unusable_name_rejected() {
        let (mut tree, mut aliases, _, _) = sample_world();
        let classifier = Classifier::new();

        let outcome = classifier
            .classify_record(&test_record("#"), &mut tree, &mut aliases)
            .unwrap();

        assert_eq!(outcome.decision.status, DecisionStatus::Rejected);
        assert!(outcome.decision.node_id.is_none());
        assert!(outcome.decision.canonical_key.is_none());
    }

    #[test]
    fn test_alias_overwrite_last_wins() {
        let (_, _, navy, lockheed) = sample_world();
        let mut book = AliasBook::new();

        book.learn("lm", "LM", &navy, "seed");
        book.learn("lm", "LM", &lockheed, "review");

        let alias = book.get("lm").unwrap();
        assert_eq!(alias.node_id, lockheed);
        assert_eq!(alias.learned_from, "review");
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_alias_forget_node() {
        let (_, _, navy, lockheed) = sample_world();
        let mut book = AliasBook::new();
        book.learn("usn", "USN", &navy, "seed");
        book.learn("us navy", "US Navy", &navy, "seed");
        book.learn("lmt", "LMT", &lockheed, "seed");

        let removed = book.forget_node(&navy);
        assert_eq!(removed, 2);
        assert_eq!(book.len(), 1);
        assert!(book.get("lmt").is_some());
    }

    #[test]
    fn test_search_raw_name() {
        let (tree, aliases, navy, _) = sample_world();
        let classifier = Classifier::new();

        // Raw input gets normalized before matching
        let candidates = classifier.search("  U.S.N. ", &tree, &aliases);
        assert!(!candidates.is_empty());
        assert_eq!(candidates[0].node_id, navy);

        // Unusable input comes back empty, not an error
        assert!(classifier.search("!", &tree, &aliases).is_empty());
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::new();
        settings.fuzzy_match_threshold = 0.5;
        settings.auto_accept_threshold = 0.9;
        settings.max_candidates = 3;

        let classifier = Classifier::from_settings(&settings);
        assert_eq!(classifier.fuzzy_match_threshold, 0.5);
        assert_eq!(classifier.auto_accept_threshold, 0.9);
        assert_eq!(classifier.max_candidates, 3);
    }
}
