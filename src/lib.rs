// POS Account Hierarchy - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod parser;
pub mod normalizer;
pub mod classifier;
pub mod hierarchy;
pub mod review;
pub mod db;
#[cfg(feature = "client")]
pub mod health;

// Re-export commonly used types
pub use config::Settings;
pub use parser::{
    ReportParser, FileValidator,
    RawRecord, SourceType,
    detect_source, get_parser,
    CsvExportParser, TabExportParser, JsonExportParser,
};
pub use normalizer::{
    Normalizer, NormalizedKey, NormalizeRule,
};
pub use classifier::{
    Classifier, AliasBook, Alias, MatchCandidate, MatchKind,
    ConfidenceLevel, ClassificationDecision, ClassificationOutcome, DecisionStatus,
};
pub use hierarchy::{
    AccountNode, AccountTree,
};
pub use review::{
    ReviewQueue, PendingReview, ReviewResolution,
};
pub use db::{
    Event, setup_database,
    save_tree, load_tree, save_aliases, load_aliases,
    insert_record, insert_records, load_record, insert_decision,
    load_decisions_by_status, count_decisions_by_status,
    insert_event, get_events_for_entity, count_records, idempotency_hash,
};
#[cfg(feature = "client")]
pub use health::{HealthProbe, BackendStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
