// 💾 SQLite Persistence - Accounts, aliases, records, decisions, audit events
// The records table is an append-only idempotency ledger; the tree and the
// alias book are saved whole and rebuilt on load

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::classifier::{Alias, AliasBook, ClassificationDecision, DecisionStatus};
use crate::hierarchy::{AccountNode, AccountTree};
use crate::parser::{RawRecord, SourceType};

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Accounts Table (the hierarchy; parent_id is NULL only on the root)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            canonical_name TEXT NOT NULL,
            parent_id TEXT,
            record_count INTEGER NOT NULL DEFAULT 0,
            total_revenue REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            metadata TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Aliases Table (learned name variants; one row per canonical key)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS aliases (
            alias_key TEXT PRIMARY KEY,
            raw_alias TEXT NOT NULL,
            node_id TEXT NOT NULL,
            learned_from TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Records Table (imported report rows, deduplicated by idempotency hash)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            idempotency_hash TEXT UNIQUE NOT NULL,
            raw_name TEXT NOT NULL,
            product TEXT,
            quantity REAL,
            revenue REAL,
            period TEXT,
            source_type TEXT NOT NULL,
            source_file TEXT NOT NULL,
            line_number INTEGER NOT NULL,
            raw_line TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Decisions Table (classification outcomes; canonical_key NULL on rejects)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS decisions (
            id TEXT PRIMARY KEY,
            raw_name TEXT NOT NULL,
            canonical_key TEXT,
            node_id TEXT,
            matched_text TEXT,
            score REAL NOT NULL,
            status TEXT NOT NULL,
            created_new_node INTEGER NOT NULL DEFAULT 0,
            source_file TEXT NOT NULL,
            line_number INTEGER NOT NULL,
            decided_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail / event sourcing)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_parent ON accounts(parent_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_canonical ON accounts(canonical_name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_aliases_node ON aliases(node_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_records_hash ON records(idempotency_hash)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_decisions_status ON decisions(status)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// RECORDS
// ============================================================================

/// Compute the idempotency hash for duplicate detection.
/// NOTE: same file + same line + same name = same row, no matter how often
/// the report is re-imported.
pub fn idempotency_hash(record: &RawRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!(
        "{}|{}|{}",
        record.source_file, record.line_number, record.raw_name
    ));
    format!("{:x}", hasher.finalize())
}

/// Insert one record. Returns false when the row was already imported.
pub fn insert_record(conn: &Connection, record: &RawRecord) -> Result<bool> {
    let hash = idempotency_hash(record);

    let result = conn.execute(
        "INSERT INTO records (
            idempotency_hash, raw_name, product, quantity, revenue,
            period, source_type, source_file, line_number, raw_line
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            hash,
            record.raw_name,
            record.product,
            record.quantity,
            record.revenue,
            record.period,
            record.source_type.code(),
            record.source_file,
            record.line_number as i64,
            record.raw_line,
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Insert records, skipping rows already seen. Returns how many were new.
pub fn insert_records(conn: &Connection, records: &[RawRecord]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for record in records {
        if insert_record(conn, record)? {
            inserted += 1;
        } else {
            duplicates += 1;
        }
    }

    println!("✓ Inserted: {} records", inserted);
    println!("✓ Skipped duplicates: {}", duplicates);

    Ok(inserted)
}

/// Fetch one stored record by its provenance triple
pub fn load_record(
    conn: &Connection,
    source_file: &str,
    line_number: usize,
    raw_name: &str,
) -> Result<Option<RawRecord>> {
    let mut stmt = conn.prepare(
        "SELECT raw_name, product, quantity, revenue, period,
                source_type, source_file, line_number, raw_line
         FROM records
         WHERE source_file = ?1 AND line_number = ?2 AND raw_name = ?3",
    )?;

    let mut rows = stmt.query_map(
        params![source_file, line_number as i64, raw_name],
        |row| {
            let source_code: String = row.get(5)?;
            let line: i64 = row.get(7)?;

            Ok(RawRecord {
                raw_name: row.get(0)?,
                product: row.get(1)?,
                quantity: row.get(2)?,
                revenue: row.get(3)?,
                period: row.get(4)?,
                source_type: SourceType::from_code(&source_code)
                    .ok_or(rusqlite::Error::InvalidQuery)?,
                source_file: row.get(6)?,
                line_number: line as usize,
                raw_line: row.get(8)?,
            })
        },
    )?;

    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn count_records(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// ACCOUNT TREE
// ============================================================================

/// Persist the whole tree, replacing whatever was stored before.
/// The delete and every insert run in one transaction: a save that fails
/// partway rolls back and the previous tree stays readable.
pub fn save_tree(conn: &Connection, tree: &AccountTree) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute("DELETE FROM accounts", [])?;

    for node in tree.all_nodes() {
        let metadata_json = serde_json::to_string(&node.metadata)?;

        tx.execute(
            "INSERT INTO accounts (
                id, name, canonical_name, parent_id, record_count,
                total_revenue, created_at, metadata
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                node.id,
                node.name,
                node.canonical_name,
                node.parent_id,
                node.record_count as i64,
                node.total_revenue,
                node.created_at.to_rfc3339(),
                metadata_json,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Rebuild the tree from storage. An empty table yields a fresh tree
/// so first runs need no seeding step.
pub fn load_tree(conn: &Connection) -> Result<AccountTree> {
    let mut stmt = conn.prepare(
        "SELECT id, name, canonical_name, parent_id, record_count,
                total_revenue, created_at, metadata
         FROM accounts",
    )?;

    let nodes = stmt
        .query_map([], |row| {
            let record_count: i64 = row.get(4)?;
            let created_at_str: String = row.get(6)?;
            let metadata_json: Option<String> = row.get(7)?;

            Ok(AccountNode {
                id: row.get(0)?,
                name: row.get(1)?,
                canonical_name: row.get(2)?,
                parent_id: row.get(3)?,
                record_count: record_count as u64,
                total_revenue: row.get(5)?,
                created_at: DateTime::parse_from_rfc3339(&created_at_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                metadata: metadata_json
                    .and_then(|json| serde_json::from_str(&json).ok())
                    .unwrap_or_else(|| serde_json::json!({})),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if nodes.is_empty() {
        return Ok(AccountTree::new());
    }

    AccountTree::from_nodes(nodes)
}

// ============================================================================
// ALIASES
// ============================================================================

/// Persist the alias book, replacing whatever was stored before.
/// Transactional like save_tree: all rows land or none do.
pub fn save_aliases(conn: &Connection, aliases: &AliasBook) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute("DELETE FROM aliases", [])?;

    for alias in aliases.all() {
        tx.execute(
            "INSERT INTO aliases (
                alias_key, raw_alias, node_id, learned_from, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                alias.alias_key,
                alias.raw_alias,
                alias.node_id,
                alias.learned_from,
                alias.created_at.to_rfc3339(),
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

pub fn load_aliases(conn: &Connection) -> Result<AliasBook> {
    let mut stmt = conn.prepare(
        "SELECT alias_key, raw_alias, node_id, learned_from, created_at
         FROM aliases",
    )?;

    let aliases = stmt
        .query_map([], |row| {
            let created_at_str: String = row.get(4)?;

            Ok(Alias {
                alias_key: row.get(0)?,
                raw_alias: row.get(1)?,
                node_id: row.get(2)?,
                learned_from: row.get(3)?,
                created_at: DateTime::parse_from_rfc3339(&created_at_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AliasBook::from_aliases(aliases))
}

// ============================================================================
// DECISIONS
// ============================================================================

pub fn insert_decision(conn: &Connection, decision: &ClassificationDecision) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO decisions (
            id, raw_name, canonical_key, node_id, matched_text,
            score, status, created_new_node, source_file, line_number, decided_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            decision.id,
            decision.raw_name,
            decision.canonical_key,
            decision.node_id,
            decision.matched_text,
            decision.score,
            decision.status.as_str(),
            decision.created_new_node as i64,
            decision.source_file,
            decision.line_number as i64,
            decision.decided_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

pub fn load_decisions_by_status(
    conn: &Connection,
    status: DecisionStatus,
) -> Result<Vec<ClassificationDecision>> {
    let mut stmt = conn.prepare(
        "SELECT id, raw_name, canonical_key, node_id, matched_text,
                score, status, created_new_node, source_file, line_number, decided_at
         FROM decisions
         WHERE status = ?1
         ORDER BY decided_at ASC",
    )?;

    let decisions = stmt
        .query_map(params![status.as_str()], |row| {
            let status_str: String = row.get(6)?;
            let created_new_node: i64 = row.get(7)?;
            let line_number: i64 = row.get(9)?;
            let decided_at_str: String = row.get(10)?;

            Ok(ClassificationDecision {
                id: row.get(0)?,
                raw_name: row.get(1)?,
                canonical_key: row.get(2)?,
                node_id: row.get(3)?,
                matched_text: row.get(4)?,
                score: row.get(5)?,
                status: DecisionStatus::parse(&status_str).ok_or(rusqlite::Error::InvalidQuery)?,
                created_new_node: created_new_node != 0,
                source_file: row.get(8)?,
                line_number: line_number as usize,
                decided_at: DateTime::parse_from_rfc3339(&decided_at_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(decisions)
}

pub fn count_decisions_by_status(conn: &Connection, status: DecisionStatus) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM decisions WHERE status = ?1",
        params![status.as_str()],
        |row| row.get(0),
    )?;

    Ok(count)
}

// ============================================================================
// AUDIT EVENTS
// ============================================================================

/// Audit trail entry: every import and every review resolution is an event
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}
