// 🗂️ POS Account Hierarchy CLI
// import / seed / tree / search / review / status

use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::Connection;
use std::env;
use std::path::Path;

use pos_hierarchy::db::{
    count_decisions_by_status, count_records, insert_decision, insert_event, insert_record,
    load_aliases, load_decisions_by_status, load_record, load_tree, save_aliases, save_tree,
    setup_database, Event,
};
use pos_hierarchy::{
    detect_source, get_parser, AccountTree, Classifier, DecisionStatus, Normalizer, PendingReview,
    ReviewQueue, ReviewResolution, Settings,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            if args.len() < 3 {
                eprintln!("❌ import needs a report file\n");
                print_usage();
                std::process::exit(1);
            }
            run_import(Path::new(&args[2]))
        }
        Some("seed") => run_seed(),
        Some("tree") => run_tree(),
        Some("search") => {
            if args.len() < 3 {
                eprintln!("❌ search needs a customer name\n");
                print_usage();
                std::process::exit(1);
            }
            run_search(&args[2..].join(" "))
        }
        Some("review") => run_review(&args),
        Some("status") => run_status(),
        _ => {
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("POS Account Hierarchy {}", pos_hierarchy::VERSION);
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  pos-hierarchy import <file>                Parse a POS report and classify its names");
    eprintln!("  pos-hierarchy seed                         Plant the starter hierarchy and aliases");
    eprintln!("  pos-hierarchy tree                         Print the account hierarchy with roll-ups");
    eprintln!("  pos-hierarchy search <name>                Rank matching accounts for a name");
    eprintln!("  pos-hierarchy review                       List classifications waiting for review");
    eprintln!("  pos-hierarchy review confirm <id> [node]   Accept the suggestion (or a chosen node)");
    eprintln!("  pos-hierarchy review reject <id>           Reject and file under Unclassified");
    eprintln!("  pos-hierarchy status                       Database counts and backend health");
}

fn open_database(settings: &Settings) -> Result<Connection> {
    let conn = Connection::open(&settings.db_path)?;
    setup_database(&conn)?;
    Ok(conn)
}

// ============================================================================
// IMPORT
// ============================================================================

fn run_import(path: &Path) -> Result<()> {
    let settings = Settings::from_env();

    println!("🗂️  POS Account Hierarchy - Report Import");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Detect and parse the report
    println!("\n📂 Parsing {}...", path.display());
    let source = detect_source(path)?;
    println!("✓ Detected source: {}", source.name());
    let parser = get_parser(source);
    let records = parser.parse(path)?;
    println!("✓ Parsed {} records", records.len());

    // 2. Open database and load current state
    println!("\n🔧 Opening database...");
    let conn = open_database(&settings)?;
    let mut tree = load_tree(&conn)?;
    let mut aliases = load_aliases(&conn)?;
    println!(
        "✓ Database ready ({} accounts, {} aliases)",
        tree.len(),
        aliases.len()
    );

    // 3. Classify the new rows (re-imported rows are skipped, not re-counted)
    println!("\n🧠 Classifying customer names...");
    let classifier = Classifier::from_settings(&settings);
    let mut new_rows = 0;
    let mut duplicates = 0;
    let mut auto_accepted = 0;
    let mut pending = 0;
    let mut rejected = 0;
    let mut new_nodes = 0;

    for record in &records {
        if !insert_record(&conn, record)? {
            duplicates += 1;
            continue;
        }
        new_rows += 1;

        let outcome = classifier.classify_record(record, &mut tree, &mut aliases)?;
        match outcome.decision.status {
            DecisionStatus::AutoAccepted => auto_accepted += 1,
            DecisionStatus::PendingReview => pending += 1,
            DecisionStatus::Rejected => rejected += 1,
        }
        if outcome.decision.created_new_node {
            new_nodes += 1;
        }
        insert_decision(&conn, &outcome.decision)?;
    }

    println!("✓ Auto-accepted: {}", auto_accepted);
    println!("✓ Pending review: {}", pending);
    println!("✓ Rejected: {}", rejected);
    if new_nodes > 0 {
        println!("✓ New accounts created: {}", new_nodes);
    }

    // 4. Persist the updated tree and alias book
    println!("\n💾 Saving...");
    save_tree(&conn, &tree)?;
    save_aliases(&conn, &aliases)?;
    println!("✓ Saved {} accounts, {} aliases", tree.len(), aliases.len());

    let source_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    if settings.audit_log_enabled {
        let event = Event::new(
            "import_completed",
            "source_file",
            &source_name,
            serde_json::json!({
                "rows": records.len(),
                "new": new_rows,
                "duplicates": duplicates,
                "auto_accepted": auto_accepted,
                "pending_review": pending,
                "rejected": rejected,
                "new_nodes": new_nodes,
            }),
            "cli",
        );
        insert_event(&conn, &event)?;
    }

    // 5. Summary
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✅ Import complete: {} rows ({} new, {} duplicates)",
        records.len(),
        new_rows,
        duplicates
    );
    if pending > 0 {
        println!("⚠️  {} name(s) need review: run `pos-hierarchy review`", pending);
    }

    Ok(())
}

// ============================================================================
// SEED
// ============================================================================

const SEED_PATHS: [&[&str]; 5] = [
    &[
        "US Public Sector",
        "US Federal Government",
        "Department of Defense",
        "United States Navy",
    ],
    &[
        "US Public Sector",
        "US Federal Government",
        "Department of Defense",
        "United States Air Force",
    ],
    &[
        "US Public Sector",
        "US Federal Government",
        "Department of Homeland Security",
        "Transportation Security Administration",
    ],
    &[
        "Commercial",
        "Defense Contractors",
        "Prime Contractors",
        "Lockheed Martin Corporation",
    ],
    &[
        "Commercial",
        "Defense Contractors",
        "Prime Contractors",
        "The Boeing Company",
    ],
];

const SEED_ALIASES: [(&str, &str); 10] = [
    ("United States Navy", "USN"),
    ("United States Navy", "US Navy"),
    ("United States Navy", "NAVSEA"),
    ("United States Air Force", "USAF"),
    ("United States Air Force", "Air Force"),
    ("Transportation Security Administration", "TSA"),
    ("Lockheed Martin Corporation", "LMT"),
    ("Lockheed Martin Corporation", "Lockheed"),
    ("The Boeing Company", "Boeing"),
    ("The Boeing Company", "BA"),
];

fn run_seed() -> Result<()> {
    let settings = Settings::from_env();
    let conn = open_database(&settings)?;
    let mut tree = load_tree(&conn)?;
    let mut aliases = load_aliases(&conn)?;

    // 2 = root plus the Unclassified bucket
    if tree.len() > 2 {
        println!(
            "⚠️  Accounts already exist ({}); seed skipped",
            tree.len()
        );
        return Ok(());
    }

    println!("🌱 Planting starter hierarchy...");
    for segments in SEED_PATHS {
        tree.ensure_path(segments)?;
        println!("✓ {}", segments.join(" → "));
    }

    let normalizer = Normalizer::new();
    let mut learned = 0;
    for (account, alias) in SEED_ALIASES {
        let node_id = tree
            .find_by_name(account)
            .map(|n| n.id.clone())
            .ok_or_else(|| anyhow!("Seed account missing: {}", account))?;
        if let Some(key) = normalizer.canonical(alias) {
            aliases.learn(&key, alias, &node_id, "seed");
            learned += 1;
        }
    }
    println!("✓ Learned {} aliases", learned);

    save_tree(&conn, &tree)?;
    save_aliases(&conn, &aliases)?;

    if settings.audit_log_enabled {
        let event = Event::new(
            "seed_completed",
            "tree",
            tree.root_id(),
            serde_json::json!({"accounts": tree.len(), "aliases": aliases.len()}),
            "cli",
        );
        insert_event(&conn, &event)?;
    }

    println!("✅ Seeded {} accounts", tree.len());
    Ok(())
}

// ============================================================================
// TREE
// ============================================================================

fn run_tree() -> Result<()> {
    let settings = Settings::from_env();
    let conn = open_database(&settings)?;
    let tree = load_tree(&conn)?;

    println!("📊 Account Hierarchy");
    println!("━━━━━━━━━━━━━━━━━━━━");
    print_subtree(&tree, tree.root_id(), 0);

    println!(
        "\n{} accounts, {} records, ${:.2} total revenue",
        tree.len(),
        tree.rolled_up_records(tree.root_id()),
        tree.rolled_up_revenue(tree.root_id())
    );
    Ok(())
}

fn print_subtree(tree: &AccountTree, node_id: &str, depth: usize) {
    if let Some(node) = tree.get(node_id) {
        let indent = "  ".repeat(depth);
        let records = tree.rolled_up_records(node_id);
        if records > 0 {
            println!(
                "{}{} ({} records, ${:.2})",
                indent,
                node.name,
                records,
                tree.rolled_up_revenue(node_id)
            );
        } else {
            println!("{}{}", indent, node.name);
        }
        for child in tree.children(node_id) {
            print_subtree(tree, &child.id, depth + 1);
        }
    }
}

// ============================================================================
// SEARCH
// ============================================================================

fn run_search(name: &str) -> Result<()> {
    let settings = Settings::from_env();
    let conn = open_database(&settings)?;
    let tree = load_tree(&conn)?;
    let aliases = load_aliases(&conn)?;
    let classifier = Classifier::from_settings(&settings);

    let results = classifier.search(name, &tree, &aliases);
    if results.is_empty() {
        println!("No matches for \"{}\"", name);
        return Ok(());
    }

    println!("🔍 Matches for \"{}\":", name);
    for candidate in &results {
        if let Some(node) = tree.get(&candidate.node_id) {
            println!(
                "  {:.3}  [{}]  {}  (via {} \"{}\")",
                candidate.score,
                candidate.confidence.as_str(),
                tree.path_string(node),
                candidate.kind.as_str(),
                candidate.matched_text
            );
        }
    }
    Ok(())
}

// ============================================================================
// REVIEW
// ============================================================================

fn run_review(args: &[String]) -> Result<()> {
    match args.get(2).map(String::as_str) {
        None => run_review_list(),
        Some("confirm") => match args.get(3) {
            Some(id) => {
                let resolution = match args.get(4) {
                    Some(node_id) => ReviewResolution::Reassigned {
                        node_id: node_id.clone(),
                    },
                    None => ReviewResolution::Confirmed,
                };
                run_review_resolve(id, resolution)
            }
            None => {
                eprintln!("❌ confirm needs a decision id\n");
                print_usage();
                std::process::exit(1);
            }
        },
        Some("reject") => match args.get(3) {
            Some(id) => run_review_resolve(id, ReviewResolution::RejectedCreateNew),
            None => {
                eprintln!("❌ reject needs a decision id\n");
                print_usage();
                std::process::exit(1);
            }
        },
        Some(other) => {
            eprintln!("❌ Unknown review action: {}\n", other);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn run_review_list() -> Result<()> {
    let settings = Settings::from_env();
    let conn = open_database(&settings)?;
    let tree = load_tree(&conn)?;
    let aliases = load_aliases(&conn)?;
    let classifier = Classifier::from_settings(&settings);

    let pending = load_decisions_by_status(&conn, DecisionStatus::PendingReview)?;
    if pending.is_empty() {
        println!("✓ Review queue is empty");
        return Ok(());
    }

    println!("📋 {} pending review(s):", pending.len());
    for decision in &pending {
        println!(
            "\n  {}  \"{}\"  (score {:.3}, from {}:{})",
            decision.id, decision.raw_name, decision.score, decision.source_file, decision.line_number
        );
        let suggestions = classifier.search(&decision.raw_name, &tree, &aliases);
        for (i, candidate) in suggestions.iter().take(3).enumerate() {
            if let Some(node) = tree.get(&candidate.node_id) {
                println!(
                    "    {}. {:.3}  {}  [{}]",
                    i + 1,
                    candidate.score,
                    tree.path_string(node),
                    node.id
                );
            }
        }
    }

    println!("\nResolve with: pos-hierarchy review confirm <id> [node-id]");
    println!("          or: pos-hierarchy review reject <id>");
    Ok(())
}

fn run_review_resolve(decision_id: &str, resolution: ReviewResolution) -> Result<()> {
    let settings = Settings::from_env();
    let conn = open_database(&settings)?;
    let mut tree = load_tree(&conn)?;
    let mut aliases = load_aliases(&conn)?;
    let classifier = Classifier::from_settings(&settings);

    let pending = load_decisions_by_status(&conn, DecisionStatus::PendingReview)?;
    let decision = pending
        .iter()
        .find(|d| d.id == decision_id)
        .cloned()
        .ok_or_else(|| anyhow!("No pending review with id: {}", decision_id))?;

    let record = load_record(
        &conn,
        &decision.source_file,
        decision.line_number,
        &decision.raw_name,
    )?
    .ok_or_else(|| anyhow!("Record for decision {} is missing", decision_id))?;

    // Rebuild the in-memory queue entry from the stored decision
    let candidates = classifier.search(&decision.raw_name, &tree, &aliases);
    let mut queue = ReviewQueue::new();
    queue.enqueue(PendingReview {
        decision,
        candidates,
        record,
        queued_at: Utc::now(),
    });

    let resolved = queue.resolve(decision_id, resolution, &mut tree, &mut aliases)?;

    insert_decision(&conn, &resolved)?;
    save_tree(&conn, &tree)?;
    save_aliases(&conn, &aliases)?;

    if settings.audit_log_enabled {
        let event = Event::new(
            "review_resolved",
            "decision",
            &resolved.id,
            serde_json::json!({
                "raw_name": resolved.raw_name,
                "status": resolved.status.as_str(),
                "node_id": resolved.node_id,
                "created_new_node": resolved.created_new_node,
            }),
            "cli",
        );
        insert_event(&conn, &event)?;
    }

    match resolved.node_id.as_deref().and_then(|id| tree.get(id)) {
        Some(node) => println!(
            "✅ \"{}\" → {}",
            resolved.raw_name,
            tree.path_string(node)
        ),
        None => println!("✅ Resolved decision {}", resolved.id),
    }
    Ok(())
}

// ============================================================================
// STATUS
// ============================================================================

fn run_status() -> Result<()> {
    let settings = Settings::from_env();
    let conn = open_database(&settings)?;
    let tree = load_tree(&conn)?;
    let aliases = load_aliases(&conn)?;

    println!("📊 POS Account Hierarchy - Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Database:        {}", settings.db_path.display());
    println!("  Accounts:        {}", tree.len());
    println!("  Aliases:         {}", aliases.len());
    println!("  Records:         {}", count_records(&conn)?);
    println!(
        "  Pending reviews: {}",
        count_decisions_by_status(&conn, DecisionStatus::PendingReview)?
    );
    println!();
    print_backend_status(&settings);
    Ok(())
}

#[cfg(feature = "client")]
fn print_backend_status(settings: &Settings) {
    let status = pos_hierarchy::HealthProbe::from_settings(settings).probe();
    println!("  {}", status.display());
}

#[cfg(not(feature = "client"))]
fn print_backend_status(_settings: &Settings) {
    eprintln!("  Backend probe not available");
    eprintln!("  Rebuild with: cargo build --features client");
}
