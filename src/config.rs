// ⚙️ Settings - Runtime configuration from environment variables
// Every knob has a default; a bad env value warns and falls back

use std::env;
use std::path::PathBuf;

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone)]
pub struct Settings {
    /// SQLite database path (default: pos_hierarchy.db)
    pub db_path: PathBuf,

    /// Minimum similarity for a match candidate (default: 0.6)
    pub fuzzy_match_threshold: f64,

    /// Similarity at which a match is accepted without review (default: 0.8)
    pub auto_accept_threshold: f64,

    /// Maximum candidates returned per lookup (default: 10)
    pub max_candidates: usize,

    /// Record classification events to the audit table (default: true)
    pub audit_log_enabled: bool,

    /// Bind address for the API server (default: 0.0.0.0:3000)
    pub server_addr: String,

    /// Health endpoint URL probed by the status command
    pub health_url: String,
}

impl Settings {
    /// Create settings with default values
    pub fn new() -> Self {
        Settings {
            db_path: PathBuf::from("pos_hierarchy.db"),
            fuzzy_match_threshold: 0.6,
            auto_accept_threshold: 0.8,
            max_candidates: 10,
            audit_log_enabled: true,
            server_addr: "0.0.0.0:3000".to_string(),
            health_url: "http://localhost:3000/api/health".to_string(),
        }
    }

    /// Load settings from environment variables, falling back to defaults.
    /// An unparseable value prints a warning instead of aborting.
    pub fn from_env() -> Self {
        let mut settings = Settings::new();

        if let Ok(path) = env::var("POS_DB_PATH") {
            if !path.trim().is_empty() {
                settings.db_path = PathBuf::from(path);
            }
        }

        settings.fuzzy_match_threshold = env_f64(
            "POS_FUZZY_THRESHOLD",
            settings.fuzzy_match_threshold,
        );
        settings.auto_accept_threshold = env_f64(
            "POS_AUTO_ACCEPT_THRESHOLD",
            settings.auto_accept_threshold,
        );
        settings.max_candidates = env_usize(
            "POS_MAX_CANDIDATES",
            settings.max_candidates,
        );
        settings.audit_log_enabled = env_bool(
            "POS_AUDIT_LOG",
            settings.audit_log_enabled,
        );

        if let Ok(addr) = env::var("POS_SERVER_ADDR") {
            if !addr.trim().is_empty() {
                settings.server_addr = addr;
            }
        }
        if let Ok(url) = env::var("POS_HEALTH_URL") {
            if !url.trim().is_empty() {
                settings.health_url = url;
            }
        }

        // Review band must sit below the auto-accept bar
        if settings.fuzzy_match_threshold > settings.auto_accept_threshold {
            eprintln!(
                "⚠️  POS_FUZZY_THRESHOLD ({}) above POS_AUTO_ACCEPT_THRESHOLD ({}), using defaults",
                settings.fuzzy_match_threshold, settings.auto_accept_threshold
            );
            settings.fuzzy_match_threshold = 0.6;
            settings.auto_accept_threshold = 0.8;
        }

        settings
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ENV PARSING HELPERS
// ============================================================================

fn env_f64(key: &str, default: f64) -> f64 {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if (0.0..=1.0).contains(&v) => v,
            _ => {
                eprintln!("⚠️  {} = {:?} is not a number in 0..=1, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<usize>() {
            Ok(v) if v > 0 => v,
            _ => {
                eprintln!("⚠️  {} = {:?} is not a positive integer, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                eprintln!("⚠️  {} = {:?} is not a boolean, using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

// ============================================================================
// TESTS
// ============================================================================
