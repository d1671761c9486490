// 🏗️ Ingestion Parser - POS report files to raw customer records
// Polymorphic parser system for the report formats the registers export

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceType - Which POS export produced the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    /// Comma-separated with a header row: Customer,Product,Quantity,Revenue,Period
    CsvExport,
    /// Headerless tab-separated legacy register dump
    TabExport,
    /// API-shaped JSON export with a "rows" array
    JsonExport,
}

impl SourceType {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceType::CsvExport => "POS CSV Export",
            SourceType::TabExport => "Legacy Register Dump",
            SourceType::JsonExport => "POS JSON Export",
        }
    }

    /// Short code for internal use
    pub fn code(&self) -> &str {
        match self {
            SourceType::CsvExport => "CSV",
            SourceType::TabExport => "TAB",
            SourceType::JsonExport => "JSON",
        }
    }

    /// Reverse of code(), for records coming back out of storage
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CSV" => Some(SourceType::CsvExport),
            "TAB" => Some(SourceType::TabExport),
            "JSON" => Some(SourceType::JsonExport),
            _ => None,
        }
    }
}

/// RawRecord - Output of parser.parse()
/// One customer row exactly as it appears in the report, before normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Customer name string, verbatim from the source
    pub raw_name: String,

    // Optional enrichment columns (depends on the export)
    pub product: Option<String>,
    pub quantity: Option<f64>,
    pub revenue: Option<f64>,
    pub period: Option<String>,

    // Provenance (always present)
    pub source_type: SourceType,
    pub source_file: String,
    pub line_number: usize,

    /// Original line for debugging
    pub raw_line: String,
}

impl RawRecord {
    /// Create a new RawRecord with required fields
    pub fn new(
        raw_name: String,
        source_type: SourceType,
        source_file: String,
        line_number: usize,
        raw_line: String,
    ) -> Self {
        RawRecord {
            raw_name,
            product: None,
            quantity: None,
            revenue: None,
            period: None,
            source_type,
            source_file,
            line_number,
            raw_line,
        }
    }

    /// Builder pattern: add optional product
    pub fn with_product(mut self, product: String) -> Self {
        self.product = Some(product);
        self
    }

    /// Builder pattern: add optional quantity
    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Builder pattern: add optional revenue
    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue = Some(revenue);
        self
    }

    /// Builder pattern: add optional reporting period
    pub fn with_period(mut self, period: String) -> Self {
        self.period = Some(period);
        self
    }
}

// ============================================================================
// PARSER TRAITS
// ============================================================================

/// ReportParser - Core trait (minimal, required)
///
/// Adding a new export format means implementing this trait;
/// existing parsers stay untouched.
pub trait ReportParser: Send + Sync {
    /// Parse a report file and return raw customer records.
    /// Rows with an empty customer cell are skipped, not errors.
    fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>>;

    /// Get the source type this parser handles
    fn source_type(&self) -> SourceType;

    /// Get parser version (for provenance tracking)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

/// FileValidator - Optional capability: check if parser can handle a file
pub trait FileValidator {
    /// Cheap check before parsing (extension, not content)
    fn can_parse(&self, file_path: &Path) -> bool;
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Detect export format from the filename.
///
/// Legacy register dumps sometimes arrive as .csv files named
/// "legacy_*", so the name pattern wins over the extension.
pub fn detect_source(file_path: &Path) -> Result<SourceType> {
    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let filename_lower = filename.to_lowercase();

    if filename_lower.ends_with(".json") {
        return Ok(SourceType::JsonExport);
    }

    if filename_lower.contains("legacy")
        || filename_lower.ends_with(".tsv")
        || filename_lower.ends_with(".txt")
    {
        return Ok(SourceType::TabExport);
    }

    if filename_lower.ends_with(".csv") {
        return Ok(SourceType::CsvExport);
    }

    Err(anyhow::anyhow!(
        "Could not detect report format from filename: {}",
        filename
    ))
}

/// Get appropriate parser for a source type
pub fn get_parser(source_type: SourceType) -> Box<dyn ReportParser> {
    match source_type {
        SourceType::CsvExport => Box::new(CsvExportParser::new()),
        SourceType::TabExport => Box::new(TabExportParser::new()),
        SourceType::JsonExport => Box::new(JsonExportParser::new()),
    }
}

/// Number cell cleanup shared by the tabular parsers:
/// strips currency sign and thousands separators
fn parse_number(cell: &str) -> Option<f64> {
    let cleaned = cell.trim().trim_start_matches('$').replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn file_name_of(file_path: &Path, fallback: &str) -> String {
    file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(fallback)
        .to_string()
}

// ============================================================================
// CSV EXPORT PARSER
// ============================================================================

/// Standard POS CSV export: header row, then
/// Customer,Product,Quantity,Revenue,Period
pub struct CsvExportParser;

impl CsvExportParser {
    pub fn new() -> Self {
        CsvExportParser
    }
}

impl ReportParser for CsvExportParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>> {
        use csv::ReaderBuilder;
        use std::fs::File;

        let file = File::open(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut records = Vec::new();
        let filename = file_name_of(file_path, "unknown.csv");

        for (line_num, result) in reader.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse CSV line {} in {}", line_num + 2, filename)
            })?;

            // Example: "United States Navy","Radar Systems","12","4500000.00","2024-Q4"
            let customer = record.get(0).unwrap_or("").trim().to_string();
            if customer.is_empty() {
                continue;
            }

            let raw_line = record.iter().collect::<Vec<_>>().join(",");

            let mut rec = RawRecord::new(
                customer,
                SourceType::CsvExport,
                filename.clone(),
                line_num + 2, // +2 because: 1-indexed + header row
                raw_line,
            );

            if let Some(product) = record.get(1).map(str::trim).filter(|s| !s.is_empty()) {
                rec = rec.with_product(product.to_string());
            }
            if let Some(quantity) = record.get(2).and_then(parse_number) {
                rec = rec.with_quantity(quantity);
            }
            if let Some(revenue) = record.get(3).and_then(parse_number) {
                rec = rec.with_revenue(revenue);
            }
            if let Some(period) = record.get(4).map(str::trim).filter(|s| !s.is_empty()) {
                rec = rec.with_period(period.to_string());
            }

            records.push(rec);
        }

        Ok(records)
    }

    fn source_type(&self) -> SourceType {
        SourceType::CsvExport
    }
}

impl FileValidator for CsvExportParser {
    fn can_parse(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }
}

// ============================================================================
// TAB EXPORT PARSER
// ============================================================================

/// Legacy register dump: no header, tab-separated
/// customer<TAB>revenue<TAB>period
pub struct TabExportParser;

impl TabExportParser {
    pub fn new() -> Self {
        TabExportParser
    }
}

impl ReportParser for TabExportParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>> {
        use csv::ReaderBuilder;
        use std::fs::File;

        let file = File::open(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(file);

        let mut records = Vec::new();
        let filename = file_name_of(file_path, "unknown.tsv");

        for (line_num, result) in reader.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse line {} in {}", line_num + 1, filename)
            })?;

            let customer = record.get(0).unwrap_or("").trim().to_string();
            if customer.is_empty() {
                continue;
            }

            let raw_line = record.iter().collect::<Vec<_>>().join("\t");

            let mut rec = RawRecord::new(
                customer,
                SourceType::TabExport,
                filename.clone(),
                line_num + 1, // 1-indexed, no header row
                raw_line,
            );

            if let Some(revenue) = record.get(1).and_then(parse_number) {
                rec = rec.with_revenue(revenue);
            }
            if let Some(period) = record.get(2).map(str::trim).filter(|s| !s.is_empty()) {
                rec = rec.with_period(period.to_string());
            }

            records.push(rec);
        }

        Ok(records)
    }

    fn source_type(&self) -> SourceType {
        SourceType::TabExport
    }
}

impl FileValidator for TabExportParser {
    fn can_parse(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("tsv") || e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false)
    }
}

// ============================================================================
// JSON EXPORT PARSER
// ============================================================================

/// POS JSON export: { "rows": [...] } or a bare top-level array.
/// Each row: { "customer": "...", "product": ..., "quantity": ...,
///             "revenue": ..., "period": ... }
pub struct JsonExportParser;

impl JsonExportParser {
    pub fn new() -> Self {
        JsonExportParser
    }
}

impl ReportParser for JsonExportParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<RawRecord>> {
        use serde_json::Value;
        use std::fs::File;
        use std::io::BufReader;

        let file = File::open(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

        let reader = BufReader::new(file);
        let json: Value = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse JSON from {}", file_path.display()))?;

        let filename = file_name_of(file_path, "unknown.json");

        let rows = if let Some(rows) = json.get("rows").and_then(|d| d.as_array()) {
            rows
        } else if let Some(rows) = json.as_array() {
            rows
        } else {
            return Err(anyhow::anyhow!(
                "JSON in {} has no 'rows' array",
                filename
            ));
        };

        let mut records = Vec::new();

        for (idx, item) in rows.iter().enumerate() {
            let customer = item
                .get("customer")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string();
            if customer.is_empty() {
                continue;
            }

            let raw_line = serde_json::to_string(item).unwrap_or_else(|_| "{}".to_string());

            let mut rec = RawRecord::new(
                customer,
                SourceType::JsonExport,
                filename.clone(),
                idx + 1, // JSON array index (1-based for consistency)
                raw_line,
            );

            if let Some(product) = item.get("product").and_then(|v| v.as_str()) {
                if !product.trim().is_empty() {
                    rec = rec.with_product(product.trim().to_string());
                }
            }
            if let Some(quantity) = item.get("quantity").and_then(|v| v.as_f64()) {
                rec = rec.with_quantity(quantity);
            }
            if let Some(revenue) = item.get("revenue").and_then(|v| v.as_f64()) {
                rec = rec.with_revenue(revenue);
            }
            if let Some(period) = item.get("period").and_then(|v| v.as_str()) {
                if !period.trim().is_empty() {
                    rec = rec.with_period(period.trim().to_string());
                }
            }

            records.push(rec);
        }

        Ok(records)
    }

    fn source_type(&self) -> SourceType {
        SourceType::JsonExport
    }
}

impl FileValidator for JsonExportParser {
    fn can_parse(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}

// ============================================================================
// TESTS
// ============================================================================
