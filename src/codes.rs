//! NWIS code registry: parameter, statistic and site type codes.
//!
//! The reference list lives in `codes.toml`, embedded at compile time and
//! parsed once into an immutable lookup keyed by code. A custom list can
//! be supplied with `CodeTable::from_toml_str`. Tables are never mutated
//! after construction, so a shared `Arc<CodeTable>` is safe to read from
//! any thread.

use crate::logging::{self, DataSource};
use crate::model::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

const BUILTIN_CODES: &str = include_str!("codes.toml");

/// Separator between code and name in composite choice strings.
const COMPOSITE_SEPARATOR: &str = " - ";

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One reference code with its display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub code: String,
    #[serde(rename = "group")]
    pub group_name: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub description: String,
}

impl CodeEntry {
    /// `"code - name"`, the form offered to users when choosing a code.
    pub fn composite(&self) -> String {
        format!("{}{}{}", self.code, COMPOSITE_SEPARATOR, self.display_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Parameter,
    Statistic,
    SiteType,
}

impl CodeKind {
    fn table_name(self) -> &'static str {
        match self {
            CodeKind::Parameter => "parameters",
            CodeKind::Statistic => "statistics",
            CodeKind::SiteType => "site_types",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CodeFile {
    #[serde(default)]
    parameters: Vec<CodeEntry>,
    #[serde(default)]
    statistics: Vec<CodeEntry>,
    #[serde(default)]
    site_types: Vec<CodeEntry>,
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CodeTable {
    parameters: BTreeMap<String, CodeEntry>,
    statistics: BTreeMap<String, CodeEntry>,
    site_types: BTreeMap<String, CodeEntry>,
}

static BUILTIN: OnceLock<Result<Arc<CodeTable>, ConfigurationError>> = OnceLock::new();

impl CodeTable {
    /// The embedded reference table, parsed on first use.
    pub fn builtin() -> Result<Arc<CodeTable>, ConfigurationError> {
        BUILTIN
            .get_or_init(|| {
                let table = CodeTable::from_toml_str(BUILTIN_CODES)?;
                logging::debug(
                    DataSource::Codes,
                    None,
                    &format!(
                        "Loaded {} parameter, {} statistic, {} site type codes",
                        table.parameters.len(),
                        table.statistics.len(),
                        table.site_types.len()
                    ),
                );
                Ok(Arc::new(table))
            })
            .clone()
    }

    /// Builds a table from TOML with `[[parameters]]`, `[[statistics]]` and
    /// `[[site_types]]` arrays. Empty or duplicate codes are rejected.
    pub fn from_toml_str(text: &str) -> Result<CodeTable, ConfigurationError> {
        let file: CodeFile = toml::from_str(text)
            .map_err(|e| ConfigurationError::single("codes", format!("Failed to parse code table: {}", e)))?;

        let mut errors = ConfigurationError::new();
        let parameters = index(CodeKind::Parameter, file.parameters, &mut errors);
        let statistics = index(CodeKind::Statistic, file.statistics, &mut errors);
        let site_types = index(CodeKind::SiteType, file.site_types, &mut errors);
        errors.into_result()?;

        Ok(CodeTable {
            parameters,
            statistics,
            site_types,
        })
    }

    fn table(&self, kind: CodeKind) -> &BTreeMap<String, CodeEntry> {
        match kind {
            CodeKind::Parameter => &self.parameters,
            CodeKind::Statistic => &self.statistics,
            CodeKind::SiteType => &self.site_types,
        }
    }

    /// Looks up a bare code or a `"code - name"` composite string.
    pub fn lookup(&self, kind: CodeKind, code: &str) -> Option<&CodeEntry> {
        self.table(kind).get(strip_composite(code))
    }

    pub fn parameter(&self, code: &str) -> Option<&CodeEntry> {
        self.lookup(CodeKind::Parameter, code)
    }

    pub fn statistic(&self, code: &str) -> Option<&CodeEntry> {
        self.lookup(CodeKind::Statistic, code)
    }

    pub fn site_type(&self, code: &str) -> Option<&CodeEntry> {
        self.lookup(CodeKind::SiteType, code)
    }

    /// Entries of one kind, ordered by code.
    pub fn entries(&self, kind: CodeKind) -> impl Iterator<Item = &CodeEntry> {
        self.table(kind).values()
    }

    /// `"code - name"` strings for every entry of one kind, ordered by code.
    pub fn composite_choices(&self, kind: CodeKind) -> Vec<String> {
        self.entries(kind).map(CodeEntry::composite).collect()
    }

    /// Reduces caller-supplied codes to bare codes, dropping blanks.
    ///
    /// Codes missing from the table are passed through unchanged; the
    /// service is the authority on which codes exist.
    pub fn normalize(&self, kind: CodeKind, values: &[String]) -> Vec<String> {
        values
            .iter()
            .map(|v| strip_composite(v))
            .filter(|v| !v.is_empty())
            .inspect(|code| {
                if !self.table(kind).contains_key(*code) {
                    logging::debug(
                        DataSource::Codes,
                        None,
                        &format!("{} is not in the {} table", code, kind.table_name()),
                    );
                }
            })
            .map(String::from)
            .collect()
    }
}

/// Strips a `"code - name"` composite string back to the bare code.
/// Plain codes are returned trimmed.
pub fn strip_composite(text: &str) -> &str {
    text.split_once(COMPOSITE_SEPARATOR)
        .map(|(code, _)| code)
        .unwrap_or(text)
        .trim()
}

fn index(
    kind: CodeKind,
    entries: Vec<CodeEntry>,
    errors: &mut ConfigurationError,
) -> BTreeMap<String, CodeEntry> {
    let mut map = BTreeMap::new();
    for (i, mut entry) in entries.into_iter().enumerate() {
        entry.code = entry.code.trim().to_string();
        if entry.code.is_empty() {
            errors.push(kind.table_name(), Some(i), "code is empty");
            continue;
        }
        if map.contains_key(&entry.code) {
            errors.push(kind.table_name(), Some(i), format!("duplicate code {}", entry.code));
            continue;
        }
        map.insert(entry.code.clone(), entry);
    }
    map
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
