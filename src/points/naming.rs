//! Output naming strategy for per-point exports

use lazy_static::lazy_static;
use regex::Regex;

use super::PointRecord;

lazy_static! {
    /// Characters that have no business in a file stem
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_\-.]").unwrap();
    /// Runs of whitespace, collapsed to single underscores
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Derives a filesystem-safe output stem for each point record
///
/// The identifier is taken from the first non-empty column in the
/// configured precedence list (default `id`, then `school_id`); when none
/// match, a `pt<row>` index is synthesized. The display part comes from
/// the `name` column, falling back to `site`.
pub struct NamingStrategy {
    id_columns: Vec<String>,
}

impl NamingStrategy {
    /// Strategy with the default identifier precedence
    pub fn new() -> Self {
        NamingStrategy {
            id_columns: vec!["id".to_string(), "school_id".to_string()],
        }
    }

    /// Strategy with a caller-supplied identifier column precedence
    pub fn with_id_columns(id_columns: Vec<String>) -> Self {
        NamingStrategy { id_columns }
    }

    /// Derive the output stem for a record
    ///
    /// `row_index` is the zero-based position of the record in its file,
    /// used when no identifier column resolves.
    pub fn stem(&self, record: &PointRecord, row_index: usize) -> String {
        let id = self.id_columns.iter()
            .find_map(|column| record.column(column))
            .map(str::to_string)
            .unwrap_or_else(|| format!("pt{}", row_index + 1));

        let name = record.column("name").unwrap_or("site");
        sanitize(&format!("{}_{}", name, id))
    }
}

impl Default for NamingStrategy {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse whitespace to underscores and strip unsafe characters
fn sanitize(raw: &str) -> String {
    let collapsed = WHITESPACE.replace_all(raw.trim(), "_");
    UNSAFE_CHARS.replace_all(&collapsed, "").to_string()
}
