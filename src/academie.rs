// 🗺️ Académie Classifier - Postal code → académie mapping
// Tables as data: the department map is built once and injected, never ambient

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// ============================================================================
// DEFAULT MAPPING DATA
// ============================================================================

/// Department code → académie name.
///
/// Authoritative domain reference data, reproduced verbatim. Keys are the
/// 2-character department prefix of a postal code, plus `2A`/`2B` for Corsica
/// and at least one 3-digit overseas code (`974`).
///
/// Department `71` is listed under both Dijon and Lyon in the source mapping;
/// this table pins it to Lyon.
const DEPARTMENT_ACADEMIES: &[(&str, &str)] = &[
    ("04", "Aix-Marseille"),
    ("13", "Aix-Marseille"),
    ("83", "Aix-Marseille"),
    ("84", "Aix-Marseille"),
    ("02", "Amiens"),
    ("60", "Amiens"),
    ("80", "Amiens"),
    ("25", "Besançon"),
    ("39", "Besançon"),
    ("70", "Besançon"),
    ("90", "Besançon"),
    ("24", "Bordeaux"),
    ("33", "Bordeaux"),
    ("40", "Bordeaux"),
    ("47", "Bordeaux"),
    ("64", "Bordeaux"),
    // Caen is now part of Normandie, kept under its historical name
    ("14", "Caen"),
    ("50", "Caen"),
    ("61", "Caen"),
    ("03", "Clermont-Ferrand"),
    ("15", "Clermont-Ferrand"),
    ("43", "Clermont-Ferrand"),
    ("63", "Clermont-Ferrand"),
    // 2A/2B are the Corsican department codes; 20 is often used for Corse
    ("2A", "Corse"),
    ("2B", "Corse"),
    ("20", "Corse"),
    ("77", "Créteil"),
    ("93", "Créteil"),
    ("94", "Créteil"),
    ("21", "Dijon"),
    ("58", "Dijon"),
    ("89", "Dijon"),
    ("05", "Grenoble"),
    ("07", "Grenoble"),
    ("26", "Grenoble"),
    ("38", "Grenoble"),
    ("73", "Grenoble"),
    ("74", "Grenoble"),
    ("59", "Lille"),
    ("62", "Lille"),
    ("19", "Limoges"),
    ("23", "Limoges"),
    ("87", "Limoges"),
    ("01", "Lyon"),
    ("69", "Lyon"),
    ("71", "Lyon"),
    ("11", "Montpellier"),
    ("30", "Montpellier"),
    ("34", "Montpellier"),
    ("48", "Montpellier"),
    ("66", "Montpellier"),
    ("54", "Nancy-Metz"),
    ("55", "Nancy-Metz"),
    ("57", "Nancy-Metz"),
    ("88", "Nancy-Metz"),
    ("44", "Nantes"),
    ("49", "Nantes"),
    ("53", "Nantes"),
    ("72", "Nantes"),
    ("85", "Nantes"),
    ("06", "Nice"),
    ("18", "Orléans-Tours"),
    ("28", "Orléans-Tours"),
    ("36", "Orléans-Tours"),
    ("37", "Orléans-Tours"),
    ("41", "Orléans-Tours"),
    ("45", "Orléans-Tours"),
    ("75", "Paris"),
    ("16", "Poitiers"),
    ("17", "Poitiers"),
    ("79", "Poitiers"),
    ("86", "Poitiers"),
    ("08", "Reims"),
    ("10", "Reims"),
    ("51", "Reims"),
    ("52", "Reims"),
    ("22", "Rennes"),
    ("29", "Rennes"),
    ("35", "Rennes"),
    ("56", "Rennes"),
    ("974", "La Réunion"),
    ("67", "Strasbourg"),
    ("68", "Strasbourg"),
    ("09", "Toulouse"),
    ("12", "Toulouse"),
    ("31", "Toulouse"),
    ("32", "Toulouse"),
    ("46", "Toulouse"),
    ("65", "Toulouse"),
    ("81", "Toulouse"),
    ("82", "Toulouse"),
    ("78", "Versailles"),
    ("91", "Versailles"),
    ("92", "Versailles"),
    ("95", "Versailles"),
];

// ============================================================================
// CLASSIFICATION OUTCOME
// ============================================================================

/// Result of classifying one postal code.
///
/// The three unknown variants are distinct on purpose: callers (and the CSV
/// export) need to tell apart a malformed input, a well-formed department the
/// table does not know, and a prefix that is neither numeric nor Corsican.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcademieOutcome {
    /// Postal code resolved to a named académie
    Found(String),

    /// Input shorter than two characters
    InvalidInput,

    /// Well-formed department prefix absent from the table
    UnknownDepartment,

    /// Non-digit, non-Corsica prefix
    NonStandardFormat,
}

impl AcademieOutcome {
    /// Human-readable label, used verbatim in the result table
    pub fn label(&self) -> &str {
        match self {
            AcademieOutcome::Found(name) => name,
            AcademieOutcome::InvalidInput => "Unknown (Invalid Postal Code)",
            AcademieOutcome::UnknownDepartment => "Unknown (Dept. Not Found)",
            AcademieOutcome::NonStandardFormat => "Unknown (Non-standard Postal Code Format)",
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, AcademieOutcome::Found(_))
    }
}

// ============================================================================
// ACADEMIE TABLE
// ============================================================================

/// Immutable department → académie lookup table.
///
/// Constructed once at process start and injected into the pipeline, so tests
/// can substitute alternate tables.
pub struct AcademieTable {
    departments: HashMap<String, String>,
}

impl AcademieTable {
    /// Create an empty table
    pub fn new() -> Self {
        AcademieTable {
            departments: HashMap::new(),
        }
    }

    /// Create the table with the built-in department mapping
    pub fn with_defaults() -> Self {
        let departments = DEPARTMENT_ACADEMIES
            .iter()
            .map(|(dept, academie)| (dept.to_string(), academie.to_string()))
            .collect();

        AcademieTable { departments }
    }

    /// Load an alternate table from a JSON file mapping department codes to
    /// académie names, e.g. `{"75": "Paris", "2A": "Corse"}`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read académie table: {:?}", path.as_ref()))?;

        let departments: HashMap<String, String> =
            serde_json::from_str(&content).context("Failed to parse académie table JSON")?;

        Ok(AcademieTable { departments })
    }

    /// Number of department entries
    pub fn len(&self) -> usize {
        self.departments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty()
    }

    /// Classify a postal code into an académie.
    ///
    /// Takes the first two characters, uppercased. `2A`/`2B` look up directly
    /// (Corsica overrides the numeric rule). Digit prefixes first try the
    /// 3-character prefix against overseas entries (a 2-character prefix
    /// cannot disambiguate `974xx` from a metropolitan `97`), then the
    /// 2-digit table. Never panics, accepts any string.
    pub fn classify(&self, postal_code: &str) -> AcademieOutcome {
        let prefix: String = postal_code
            .chars()
            .take(2)
            .collect::<String>()
            .to_uppercase();

        if prefix.chars().count() < 2 {
            return AcademieOutcome::InvalidInput;
        }

        // Corsica special case
        if prefix == "2A" || prefix == "2B" {
            return match self.departments.get(&prefix) {
                Some(name) => AcademieOutcome::Found(name.clone()),
                None => AcademieOutcome::UnknownDepartment,
            };
        }

        if prefix.chars().all(|c| c.is_ascii_digit()) {
            // Overseas codes are 3 digits and share leading digits with
            // metropolitan codes, so they must be checked first
            let overseas: String = postal_code.chars().take(3).collect();
            if overseas.chars().count() == 3 && overseas.chars().all(|c| c.is_ascii_digit()) {
                if let Some(name) = self.departments.get(&overseas) {
                    return AcademieOutcome::Found(name.clone());
                }
            }

            return match self.departments.get(&prefix) {
                Some(name) => AcademieOutcome::Found(name.clone()),
                None => AcademieOutcome::UnknownDepartment,
            };
        }

        AcademieOutcome::NonStandardFormat
    }
}

impl Default for AcademieTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// TESTS
// ============================================================================
