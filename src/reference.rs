// 📚 Reference Directory - Canonicalization + Search Index
// Normalizes the annuaire's heterogeneous headers and derives one composite
// search string per record for fuzzy lookup

use crate::io::RawTable;
use log::warn;
use serde::{Deserialize, Serialize};

// ============================================================================
// HEADER ALIAS TABLES
// ============================================================================
// Known spellings for each canonical field, compared case-insensitively after
// separator normalization. Declaration order is the precedence order: when a
// file carries several aliasing headers at once, the first alias listed here
// that matches a header supplies the column.

const NAME_ALIASES: &[&str] = &["NOM_ETABLISSEMENT", "LIBELLE_ETABLISSEMENT"];

const POSTAL_ALIASES: &[&str] = &["CODE_POSTAL"];

const UAI_ALIASES: &[&str] = &[
    "UAI",
    "IDENTIFIANT_ETABLISSEMENT",
    "IDENTIFIANT_DE_L_ETABLISSEMENT",
];

const ADDRESS_ALIASES: &[&str] = &[
    "ADRESSE_ETABLISSEMENT",
    "LIBELLE_VOIE",
    "ADRESSE_LIGNE_1",
    "ADRESSE_LIGNE1",
    "ADRESSE1",
    "LIEU_DIT_OU_BP",
    "ADRESSE",
    "ADRESSE_POSTALE",
    "LOCALISATION",
    "ADRESSE_DE_L_ETABLISSEMENT",
    "ADRESSE_DE_L_ÉTABLISSEMENT",
    "ADRESSE_COMPLETE",
    "ADRESSE_REF",
    // English spellings sometimes appear in exports
    "STREET",
    "ADDRESS",
];

// ============================================================================
// RECORD & INDEX TYPES
// ============================================================================

/// One canonicalized row of the reference directory.
/// Built once at load time, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub name: String,
    pub postal_code: String,
    pub address: String,
    pub uai: String,
}

/// One searchable entry, positionally parallel to the record table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEntry {
    /// Index of the record this entry maps back to
    pub record_index: usize,

    /// `trim(name + " " + address + " " + postal_code)`, missing fields empty
    pub search_string: String,
}

/// Ordered collection of composite search strings.
///
/// Invariant: length equals the reference record count; entry `i` maps back
/// to exactly one record by position. Rebuilt on reference (re)load, never
/// mutated incrementally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
}

impl SearchIndex {
    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalized reference table plus its parallel search index, ready for
/// repeated querying. Read-only for the rest of the process lifetime;
/// reloading means building a fresh value and rebinding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceIndex {
    records: Vec<ReferenceRecord>,
    index: SearchIndex,
}

impl ReferenceIndex {
    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&ReferenceRecord> {
        self.records.get(index)
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// ERRORS & WARNINGS
// ============================================================================

/// Fatal build failure: the pipeline must not start on one of these
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceError {
    /// Required columns still missing after header normalization
    MissingColumns(Vec<String>),
}

impl std::fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceError::MissingColumns(cols) => write!(
                f,
                "Reference file is missing essential column(s) after normalization: {}",
                cols.join(", ")
            ),
        }
    }
}

impl std::error::Error for ReferenceError {}

/// Non-fatal quality finding surfaced to the caller alongside the built index
#[derive(Debug, Clone, PartialEq)]
pub struct QualityWarning {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)
    }
}

// ============================================================================
// INDEX BUILDER
// ============================================================================

/// Builds the canonical record table and its composite-string index from a
/// raw reference table with arbitrary, unnormalized headers.
///
/// Runs once per reference-load event, not per query.
pub struct ReferenceIndexBuilder;

impl ReferenceIndexBuilder {
    pub fn new() -> Self {
        ReferenceIndexBuilder
    }

    /// Canonicalize the table and derive the search index.
    ///
    /// Missing name/postal-code/UAI columns are fatal and reported together
    /// in one error. A missing address column degrades to empty addresses
    /// with a single warning.
    pub fn build(
        &self,
        table: &RawTable,
    ) -> Result<(ReferenceIndex, Vec<QualityWarning>), ReferenceError> {
        let name_col = find_column(&table.headers, NAME_ALIASES);
        let postal_col = find_column(&table.headers, POSTAL_ALIASES);
        let uai_col = find_column(&table.headers, UAI_ALIASES);
        let address_col = find_column(&table.headers, ADDRESS_ALIASES);

        let mut missing = Vec::new();
        if name_col.is_none() {
            missing.push("establishment name (e.g., Nom_etablissement)".to_string());
        }
        if postal_col.is_none() {
            missing.push("postal code (e.g., Code_postal)".to_string());
        }
        if uai_col.is_none() {
            missing.push("identifier (e.g., Identifiant_de_l_etablissement)".to_string());
        }
        if !missing.is_empty() {
            return Err(ReferenceError::MissingColumns(missing));
        }

        let mut warnings = Vec::new();
        if address_col.is_none() {
            let warning = QualityWarning {
                field: "address".to_string(),
                message: "No standard address column found in reference file; \
                          fuzzy matching quality might be reduced"
                    .to_string(),
            };
            warn!("{}", warning);
            warnings.push(warning);
        }

        let name_col = name_col.unwrap_or_default();
        let postal_col = postal_col.unwrap_or_default();
        let uai_col = uai_col.unwrap_or_default();

        let mut records = Vec::with_capacity(table.rows.len());
        let mut entries = Vec::with_capacity(table.rows.len());

        for (record_index, row) in table.rows.iter().enumerate() {
            let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");

            let record = ReferenceRecord {
                name: cell(name_col).to_string(),
                postal_code: cell(postal_col).to_string(),
                address: address_col.map(|c| cell(c).to_string()).unwrap_or_default(),
                uai: cell(uai_col).to_string(),
            };

            entries.push(SearchEntry {
                record_index,
                search_string: composite_search_string(&record),
            });
            records.push(record);
        }

        let reference = ReferenceIndex {
            records,
            index: SearchIndex { entries },
        };

        Ok((reference, warnings))
    }
}

impl Default for ReferenceIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Replace spaces, hyphens and periods in a header name with underscores
pub fn normalize_header(raw: &str) -> String {
    raw.replace([' ', '-', '.'], "_")
}

/// Find the column matching one of the given aliases.
///
/// Aliases are tried in declaration order and compared case-insensitively
/// against the normalized header, so the first alias wins when several
/// aliasing headers are present simultaneously.
fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    for alias in aliases {
        for (idx, header) in headers.iter().enumerate() {
            if normalize_header(header).to_uppercase() == *alias {
                return Some(idx);
            }
        }
    }
    None
}

/// `trim(name + " " + address + " " + postal_code)` with missing fields empty
fn composite_search_string(record: &ReferenceRecord) -> String {
    format!(
        "{} {} {}",
        record.name, record.address, record.postal_code
    )
    .trim()
    .to_string()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_build_with_canonical_headers() {
        let raw = table(
            &[
                "Nom_etablissement",
                "Code_postal",
                "Identifiant_de_l_etablissement",
                "Adresse",
            ],
            &[&["Ecole Jean Moulin", "75015", "0750001A", "12 Rue de Vaugirard"]],
        );

        let (reference, warnings) = ReferenceIndexBuilder::new().build(&raw).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(reference.len(), 1);

        let record = reference.record(0).unwrap();
        assert_eq!(record.name, "Ecole Jean Moulin");
        assert_eq!(record.postal_code, "75015");
        assert_eq!(record.address, "12 Rue de Vaugirard");
        assert_eq!(record.uai, "0750001A");

        assert_eq!(
            reference.index().entries()[0].search_string,
            "Ecole Jean Moulin 12 Rue de Vaugirard 75015"
        );
    }

    #[test]
    fn test_header_separator_normalization() {
        // Spaces, hyphens and periods all collapse to underscores
        let raw = table(
            &["Nom etablissement", "Code-postal", "Identifiant.etablissement"],
            &[&["Lycée Colbert", "59000", "0590111X"]],
        );

        let (reference, _) = ReferenceIndexBuilder::new().build(&raw).unwrap();
        let record = reference.record(0).unwrap();
        assert_eq!(record.name, "Lycée Colbert");
        assert_eq!(record.uai, "0590111X");
    }

    #[test]
    fn test_alias_match_is_case_insensitive() {
        let raw = table(
            &["LIBELLE_ETABLISSEMENT", "code_postal", "uai", "libelle_voie"],
            &[&["College Anatole France", "13001", "0130222Y", "5 rue des Lices"]],
        );

        let (reference, warnings) = ReferenceIndexBuilder::new().build(&raw).unwrap();

        assert!(warnings.is_empty());
        let record = reference.record(0).unwrap();
        assert_eq!(record.name, "College Anatole France");
        assert_eq!(record.address, "5 rue des Lices");
    }

    #[test]
    fn test_address_alias_precedence_is_declaration_order() {
        // Both an ADRESSE and a LIBELLE_VOIE column are present;
        // LIBELLE_VOIE is declared earlier in the alias table, so it wins
        // regardless of column position in the file.
        let raw = table(
            &["Nom_etablissement", "Code_postal", "UAI", "Adresse", "Libelle_voie"],
            &[&["Ecole du Parc", "69003", "0690333Z", "BP 12", "8 avenue des Frères Lumière"]],
        );

        let (reference, _) = ReferenceIndexBuilder::new().build(&raw).unwrap();
        assert_eq!(
            reference.record(0).unwrap().address,
            "8 avenue des Frères Lumière"
        );
    }

    #[test]
    fn test_missing_required_columns_are_aggregated() {
        let raw = table(&["Adresse"], &[&["3 rue des Ecoles"]]);

        let err = ReferenceIndexBuilder::new().build(&raw).unwrap_err();
        let ReferenceError::MissingColumns(missing) = err.clone();

        assert_eq!(missing.len(), 3);
        let message = err.to_string();
        assert!(message.contains("Nom_etablissement"));
        assert!(message.contains("Code_postal"));
        assert!(message.contains("Identifiant_de_l_etablissement"));
    }

    #[test]
    fn test_missing_address_degrades_with_warning() {
        let raw = table(
            &["Nom_etablissement", "Code_postal", "UAI"],
            &[&["Ecole Pasteur", "33000", "0330444A"]],
        );

        let (reference, warnings) = ReferenceIndexBuilder::new().build(&raw).unwrap();

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "address");

        let record = reference.record(0).unwrap();
        assert_eq!(record.address, "");
        // Composite string still trims cleanly around the empty field
        assert_eq!(
            reference.index().entries()[0].search_string,
            "Ecole Pasteur  33000"
        );
    }

    #[test]
    fn test_index_is_parallel_to_records() {
        let raw = table(
            &["Nom_etablissement", "Code_postal", "UAI", "Adresse"],
            &[
                &["Ecole A", "75001", "0750001A", "1 rue A"],
                &["Ecole B", "75002", "0750002B", "2 rue B"],
                &["Ecole C", "75003", "0750003C", "3 rue C"],
            ],
        );

        let (reference, _) = ReferenceIndexBuilder::new().build(&raw).unwrap();

        assert_eq!(reference.index().len(), reference.len());
        for entry in reference.index().entries() {
            let record = reference.record(entry.record_index).unwrap();
            assert!(entry.search_string.starts_with(&record.name));
            assert!(entry.search_string.ends_with(&record.postal_code));
        }
    }

    #[test]
    fn test_short_rows_read_as_empty_cells() {
        let raw = table(
            &["Nom_etablissement", "Code_postal", "UAI", "Adresse"],
            &[&["Ecole Courte", "44000"]],
        );

        let (reference, _) = ReferenceIndexBuilder::new().build(&raw).unwrap();
        let record = reference.record(0).unwrap();
        assert_eq!(record.uai, "");
        assert_eq!(record.address, "");
    }
}
