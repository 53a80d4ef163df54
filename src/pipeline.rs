// 🔗 Resolution Pipeline - Per-row UAI lookup + académie classification
// Joins FuzzyMatcher and AcademieTable over every input row, in input order

use crate::academie::AcademieTable;
use crate::io::RawTable;
use crate::matcher::{FuzzyMatcher, MatchResult};
use crate::reference::ReferenceIndex;
use log::debug;
use serde::{Deserialize, Serialize};

// ============================================================================
// INPUT COLUMN DISCOVERY
// ============================================================================
// Accepted spellings per required input field, tried in order; the first
// variant present in the header row wins. Extending support for a new
// spelling means adding it to the list, nothing else.

const INPUT_COLUMNS: &[InputColumn] = &[
    InputColumn {
        label: "Establishment Name",
        variants: &[
            "NomEtablissement",
            "nomEtablissement",
            "nom_etablissement",
            "Nom Etablissement",
            "NOM ETABLISSEMENT",
        ],
    },
    InputColumn {
        label: "Postal Code",
        variants: &[
            "CodePostal",
            "codePostal",
            "code_postal",
            "Code Postal",
            "CODE POSTAL",
        ],
    },
    InputColumn {
        label: "Address",
        variants: &["Adresse", "adresse", "ADRESSE"],
    },
];

struct InputColumn {
    label: &'static str,
    variants: &'static [&'static str],
}

/// First header equal to one of the accepted variants, in variant order
fn find_input_column(headers: &[String], variants: &[&str]) -> Option<usize> {
    for variant in variants {
        if let Some(idx) = headers.iter().position(|h| h == variant) {
            return Some(idx);
        }
    }
    None
}

// ============================================================================
// RECORD TYPES
// ============================================================================

/// One canonicalized row of the uploaded dataset, transient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub name: String,
    pub postal_code: String,
    pub address: String,
}

impl InputRecord {
    /// Space-joined query string handed to the fuzzy matcher
    pub fn query_string(&self) -> String {
        format!("{} {} {}", self.name, self.address, self.postal_code)
    }
}

/// One row of the final result table: input fields + match outcome +
/// académie, exported in exactly this column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "NomEtablissement")]
    pub name: String,

    #[serde(rename = "CodePostal")]
    pub postal_code: String,

    #[serde(rename = "Adresse")]
    pub address: String,

    /// UAI of the matched record, or the literal `"Not Found"`
    #[serde(rename = "Identifiant_de_l_etablissement")]
    pub uai: String,

    #[serde(rename = "Match_Score_UAI")]
    pub score: u8,

    #[serde(rename = "Académie")]
    pub academie: String,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Required input columns could not be resolved to any accepted spelling.
    /// Carries every missing field, not just the first.
    MissingColumns(Vec<String>),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::MissingColumns(cols) => write!(
                f,
                "Input file is missing required columns: {}",
                cols.join(", ")
            ),
        }
    }
}

impl std::error::Error for PipelineError {}

// ============================================================================
// RESOLUTION PIPELINE
// ============================================================================

/// Orchestrates a full resolution pass: column discovery, per-row fuzzy
/// match, per-row académie classification, result assembly.
///
/// Holds its collaborators by value; both are read-only during a pass, and
/// each row is independent of every other row.
pub struct ResolutionPipeline {
    matcher: FuzzyMatcher,
    academies: AcademieTable,
}

impl ResolutionPipeline {
    /// Pipeline with the default matcher cutoff and built-in académie table
    pub fn new() -> Self {
        ResolutionPipeline {
            matcher: FuzzyMatcher::new(),
            academies: AcademieTable::with_defaults(),
        }
    }

    /// Pipeline with injected collaborators (alternate tables, custom cutoff)
    pub fn with_parts(matcher: FuzzyMatcher, academies: AcademieTable) -> Self {
        ResolutionPipeline { matcher, academies }
    }

    /// Resolve every input row against the reference index.
    ///
    /// Output length always equals input row count and output order equals
    /// input row order; a row whose match fails still produces an
    /// OutputRecord with `"Not Found"` and score 0. The only error is
    /// unresolvable input columns, reported before any row is processed.
    pub fn resolve(
        &self,
        input: &RawTable,
        reference: &ReferenceIndex,
    ) -> Result<Vec<OutputRecord>, PipelineError> {
        let columns = self.resolve_columns(&input.headers)?;
        let [name_col, postal_col, address_col] = columns;

        let mut results = Vec::with_capacity(input.row_count());

        for row in &input.rows {
            let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");

            let record = InputRecord {
                name: cell(name_col).to_string(),
                postal_code: cell(postal_col).to_string(),
                address: cell(address_col).to_string(),
            };

            let match_result: MatchResult =
                self.matcher.best_match(&record.query_string(), reference);
            let academie = self.academies.classify(&record.postal_code);

            results.push(OutputRecord {
                uai: match_result.uai_label().to_string(),
                score: match_result.score,
                academie: academie.label().to_string(),
                name: record.name,
                postal_code: record.postal_code,
                address: record.address,
            });
        }

        let matched = results.iter().filter(|r| r.score > 0).count();
        debug!(
            "resolved {} rows against {} reference records ({} matched)",
            results.len(),
            reference.len(),
            matched
        );

        Ok(results)
    }

    /// Discover which actual header spells each required field.
    /// Fails with one aggregated error naming every missing field.
    fn resolve_columns(&self, headers: &[String]) -> Result<[usize; 3], PipelineError> {
        let mut resolved = [0usize; 3];
        let mut missing = Vec::new();

        for (slot, column) in INPUT_COLUMNS.iter().enumerate() {
            match find_input_column(headers, column.variants) {
                Some(idx) => resolved[slot] = idx,
                None => missing.push(format!(
                    "{} (e.g., {})",
                    column.label, column.variants[0]
                )),
            }
        }

        if missing.is_empty() {
            Ok(resolved)
        } else {
            Err(PipelineError::MissingColumns(missing))
        }
    }
}

impl Default for ResolutionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceIndexBuilder;

    fn reference_from(rows: &[[&str; 4]]) -> ReferenceIndex {
        let raw = RawTable {
            headers: vec![
                "Nom_etablissement".to_string(),
                "Code_postal".to_string(),
                "Identifiant_de_l_etablissement".to_string(),
                "Adresse".to_string(),
            ],
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        };
        let (reference, _) = ReferenceIndexBuilder::new().build(&raw).unwrap();
        reference
    }

    fn input_from(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_concrete_scenario_jean_moulin() {
        let reference = reference_from(&[[
            "Ecole Jean Moulin",
            "75015",
            "0750001A",
            "12 Rue de Vaugirard",
        ]]);
        let input = input_from(
            &["NomEtablissement", "CodePostal", "Adresse"],
            &[&["Ecole J. Moulin", "75015", "12 rue Vaugirard"]],
        );

        let results = ResolutionPipeline::new().resolve(&input, &reference).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uai, "0750001A");
        assert!(results[0].score >= 70, "score was {}", results[0].score);
        assert_eq!(results[0].academie, "Paris");
    }

    #[test]
    fn test_region_scenarios() {
        let reference = reference_from(&[["Ecole A", "13001", "0130001A", "1 rue A"]]);
        let input = input_from(
            &["NomEtablissement", "CodePostal", "Adresse"],
            &[
                &["Ecole A", "13001", "1 rue A"],
                &["Ecole Corse", "2A041", "2 rue B"],
                &["Ecole Nulle Part", "999", "3 rue C"],
            ],
        );

        let results = ResolutionPipeline::new().resolve(&input, &reference).unwrap();

        assert_eq!(results[0].academie, "Aix-Marseille");
        assert_eq!(results[1].academie, "Corse");
        assert_eq!(results[2].academie, "Unknown (Dept. Not Found)");
    }

    #[test]
    fn test_output_order_and_length_match_input() {
        let reference = reference_from(&[["Ecole A", "75001", "0750001A", "1 rue A"]]);
        let input = input_from(
            &["NomEtablissement", "CodePostal", "Adresse"],
            &[
                &["Zeta", "75001", "9 rue Z"],
                &["Ecole A", "75001", "1 rue A"],
                &["Alpha", "31000", "1 rue Alpha"],
            ],
        );

        let results = ResolutionPipeline::new().resolve(&input, &reference).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name, "Zeta");
        assert_eq!(results[1].name, "Ecole A");
        assert_eq!(results[2].name, "Alpha");
    }

    #[test]
    fn test_unmatched_rows_are_still_emitted() {
        let reference = reference_from(&[["Ecole A", "75001", "0750001A", "1 rue A"]]);
        let input = input_from(
            &["NomEtablissement", "CodePostal", "Adresse"],
            &[
                &["zzzz qqqq", "64000", "wwww"],
                &["xxxx vvvv", "64100", "uuuu"],
            ],
        );

        let results = ResolutionPipeline::new().resolve(&input, &reference).unwrap();

        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.uai, "Not Found");
            assert_eq!(result.score, 0);
        }
        // Rows still classified by postal code even when the match failed
        assert_eq!(results[0].academie, "Bordeaux");
    }

    #[test]
    fn test_header_variant_spellings_are_accepted() {
        let reference = reference_from(&[["Ecole A", "75001", "0750001A", "1 rue A"]]);
        let input = input_from(
            &["nom_etablissement", "CODE POSTAL", "adresse"],
            &[&["Ecole A", "75001", "1 rue A"]],
        );

        let results = ResolutionPipeline::new().resolve(&input, &reference).unwrap();
        assert_eq!(results[0].uai, "0750001A");
    }

    #[test]
    fn test_missing_columns_are_aggregated() {
        let reference = reference_from(&[["Ecole A", "75001", "0750001A", "1 rue A"]]);
        let input = input_from(&["Etablissement", "CP"], &[&["Ecole A", "75001"]]);

        let err = ResolutionPipeline::new()
            .resolve(&input, &reference)
            .unwrap_err();

        let PipelineError::MissingColumns(missing) = err.clone();
        assert_eq!(missing.len(), 3);

        let message = err.to_string();
        assert!(message.contains("Establishment Name (e.g., NomEtablissement)"));
        assert!(message.contains("Postal Code (e.g., CodePostal)"));
        assert!(message.contains("Address (e.g., Adresse)"));
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let reference = reference_from(&[["Ecole A", "75001", "0750001A", "1 rue A"]]);
        let input = input_from(&["NomEtablissement", "CodePostal", "Adresse"], &[]);

        let results = ResolutionPipeline::new().resolve(&input, &reference).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_blank_name_row_is_not_found_but_kept() {
        let reference = reference_from(&[["Ecole A", "75001", "0750001A", "1 rue A"]]);
        let input = input_from(
            &["NomEtablissement", "CodePostal", "Adresse"],
            &[&["", "", ""]],
        );

        let results = ResolutionPipeline::new().resolve(&input, &reference).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].uai, "Not Found");
        assert_eq!(results[0].academie, "Unknown (Invalid Postal Code)");
    }

    #[test]
    fn test_injected_parts() {
        use crate::academie::AcademieTable;
        use crate::matcher::FuzzyMatcher;

        let reference = reference_from(&[["Ecole A", "75001", "0750001A", "1 rue A"]]);
        let pipeline =
            ResolutionPipeline::with_parts(FuzzyMatcher::with_cutoff(100), AcademieTable::new());

        let input = input_from(
            &["NomEtablissement", "CodePostal", "Adresse"],
            &[&["Ecole B", "75001", "1 rue A"]],
        );

        let results = pipeline.resolve(&input, &reference).unwrap();
        // Strict cutoff rejects the near match; empty table knows no académie
        assert_eq!(results[0].uai, "Not Found");
        assert_eq!(results[0].academie, "Unknown (Dept. Not Found)");
    }
}
