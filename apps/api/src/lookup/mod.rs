//! Lookup Service: the education-cost and occupation-wage tables.
//!
//! Both tables are loaded once at startup and never mutated. Every string cell
//! is trimmed on load. A wage miss is a `LookupError`, never a fatal error:
//! display callers render `"N/A"` instead.

pub mod handlers;

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::projection::render::{format_salary, parse_amount};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationRecord {
    pub institution: String,
    pub program: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupationWageRecord {
    pub area: String,
    pub occupation: String,
    /// The trimmed source cell, e.g. `"165,320"` or `"*"`.
    pub reported_wage: String,
    /// `None` when the source cell is not numeric (suppressed estimates such as `*`).
    pub mean_wage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("no wage row for occupation '{occupation}' in area '{area}'")]
    NotFound { area: String, occupation: String },

    #[error("wage for occupation '{occupation}' in area '{area}' is not reported")]
    NotReported { area: String, occupation: String },
}

// Raw CSV rows. Column names follow the source files; other columns are ignored.

#[derive(Debug, Deserialize)]
struct EducationRow {
    #[serde(rename = "INSTNM")]
    institution: String,
    #[serde(rename = "CIPDESC")]
    program: String,
}

#[derive(Debug, Deserialize)]
struct WageRow {
    #[serde(rename = "AREA_TITLE")]
    area: String,
    #[serde(rename = "OCC_TITLE")]
    occupation: String,
    #[serde(rename = "A_MEAN", default)]
    mean_wage: String,
}

/// Both lookup tables, immutable after load.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    education: Vec<EducationRecord>,
    wages: Vec<OccupationWageRecord>,
}

impl LookupTables {
    pub fn new(education: Vec<EducationRecord>, wages: Vec<OccupationWageRecord>) -> Self {
        Self { education, wages }
    }

    /// Loads both CSV files from disk.
    pub fn load(education_path: impl AsRef<Path>, wage_path: impl AsRef<Path>) -> Result<Self> {
        let education_path = education_path.as_ref();
        let wage_path = wage_path.as_ref();

        let education = std::fs::File::open(education_path)
            .with_context(|| format!("Failed to open education table {}", education_path.display()))
            .and_then(read_education)?;
        let wages = std::fs::File::open(wage_path)
            .with_context(|| format!("Failed to open wage table {}", wage_path.display()))
            .and_then(read_wages)?;

        info!(
            "Loaded lookup tables: {} education rows, {} wage rows",
            education.len(),
            wages.len()
        );
        Ok(Self::new(education, wages))
    }

    /// Distinct institution names, sorted.
    pub fn institutions(&self) -> BTreeSet<String> {
        self.education
            .iter()
            .map(|r| r.institution.clone())
            .collect()
    }

    /// Distinct fields of study offered by `institution`. Empty for unknown institutions.
    pub fn fields_for(&self, institution: &str) -> BTreeSet<String> {
        let institution = institution.trim();
        self.education
            .iter()
            .filter(|r| r.institution == institution)
            .map(|r| r.program.clone())
            .collect()
    }

    /// Distinct geographic area names, sorted.
    pub fn areas(&self) -> BTreeSet<String> {
        self.wages.iter().map(|r| r.area.clone()).collect()
    }

    /// Distinct occupation titles in `area`. Empty for unknown areas.
    pub fn occupations_for(&self, area: &str) -> BTreeSet<String> {
        let area = area.trim();
        self.wages
            .iter()
            .filter(|r| r.area == area)
            .map(|r| r.occupation.clone())
            .collect()
    }

    /// Mean annual wage of the first row matching (area, occupation).
    pub fn mean_wage(&self, area: &str, occupation: &str) -> Result<f64, LookupError> {
        let (area, occupation) = (area.trim(), occupation.trim());
        let row = self
            .wages
            .iter()
            .find(|r| r.area == area && r.occupation == occupation)
            .ok_or_else(|| LookupError::NotFound {
                area: area.to_string(),
                occupation: occupation.to_string(),
            })?;

        row.mean_wage.ok_or_else(|| LookupError::NotReported {
            area: area.to_string(),
            occupation: occupation.to_string(),
        })
    }

    /// Formatted mean wage, or `"N/A"` on any miss.
    pub fn display_wage(&self, area: &str, occupation: &str) -> String {
        let (area, occupation) = (area.trim(), occupation.trim());
        self.wages
            .iter()
            .find(|r| r.area == area && r.occupation == occupation)
            .map(|r| format_salary(&r.reported_wage))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn has_institution(&self, institution: &str) -> bool {
        let institution = institution.trim();
        self.education.iter().any(|r| r.institution == institution)
    }

    pub fn has_area(&self, area: &str) -> bool {
        let area = area.trim();
        self.wages.iter().any(|r| r.area == area)
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Parses the education table. Rows with an empty institution or program are skipped.
pub fn read_education<R: Read>(reader: R) -> Result<Vec<EducationRecord>> {
    let mut records = Vec::new();
    for (line, row) in csv_reader(reader).deserialize::<EducationRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed education row {}", line + 2))?;
        if row.institution.is_empty() || row.program.is_empty() {
            continue;
        }
        records.push(EducationRecord {
            institution: row.institution,
            program: row.program,
        });
    }
    Ok(records)
}

/// Parses the wage table. Non-numeric wage cells load as `None`.
pub fn read_wages<R: Read>(reader: R) -> Result<Vec<OccupationWageRecord>> {
    let mut records = Vec::new();
    for (line, row) in csv_reader(reader).deserialize::<WageRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed wage row {}", line + 2))?;
        if row.area.is_empty() || row.occupation.is_empty() {
            continue;
        }
        records.push(OccupationWageRecord {
            area: row.area,
            occupation: row.occupation,
            mean_wage: parse_amount(&row.mean_wage),
            reported_wage: row.mean_wage,
        });
    }
    Ok(records)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const EDUCATION_CSV: &str = "\
UNITID,INSTNM,CIPDESC,CREDLEV
1, University of California-Berkeley , Computer Science ,3
1,University of California-Berkeley,Economics,3
1,University of California-Berkeley,Computer Science,5
2,San Diego State University,Nursing,3
";

    pub const WAGE_CSV: &str = "\
AREA_TITLE,OCC_TITLE,A_MEAN
\"San Francisco-Oakland-Hayward, CA\",Software Developers,\"165,320\"
\"San Francisco-Oakland-Hayward, CA\",Registered Nurses,155730
\"San Diego-Carlsbad, CA\",Registered Nurses,125440
\"San Diego-Carlsbad, CA\",Actors,*
";

    pub fn tables() -> LookupTables {
        LookupTables::new(
            read_education(EDUCATION_CSV.as_bytes()).unwrap(),
            read_wages(WAGE_CSV.as_bytes()).unwrap(),
        )
    }
}
