//! Data models shared by the projection pipeline: user selections, the
//! validated 15-year series, its summary, and impact notes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every projection covers exactly this many years, numbered `1..=15`.
pub const PROJECTION_YEARS: usize = 15;

/// The user's path choices, as picked from the lookup widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selections {
    pub institution: String,
    pub field: String,
    pub area: String,
    pub occupation: String,
    #[serde(default)]
    pub zipcode: String,
    /// Planned housing size. Must be at least 1.
    #[serde(default = "default_bedrooms")]
    pub bedrooms: u32,
}

fn default_bedrooms() -> u32 {
    1
}

/// The alternative path used by the transition stage. ZIP code and housing
/// carry over from the original selections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathChoice {
    pub institution: String,
    pub field: String,
    pub area: String,
    pub occupation: String,
}

impl From<&Selections> for PathChoice {
    fn from(s: &Selections) -> Self {
        Self {
            institution: s.institution.clone(),
            field: s.field.clone(),
            area: s.area.clone(),
            occupation: s.occupation.clone(),
        }
    }
}

/// One year of a projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearPoint {
    pub year: u32,
    pub net_worth: f64,
    pub income: f64,
    pub expenses: f64,
    pub loan_balance: Option<f64>,
}

/// Exactly 15 contiguous years starting at 1. Only constructible through
/// `from_columns`, which enforces that shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProjectionSeries(Vec<YearPoint>);

impl ProjectionSeries {
    /// Zips parallel columns into year points. Returns a description of the
    /// first violated invariant on failure.
    pub fn from_columns(
        years: &[i64],
        net_worth: &[f64],
        income: &[f64],
        expenses: &[f64],
        loans: Option<&[f64]>,
    ) -> Result<Self, String> {
        if years.len() != PROJECTION_YEARS {
            return Err(format!(
                "years has {} entries, expected {PROJECTION_YEARS}",
                years.len()
            ));
        }
        for (i, &year) in years.iter().enumerate() {
            let expected = i as i64 + 1;
            if year != expected {
                return Err(format!(
                    "years must be 1..={PROJECTION_YEARS} in order; position {i} is {year}, expected {expected}"
                ));
            }
        }

        let mut columns: Vec<(&str, &[f64])> = vec![
            ("netWorth", net_worth),
            ("income", income),
            ("expenses", expenses),
        ];
        if let Some(loans) = loans {
            columns.push(("loans", loans));
        }
        for (name, column) in columns {
            if column.len() != years.len() {
                return Err(format!(
                    "{name} has {} entries but years has {}",
                    column.len(),
                    years.len()
                ));
            }
        }

        let points = (0..PROJECTION_YEARS)
            .map(|i| YearPoint {
                year: i as u32 + 1,
                net_worth: net_worth[i],
                income: income[i],
                expenses: expenses[i],
                loan_balance: loans.map(|l| l[i]),
            })
            .collect();
        Ok(Self(points))
    }

    pub fn points(&self) -> &[YearPoint] {
        &self.0
    }

    /// Points from `year` (1-based, inclusive) onward.
    pub fn from_year(&self, year: u32) -> &[YearPoint] {
        let start = (year.max(1) as usize - 1).min(self.0.len());
        &self.0[start..]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionSummary {
    pub total_net_worth: f64,
    pub peak_net_worth: f64,
    pub average_growth: Option<f64>,
    /// Only present when a path-change scenario was modelled.
    pub transition_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactNote {
    pub change: String,
    pub financial_effect: String,
}

/// A fully validated projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub series: ProjectionSeries,
    pub summary: ProjectionSummary,
    pub impact: Vec<ImpactNote>,
}

/// The year a path change takes effect, always within `1..=15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransitionYear(u32);

impl TransitionYear {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for TransitionYear {
    type Error = String;

    fn try_from(year: u32) -> Result<Self, Self::Error> {
        if (1..=PROJECTION_YEARS as u32).contains(&year) {
            Ok(Self(year))
        } else {
            Err(format!(
                "transition year must be between 1 and {PROJECTION_YEARS}, got {year}"
            ))
        }
    }
}

/// What to do when `impact.changes` and `impact.financialEffect` differ in length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactPairing {
    /// Pair entries up to the shorter list and drop the rest.
    #[default]
    Truncate,
    /// Treat the mismatch as a schema violation.
    Reject,
}

impl FromStr for ImpactPairing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(ImpactPairing::Truncate),
            "reject" => Ok(ImpactPairing::Reject),
            other => Err(format!("unknown impact pairing policy '{other}'")),
        }
    }
}

/// Response shape requested from the revision stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionFormat {
    /// Chart schema plus an `impact` object.
    #[default]
    Chart,
    /// `revisedExplanation` sections plus a `comparison` object.
    Sectioned,
}

/// Response shape requested from the plan stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanFormat {
    #[default]
    Text,
    /// Ask for an `<html>` fragment and extract it.
    Html,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn selections() -> Selections {
        Selections {
            institution: "University of California-Berkeley".to_string(),
            field: "Computer Science".to_string(),
            area: "San Francisco-Oakland-Hayward, CA".to_string(),
            occupation: "Software Developers".to_string(),
            zipcode: "94704".to_string(),
            bedrooms: 2,
        }
    }

    pub fn years() -> Vec<i64> {
        (1..=PROJECTION_YEARS as i64).collect()
    }

    pub fn column(start: f64, step: f64) -> Vec<f64> {
        (0..PROJECTION_YEARS).map(|i| start + step * i as f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_series_from_valid_columns() {
        let loans = column(40_000.0, -2_000.0);
        let series = ProjectionSeries::from_columns(
            &years(),
            &column(-30_000.0, 20_000.0),
            &column(0.0, 10_000.0),
            &column(25_000.0, 1_000.0),
            Some(&loans),
        )
        .unwrap();

        assert_eq!(series.points().len(), PROJECTION_YEARS);
        let years: Vec<u32> = series.points().iter().map(|p| p.year).collect();
        assert_eq!(years, (1..=15).collect::<Vec<u32>>());
        assert_eq!(series.points()[14].loan_balance, Some(12_000.0));
    }

    #[test]
    fn test_series_rejects_short_years() {
        let short: Vec<i64> = (1..=14).collect();
        let err = ProjectionSeries::from_columns(
            &short,
            &column(0.0, 1.0),
            &column(0.0, 1.0),
            &column(0.0, 1.0),
            None,
        )
        .unwrap_err();
        assert!(err.contains("expected 15"));
    }

    #[test]
    fn test_series_rejects_non_contiguous_years() {
        let mut gap = years();
        gap[5] = 7;
        assert!(ProjectionSeries::from_columns(
            &gap,
            &column(0.0, 1.0),
            &column(0.0, 1.0),
            &column(0.0, 1.0),
            None
        )
        .is_err());
    }

    #[test]
    fn test_series_rejects_short_loans() {
        let loans = vec![0.0; 14];
        let err = ProjectionSeries::from_columns(
            &years(),
            &column(0.0, 1.0),
            &column(0.0, 1.0),
            &column(0.0, 1.0),
            Some(&loans),
        )
        .unwrap_err();
        assert!(err.starts_with("loans"));
    }

    #[test]
    fn test_from_year_slices_inclusive() {
        let series = ProjectionSeries::from_columns(
            &years(),
            &column(0.0, 1.0),
            &column(0.0, 1.0),
            &column(0.0, 1.0),
            None,
        )
        .unwrap();
        assert_eq!(series.from_year(5).len(), 11);
        assert_eq!(series.from_year(5)[0].year, 5);
        assert_eq!(series.from_year(1).len(), 15);
        assert_eq!(series.from_year(15).len(), 1);
    }

    #[test]
    fn test_transition_year_bounds() {
        assert!(TransitionYear::try_from(0).is_err());
        assert_eq!(TransitionYear::try_from(1).unwrap().get(), 1);
        assert_eq!(TransitionYear::try_from(15).unwrap().get(), 15);
        assert!(TransitionYear::try_from(16).is_err());
    }

    #[test]
    fn test_impact_pairing_from_str() {
        assert_eq!("Truncate".parse::<ImpactPairing>(), Ok(ImpactPairing::Truncate));
        assert_eq!("reject".parse::<ImpactPairing>(), Ok(ImpactPairing::Reject));
        assert!("zip".parse::<ImpactPairing>().is_err());
    }

    #[test]
    fn test_selections_default_bedrooms() {
        let json = r#"{
            "institution": "A", "field": "B", "area": "C", "occupation": "D"
        }"#;
        let s: Selections = serde_json::from_str(json).unwrap();
        assert_eq!(s.bedrooms, 1);
        assert!(s.zipcode.is_empty());
    }
}
