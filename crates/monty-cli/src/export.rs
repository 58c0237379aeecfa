//! Export documents (JSON and CSV) and import validation.
//!
//! A JSON export is `{version, exportTime, config, stats, rawData?}`; the CSV
//! form carries one stats row per strategy.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use monty_sim::{ConfigError, RunPlan, SimulationStats, TrialResult, compute_statistics};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Version written into every export; imports accept any `1.x`.
pub const EXPORT_VERSION: &str = "1.0.0";

pub const CSV_HEADER: &str = "Strategy,Wins,Losses,Win Rate (%),Standard Error,CI Lower,CI Upper";

/// Row label for a single-configuration run.
pub const OVERALL_LABEL: &str = "Overall";

const REQUIRED_FIELDS: [&str; 4] = ["version", "exportTime", "config", "stats"];

/// Tolerance when comparing stored and recomputed rates.
const RATE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    /// RFC 3339 timestamp.
    pub export_time: String,
    pub config: RunPlan,
    pub stats: SimulationStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Vec<TrialResult>>,
}

impl ExportDocument {
    /// Stamp a new document with the current version and time.
    pub fn new(config: RunPlan, stats: SimulationStats, raw_data: Option<Vec<TrialResult>>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            export_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            config,
            stats,
            raw_data,
        }
    }
}

/// Write `doc` as pretty JSON followed by a newline.
pub fn write_json(w: &mut dyn Write, doc: &ExportDocument) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *w, doc)?;
    writeln!(w)?;
    Ok(())
}

/// Write the CSV header and one row per `(label, stats)` pair.
///
/// The win rate is a percentage with 2 decimals; standard error and interval
/// bounds are fractions with 4 decimals.
pub fn write_csv<'a, I>(w: &mut dyn Write, rows: I) -> io::Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a SimulationStats)>,
{
    writeln!(w, "{CSV_HEADER}")?;
    for (label, stats) in rows {
        writeln!(
            w,
            "{label},{},{},{:.2},{:.4},{:.4},{:.4}",
            stats.wins,
            stats.losses,
            stats.win_rate * 100.0,
            stats.standard_error,
            stats.confidence_interval.lower,
            stats.confidence_interval.upper
        )?;
    }
    Ok(())
}

/// Why an export document was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ImportFormatError {
    #[error("export document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("export document must be a JSON object")]
    NotAnObject,

    #[error("export document is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unsupported export version `{0}` (expected 1.x)")]
    UnsupportedVersion(String),

    #[error("exportTime `{0}` is not an RFC 3339 timestamp")]
    InvalidExportTime(String),

    #[error("exported config is invalid: {0}")]
    InvalidConfig(#[source] ConfigError),

    #[error("exported stats are inconsistent: {0}")]
    InconsistentStats(String),
}

impl ImportFormatError {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Json(_) => "E3001",
            Self::NotAnObject => "E3002",
            Self::MissingField(_) => "E3003",
            Self::UnsupportedVersion(_) => "E3004",
            Self::InvalidExportTime(_) => "E3005",
            Self::InvalidConfig(_) => "E3006",
            Self::InconsistentStats(_) => "E3007",
        }
    }
}

/// Parse and validate an export document.
///
/// # Errors
///
/// Returns an [`ImportFormatError`] describing the first problem found.
pub fn parse_export(content: &str) -> Result<ExportDocument, ImportFormatError> {
    let value: JsonValue = serde_json::from_str(content)?;
    let object = value.as_object().ok_or(ImportFormatError::NotAnObject)?;

    for field in REQUIRED_FIELDS {
        if object.get(field).is_none_or(JsonValue::is_null) {
            return Err(ImportFormatError::MissingField(field));
        }
    }
    let version = object
        .get("version")
        .and_then(JsonValue::as_str)
        .unwrap_or_default();
    if version.split('.').next() != Some("1") {
        return Err(ImportFormatError::UnsupportedVersion(version.to_string()));
    }

    let doc: ExportDocument = serde_json::from_value(value)?;
    if DateTime::parse_from_rfc3339(&doc.export_time).is_err() {
        return Err(ImportFormatError::InvalidExportTime(doc.export_time));
    }
    doc.config
        .simulation
        .validate()
        .map_err(ImportFormatError::InvalidConfig)?;
    check_stats(&doc.stats)?;
    Ok(doc)
}

#[allow(clippy::cast_precision_loss)]
fn check_stats(stats: &SimulationStats) -> Result<(), ImportFormatError> {
    if stats.wins.checked_add(stats.losses) != Some(stats.total_runs) {
        return Err(ImportFormatError::InconsistentStats(format!(
            "wins ({}) + losses ({}) != totalRuns ({})",
            stats.wins, stats.losses, stats.total_runs
        )));
    }
    if !(0.0..=1.0).contains(&stats.win_rate) {
        return Err(ImportFormatError::InconsistentStats(format!(
            "winRate {} is outside [0, 1]",
            stats.win_rate
        )));
    }
    if stats.total_runs > 0 {
        let expected = stats.wins as f64 / stats.total_runs as f64;
        if (expected - stats.win_rate).abs() > RATE_EPSILON {
            return Err(ImportFormatError::InconsistentStats(format!(
                "winRate {} does not match wins / totalRuns = {expected}",
                stats.win_rate
            )));
        }
    }
    let ci = stats.confidence_interval;
    if ci.lower > ci.upper {
        return Err(ImportFormatError::InconsistentStats(format!(
            "confidence interval [{}, {}] is inverted",
            ci.lower, ci.upper
        )));
    }
    Ok(())
}

/// Stats recomputed from an export's raw records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDataCheck {
    pub records: usize,
    pub recomputed: SimulationStats,
    pub matches_stored: bool,
}

/// Recompute stats from `rawData`, if the document carries any.
pub fn check_raw_data(doc: &ExportDocument) -> Option<RawDataCheck> {
    let raw = doc.raw_data.as_ref()?;
    let recomputed = compute_statistics(raw);
    let stored = &doc.stats;
    let matches_stored = recomputed.total_runs == stored.total_runs
        && recomputed.wins == stored.wins
        && recomputed.losses == stored.losses
        && (recomputed.win_rate - stored.win_rate).abs() <= RATE_EPSILON
        && (recomputed.standard_error - stored.standard_error).abs() <= RATE_EPSILON;
    Some(RawDataCheck {
        records: raw.len(),
        recomputed,
        matches_stored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use monty_sim::{DeterministicRng, Seed, run_batch};

    fn sample(raw: bool) -> ExportDocument {
        let plan = RunPlan {
            total_runs: 200,
            ..RunPlan::default()
        };
        let mut rng = DeterministicRng::new(Seed::from("export"));
        let results = run_batch(&plan.simulation, &mut rng, plan.total_runs).expect("valid");
        let stats = compute_statistics(&results);
        ExportDocument::new(plan, stats, raw.then_some(results))
    }

    fn to_json(doc: &ExportDocument) -> String {
        let mut buf = Vec::new();
        write_json(&mut buf, doc).expect("write");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn json_export_has_expected_shape() {
        let json: JsonValue = serde_json::from_str(&to_json(&sample(false))).expect("json");
        assert_eq!(json["version"], EXPORT_VERSION);
        assert!(json["exportTime"].as_str().is_some_and(|t| t.ends_with('Z')));
        assert_eq!(json["config"]["totalRuns"], 200);
        assert_eq!(json["config"]["simulation"]["hostModel"], "classic");
        assert_eq!(json["stats"]["totalRuns"], 200);
        assert!(json.get("rawData").is_none());
    }

    #[test]
    fn export_then_import_with_raw_data_checks_out() {
        let doc = sample(true);
        let parsed = parse_export(&to_json(&doc)).expect("valid export");
        assert_eq!(parsed.config, doc.config);
        assert_eq!(parsed.raw_data, doc.raw_data);
        assert_eq!(parsed.stats.wins, doc.stats.wins);

        let check = check_raw_data(&parsed).expect("raw data present");
        assert_eq!(check.records, 200);
        assert!(check.matches_stored);
    }

    #[test]
    fn tampered_raw_data_is_detected() {
        let mut doc = sample(true);
        if let Some(raw) = doc.raw_data.as_mut() {
            raw.truncate(150);
        }
        let check = check_raw_data(&doc).expect("raw data present");
        assert!(!check.matches_stored);
        assert_eq!(check.recomputed.total_runs, 150);
    }

    #[test]
    fn no_raw_data_means_no_check() {
        assert!(check_raw_data(&sample(false)).is_none());
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_export("not json").expect_err("garbage");
        assert_eq!(err.code(), "E3001");
        let err = parse_export("[1, 2]").expect_err("array");
        assert_eq!(err.code(), "E3002");
    }

    #[test]
    fn rejects_missing_fields() {
        let mut json: JsonValue = serde_json::from_str(&to_json(&sample(false))).expect("json");
        if let Some(object) = json.as_object_mut() {
            object.remove("stats");
        }
        let err = parse_export(&json.to_string()).expect_err("missing stats");
        assert!(matches!(err, ImportFormatError::MissingField("stats")));
    }

    #[test]
    fn rejects_unknown_major_version() {
        let mut json: JsonValue = serde_json::from_str(&to_json(&sample(false))).expect("json");
        json["version"] = "2.0.0".into();
        let err = parse_export(&json.to_string()).expect_err("v2");
        assert!(matches!(err, ImportFormatError::UnsupportedVersion(ref v) if v == "2.0.0"));

        json["version"] = "1.3.0".into();
        assert!(parse_export(&json.to_string()).is_ok());
    }

    #[test]
    fn rejects_bad_timestamp() {
        let mut json: JsonValue = serde_json::from_str(&to_json(&sample(false))).expect("json");
        json["exportTime"] = "yesterday".into();
        let err = parse_export(&json.to_string()).expect_err("bad time");
        assert_eq!(err.code(), "E3005");
    }

    #[test]
    fn rejects_invalid_config() {
        let mut json: JsonValue = serde_json::from_str(&to_json(&sample(false))).expect("json");
        json["config"]["simulation"]["doorCount"] = 2.into();
        let err = parse_export(&json.to_string()).expect_err("two doors");
        assert!(matches!(
            err,
            ImportFormatError::InvalidConfig(ConfigError::TooFewDoors(2))
        ));
    }

    #[test]
    fn rejects_inconsistent_stats() {
        let mut json: JsonValue = serde_json::from_str(&to_json(&sample(false))).expect("json");
        json["stats"]["wins"] = 1.into();
        let err = parse_export(&json.to_string()).expect_err("bad counts");
        assert_eq!(err.code(), "E3007");
    }

    #[test]
    fn rejects_overflowing_counts() {
        let mut json: JsonValue = serde_json::from_str(&to_json(&sample(false))).expect("json");
        json["stats"]["wins"] = u64::MAX.into();
        json["stats"]["losses"] = 1.into();
        let err = parse_export(&json.to_string()).expect_err("overflowing counts");
        assert!(matches!(err, ImportFormatError::InconsistentStats(_)));
        assert_eq!(err.code(), "E3007");
    }

    #[test]
    fn csv_rows_use_percent_and_fixed_decimals() {
        let stats = SimulationStats::from_counts(3, 2);
        let mut buf = Vec::new();
        write_csv(&mut buf, [(OVERALL_LABEL, &stats)]).expect("csv");
        let csv = String::from_utf8(buf).expect("utf8");
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().expect("row");
        let cells: Vec<_> = row.split(',').collect();
        assert_eq!(cells[..4], ["Overall", "2", "1", "66.67"]);
        assert_eq!(cells[4], format!("{:.4}", stats.standard_error));
        assert!(cells[5..].iter().all(|c| c.split('.').nth(1).map(str::len) == Some(4)));
        assert!(lines.next().is_none());
    }
}
