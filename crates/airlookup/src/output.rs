//! Console rendering of command outcomes.

use std::fmt::Write as _;

use serde_json::json;

use crate::error::Result;
use crate::online::OnlineMetadata;
use crate::record::AircraftRecord;
use crate::router::Outcome;
use crate::sync::SyncReport;

/// Shown in place of a field the source did not provide.
pub const PLACEHOLDER: &str = "None";

/// Width of the label column, including the colon.
const LABEL_WIDTH: usize = 15;

/// Output format for rendered outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Labelled plain text
    #[default]
    Plain,
    /// JSON output
    Json,
}

/// Render an outcome for stdout.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(outcome: &Outcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Plain => Ok(render_plain(outcome)),
        OutputFormat::Json => render_json(outcome),
    }
}

fn render_plain(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Online(metadata) => render_online(metadata),
        Outcome::Found(record) => render_record(record),
        Outcome::Written(record) => format!("Saved {}\n{}", record.icao24, render_record(record)),
        Outcome::NotFound { requested } => format!("No aircraft found for ICAO24: {requested}\n"),
        Outcome::Synced(report) => render_sync(report),
    }
}

fn render_json(outcome: &Outcome) -> Result<String> {
    let value = match outcome {
        Outcome::Online(metadata) => serde_json::to_value(metadata)?,
        Outcome::Found(record) | Outcome::Written(record) => serde_json::to_value(record)?,
        Outcome::NotFound { requested } => json!({ "icao24": requested, "found": false }),
        Outcome::Synced(report) => serde_json::to_value(report)?,
    };
    Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
}

fn labelled<'a>(fields: impl IntoIterator<Item = (&'static str, Option<&'a str>)>) -> String {
    let mut out = String::new();
    for (label, value) in fields {
        let label = format!("{label}:");
        let _ = writeln!(out, "{label:<LABEL_WIDTH$}{}", value.unwrap_or(PLACEHOLDER));
    }
    out
}

/// Render the seven online fields.
#[must_use]
pub fn render_online(metadata: &OnlineMetadata) -> String {
    labelled(metadata.labelled_fields())
}

/// Render a table record.
#[must_use]
pub fn render_record(record: &AircraftRecord) -> String {
    labelled([
        ("ICAO24", Some(record.icao24.row_key())),
        ("Registration", record.registration.as_deref()),
        ("ICAO Type", record.icao_type.as_deref()),
        ("Operator", record.operator.as_deref()),
    ])
}

fn render_sync(report: &SyncReport) -> String {
    format!(
        "Sync complete.\nInserted:  {}\nUpdated:   {}\nUnchanged: {}\nSkipped:   {}\n",
        report.inserted, report.updated, report.unchanged, report.skipped
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Icao24;

    fn record() -> AircraftRecord {
        AircraftRecord {
            icao24: Icao24::parse("a4a3f2").unwrap(),
            registration: Some("N400QX".to_string()),
            icao_type: None,
            operator: Some("QXE".to_string()),
        }
    }

    #[test]
    fn test_render_online_all_fields() {
        let metadata = OnlineMetadata {
            icao24: Some("a4a3f2".to_string()),
            registration: Some("N400QX".to_string()),
            typecode: Some("DH8D".to_string()),
            model: Some("DHC-8-402".to_string()),
            manufacturericao: Some("BOMBARDIER".to_string()),
            operator: Some("Horizon Air".to_string()),
            serialnumber: Some("4123".to_string()),
        };
        let text = render_online(&metadata);

        assert_eq!(text.lines().count(), 7);
        assert!(text.starts_with("ICAO24:        a4a3f2\n"));
        assert!(text.contains("ICAO Type:     DH8D\n"));
        assert!(text.contains("Serial:        4123\n"));
        assert!(!text.contains(PLACEHOLDER));
    }

    #[test]
    fn test_render_online_missing_fields_use_placeholder() {
        let metadata = OnlineMetadata {
            registration: Some("N400QX".to_string()),
            ..OnlineMetadata::default()
        };
        let text = render_online(&metadata);

        assert_eq!(text.lines().count(), 7);
        assert_eq!(text.matches(PLACEHOLDER).count(), 6);
        assert!(text.contains("Manufacturer:  None\n"));
    }

    #[test]
    fn test_render_not_found_mentions_code() {
        let text = render(
            &Outcome::NotFound {
                requested: "a4a3f2".to_string(),
            },
            OutputFormat::Plain,
        )
        .unwrap();
        assert_eq!(text, "No aircraft found for ICAO24: a4a3f2\n");
    }

    #[test]
    fn test_render_record() {
        let text = render(&Outcome::Found(record()), OutputFormat::Plain).unwrap();
        assert_eq!(
            text,
            "ICAO24:        A4A3F2\nRegistration:  N400QX\nICAO Type:     None\nOperator:      QXE\n"
        );
    }

    #[test]
    fn test_render_written_has_confirmation() {
        let text = render(&Outcome::Written(record()), OutputFormat::Plain).unwrap();
        assert!(text.starts_with("Saved A4A3F2\n"));
    }

    #[test]
    fn test_render_json_record() {
        let text = render(&Outcome::Found(record()), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["icao24"], "A4A3F2");
        assert_eq!(value["registration"], "N400QX");
        assert!(value.get("icao_type").is_none());
    }

    #[test]
    fn test_render_json_not_found() {
        let text = render(
            &Outcome::NotFound {
                requested: "a4a3f2".to_string(),
            },
            OutputFormat::Json,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["found"], false);
    }

    #[test]
    fn test_render_sync() {
        let report = SyncReport {
            inserted: 3,
            updated: 2,
            unchanged: 1,
            skipped: 4,
        };
        let text = render(&Outcome::Synced(report), OutputFormat::Plain).unwrap();
        assert!(text.starts_with("Sync complete.\n"));
        assert!(text.contains("Inserted:  3"));
        assert!(text.contains("Skipped:   4"));
    }
}
