//! OneRoster CSV zip bundle reader.
//!
//! A bundle is a zip archive carrying five CSVs. A missing file means that
//! entity type is skipped for the run; a file missing required headers is
//! still attempted with whatever columns exist. Both conditions surface as
//! warnings the connector attaches to the run, never as errors — only an
//! unreadable archive is fatal.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;
use zip::ZipArchive;

use slate_core::error::{Result, SlateError};
use slate_core::sync::roster::records::{
    ClassRecord, EnrollmentRecord, OrgRecord, RecordStatus, RosterBundle, SessionRecord,
    UserRecord,
};

pub const ORGS_FILE: &str = "orgs.csv";
pub const SESSIONS_FILE: &str = "academicSessions.csv";
pub const USERS_FILE: &str = "users.csv";
pub const CLASSES_FILE: &str = "classes.csv";
pub const ENROLLMENTS_FILE: &str = "enrollments.csv";

pub const BUNDLE_FILES: [&str; 5] = [
    ORGS_FILE,
    SESSIONS_FILE,
    USERS_FILE,
    CLASSES_FILE,
    ENROLLMENTS_FILE,
];

fn required_headers(filename: &str) -> &'static [&'static str] {
    match filename {
        ORGS_FILE => &["sourcedId", "status", "name", "type"],
        SESSIONS_FILE => &["sourcedId", "status", "title", "type", "startDate", "endDate"],
        USERS_FILE => &["sourcedId", "status", "role", "givenName", "familyName", "email"],
        CLASSES_FILE => &["sourcedId", "status", "title", "classCode"],
        ENROLLMENTS_FILE => &["sourcedId", "status", "class", "user", "role"],
        _ => &[],
    }
}

/// A parsed bundle plus the non-fatal problems found while reading it.
#[derive(Debug, Default)]
pub struct CsvBundle {
    pub roster: RosterBundle,
    pub warnings: Vec<String>,
}

/// Read a complete OneRoster CSV bundle from a zip archive on disk.
pub fn read_bundle(path: &Path) -> Result<CsvBundle> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| SlateError::Bundle(format!("unreadable zip archive: {e}")))?;

    let entry_names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let mut bundle = CsvBundle::default();

    for filename in BUNDLE_FILES {
        let Some(entry_name) = locate_entry(&entry_names, filename) else {
            bundle
                .warnings
                .push(format!("missing CSV file: {filename}"));
            continue;
        };
        debug!(entry = %entry_name, "reading bundle entry");

        let mut content = String::new();
        archive
            .by_name(&entry_name)
            .map_err(|e| SlateError::Bundle(format!("failed to open {entry_name}: {e}")))?
            .read_to_string(&mut content)
            .map_err(|e| SlateError::Bundle(format!("failed to read {entry_name}: {e}")))?;

        parse_file(filename, &content, &mut bundle)?;
    }

    Ok(bundle)
}

/// Match an entry at the archive root or one directory deep.
fn locate_entry(entry_names: &[String], filename: &str) -> Option<String> {
    entry_names
        .iter()
        .find(|name| *name == filename)
        .or_else(|| {
            entry_names
                .iter()
                .find(|name| name.ends_with(&format!("/{filename}")))
        })
        .cloned()
}

struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    fn new(headers: &csv::StringRecord) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        Self { columns }
    }

    fn get<'r>(&self, row: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        self.columns
            .get(name)
            .and_then(|&i| row.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn owned(&self, row: &csv::StringRecord, name: &str) -> Option<String> {
        self.get(row, name).map(str::to_string)
    }

    fn date(&self, row: &csv::StringRecord, name: &str) -> Option<NaiveDate> {
        self.get(row, name)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }

    fn status(&self, row: &csv::StringRecord) -> RecordStatus {
        RecordStatus::parse(self.get(row, "status").unwrap_or(""))
    }
}

fn parse_file(filename: &str, content: &str, bundle: &mut CsvBundle) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| SlateError::Bundle(format!("{filename} has no readable header row: {e}")))?
        .clone();

    let missing: Vec<&str> = required_headers(filename)
        .iter()
        .filter(|required| !headers.iter().any(|h| h.trim() == **required))
        .copied()
        .collect();
    if !missing.is_empty() {
        bundle.warnings.push(format!(
            "missing headers in {filename}: {}",
            missing.join(", ")
        ));
    }

    let index = HeaderIndex::new(&headers);
    for row in reader.records() {
        let row =
            row.map_err(|e| SlateError::Bundle(format!("CSV parse error in {filename}: {e}")))?;
        let Some(sourced_id) = index.owned(&row, "sourcedId") else {
            bundle
                .warnings
                .push(format!("row without sourcedId in {filename}"));
            continue;
        };
        let status = index.status(&row);

        match filename {
            ORGS_FILE => bundle.roster.orgs.push(OrgRecord {
                sourced_id,
                status,
                name: index.owned(&row, "name").unwrap_or_default(),
                org_type: index.owned(&row, "type").unwrap_or_default(),
                identifier: index.owned(&row, "identifier"),
            }),
            SESSIONS_FILE => bundle.roster.sessions.push(SessionRecord {
                sourced_id,
                status,
                title: index.owned(&row, "title").unwrap_or_default(),
                session_type: index.owned(&row, "type").unwrap_or_default(),
                start_date: index.date(&row, "startDate"),
                end_date: index.date(&row, "endDate"),
                parent_sourced_id: index
                    .owned(&row, "parentSourcedId")
                    .or_else(|| index.owned(&row, "parent")),
            }),
            USERS_FILE => bundle.roster.users.push(UserRecord {
                sourced_id,
                status,
                given_name: index.owned(&row, "givenName"),
                family_name: index.owned(&row, "familyName"),
                role: index.owned(&row, "role"),
                email: index.owned(&row, "email"),
            }),
            CLASSES_FILE => bundle.roster.classes.push(ClassRecord {
                sourced_id,
                status,
                title: index.owned(&row, "title"),
                class_code: index.owned(&row, "classCode"),
                term_sourced_id: index
                    .owned(&row, "termSourcedIds")
                    .and_then(|s| s.split(',').next().map(|t| t.trim().to_string()))
                    .filter(|s| !s.is_empty()),
            }),
            ENROLLMENTS_FILE => bundle.roster.enrollments.push(EnrollmentRecord {
                sourced_id,
                status,
                user_sourced_id: index.owned(&row, "user"),
                class_sourced_id: index.owned(&row, "class"),
                role: index.owned(&row, "role"),
            }),
            _ => {}
        }
    }

    Ok(())
}
