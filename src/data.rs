use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Deserializer};

use crate::models::{MaintenanceRecord, Milestone, SurveyRecord, ADKAR_DIMENSIONS};

pub const MAINTENANCE_FILE: &str = "machine_maintenance_logs.csv";
pub const SURVEY_FILE: &str = "organizational_readiness_survey.csv";
pub const MILESTONE_FILE: &str = "change_milestones.csv";

pub fn maintenance_path(data_dir: &Path) -> PathBuf {
    data_dir.join(MAINTENANCE_FILE)
}

pub fn survey_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SURVEY_FILE)
}

pub fn milestone_path(data_dir: &Path) -> PathBuf {
    data_dir.join(MILESTONE_FILE)
}

/// Coerces a raw survey cell to a score. Non-numeric text (including empty
/// cells) becomes `None`; an absent column is still a deserialization error
/// because the field itself is required.
pub fn coerce_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().parse::<f64>().ok().filter(|value| value.is_finite()))
}

pub fn load_maintenance(path: &Path) -> anyhow::Result<Vec<MaintenanceRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open maintenance log {}", path.display()))?;
    let mut records = Vec::new();

    for result in reader.deserialize::<MaintenanceRecord>() {
        let record =
            result.with_context(|| format!("malformed maintenance row in {}", path.display()))?;
        records.push(record);
    }

    Ok(records)
}

pub fn load_survey(path: &Path) -> anyhow::Result<Vec<SurveyRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open survey {}", path.display()))?;
    read_survey(file).with_context(|| format!("malformed survey data in {}", path.display()))
}

pub fn read_survey<R: Read>(input: R) -> anyhow::Result<Vec<SurveyRecord>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut records = Vec::new();

    for result in reader.deserialize::<SurveyRecord>() {
        records.push(result?);
    }

    Ok(records)
}

pub fn load_milestones(path: &Path) -> anyhow::Result<Vec<Milestone>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open milestone file {}", path.display()))?;
    let mut milestones = Vec::new();

    for result in reader.deserialize::<Milestone>() {
        let milestone =
            result.with_context(|| format!("malformed milestone row in {}", path.display()))?;
        milestones.push(milestone);
    }

    Ok(milestones)
}

/// Writes realistic sample datasets into the data directory so every view
/// renders out of the box.
pub fn write_seed_data(data_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let maintenance_rows = [
        ["M-101", "2026-03-02", "120", "48.2", "1.1", "0"],
        ["M-101", "2026-03-09", "165", "51.6", "1.3", "0"],
        ["M-101", "2026-03-16", "210", "55.0", "1.6", "0"],
        ["M-101", "2026-03-23", "255", "58.4", "1.8", "0"],
        ["M-102", "2026-03-02", "310", "74.5", "3.0", "0"],
        ["M-102", "2026-03-09", "355", "79.1", "3.4", "1"],
        ["M-102", "2026-03-16", "400", "83.8", "3.7", "1"],
        ["M-102", "2026-03-23", "445", "88.2", "4.1", "1"],
        ["M-103", "2026-03-02", "140", "49.5", "1.2", "0"],
        ["M-103", "2026-03-09", "260", "63.0", "2.2", "0"],
        ["M-103", "2026-03-16", "330", "76.4", "3.1", "1"],
        ["M-103", "2026-03-23", "370", "80.9", "3.5", "1"],
    ];
    let mut writer = csv::Writer::from_path(maintenance_path(data_dir))?;
    writer.write_record([
        "machine_id",
        "date",
        "run_hours",
        "temperature_c",
        "vibration_level",
        "failure",
    ])?;
    for row in maintenance_rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    // One "n/a" and one empty cell exercise the coercion path.
    let survey_rows = [
        ["Operations", "2.4", "3.6", "3.1", "3.0", "4.0"],
        ["Operations", "2.6", "3.2", "2.9", "3.4", "3.8"],
        ["Operations", "2.5", "3.4", "3.0", "n/a", "4.1"],
        ["Engineering", "4.1", "3.9", "4.3", "4.0", "3.7"],
        ["Engineering", "3.8", "4.2", "4.0", "3.9", "3.5"],
        ["Engineering", "4.0", "", "4.1", "4.2", "3.9"],
        ["Human Resources", "3.5", "3.1", "3.3", "3.2", "3.6"],
        ["Human Resources", "3.7", "3.0", "3.4", "3.1", "3.4"],
        ["Human Resources", "3.6", "3.3", "3.2", "3.0", "3.5"],
    ];
    let mut writer = csv::Writer::from_path(survey_path(data_dir))?;
    let mut header = vec!["department"];
    header.extend(ADKAR_DIMENSIONS);
    writer.write_record(&header)?;
    for row in survey_rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    let milestone_rows = [
        ["Stakeholder alignment", "2026-01-12", "2026-02-06", "complete"],
        ["Pilot line rollout", "2026-02-09", "2026-03-20", "in progress"],
        ["Operator training", "2026-03-02", "2026-04-10", "in progress"],
        ["Full production cutover", "2026-04-13", "2026-05-29", "planned"],
    ];
    let mut writer = csv::Writer::from_path(milestone_path(data_dir))?;
    writer.write_record(["milestone", "start_date", "end_date", "status"])?;
    for row in milestone_rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    Ok(())
}
