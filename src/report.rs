use std::fmt::Write;

use anyhow::{ensure, Context};

use crate::models::{
    DepartmentReadiness, MaintenanceRecord, Milestone, SurveyRecord, ADKAR_DIMENSIONS,
};
use crate::readiness::{self, ATTENTION_THRESHOLD};
use crate::risk;

pub fn overview(records: &[MaintenanceRecord]) -> anyhow::Result<String> {
    ensure!(!records.is_empty(), "maintenance table is empty");

    let total_failures: u32 = records.iter().map(|record| record.failure as u32).sum();
    let avg_run_hours =
        records.iter().map(|record| record.run_hours).sum::<f64>() / records.len() as f64;
    let avg_temperature =
        records.iter().map(|record| record.temperature_c).sum::<f64>() / records.len() as f64;

    let mut output = String::new();
    let _ = writeln!(output, "# Change Management Overview");
    let _ = writeln!(output, "- Total machine failures: {total_failures}");
    let _ = writeln!(output, "- Avg run hours: {avg_run_hours:.2}");
    let _ = writeln!(output, "- Avg temperature (C): {avg_temperature:.1}");
    Ok(output)
}

/// Temperature and vibration trend rows for one machine, oldest first.
pub fn machine_trend(records: &[MaintenanceRecord], machine_id: &str) -> String {
    let mut rows: Vec<&MaintenanceRecord> = records
        .iter()
        .filter(|record| record.machine_id == machine_id)
        .collect();
    rows.sort_by(|a, b| a.date.cmp(&b.date));

    let mut output = String::new();
    let _ = writeln!(output, "Temperature & vibration trend for {machine_id}:");
    let _ = writeln!(output, "{:<12} {:>10} {:>10}", "date", "temp_c", "vibration");
    for row in rows {
        let _ = writeln!(
            output,
            "{:<12} {:>10.1} {:>10.2}",
            row.date, row.temperature_c, row.vibration_level
        );
    }
    output
}

pub fn readiness_table(means: &[DepartmentReadiness]) -> String {
    let mut output = String::new();
    let _ = write!(output, "{:<18}", "department");
    for dimension in ADKAR_DIMENSIONS {
        let _ = write!(output, " {dimension:>13}");
    }
    let _ = writeln!(output);

    for dept in means {
        let _ = write!(output, "{:<18}", dept.department);
        for score in &dept.scores {
            match score {
                Some(value) => {
                    let _ = write!(output, " {value:>13.2}");
                }
                None => {
                    let _ = write!(output, " {:>13}", "-");
                }
            }
        }
        let _ = writeln!(output);
    }
    output
}

pub fn timeline(milestones: &[Milestone]) -> String {
    let mut sorted = milestones.to_vec();
    sorted.sort_by(|a, b| a.start_date.cmp(&b.start_date));

    let mut output = String::new();
    let _ = writeln!(output, "# Change Initiative Timeline");
    if sorted.is_empty() {
        let _ = writeln!(output, "No milestones recorded.");
    }
    for milestone in sorted {
        let _ = writeln!(
            output,
            "- {}: {} to {} ({})",
            milestone.milestone, milestone.start_date, milestone.end_date, milestone.status
        );
    }
    output
}

/// The dimension with the lowest mean-of-means across departments.
/// Departments missing a dimension simply do not contribute to it.
pub fn weakest_dimension(means: &[DepartmentReadiness]) -> anyhow::Result<(&'static str, f64)> {
    let mut weakest: Option<(&'static str, f64)> = None;

    for (index, dimension) in ADKAR_DIMENSIONS.into_iter().enumerate() {
        let values: Vec<f64> = means
            .iter()
            .filter_map(|dept| dept.scores[index])
            .collect();
        if values.is_empty() {
            continue;
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        if weakest.map_or(true, |(_, lowest)| mean < lowest) {
            weakest = Some((dimension, mean));
        }
    }

    weakest.context("survey has no numeric readiness scores")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Executive summary over the unfiltered survey and the full maintenance
/// table. Any failing step fails the whole summary; there is no partial
/// output.
pub fn build_summary(
    survey: &[SurveyRecord],
    maintenance: &[MaintenanceRecord],
) -> anyhow::Result<String> {
    let means = readiness::department_means(survey, &[]);
    ensure!(!means.is_empty(), "survey table has no departments");
    let (dimension, score) = weakest_dimension(&means)?;

    let model = risk::fit_failure_model(maintenance)?;
    let scores = risk::score_machines(&model, maintenance)?;
    let riskiest = scores.first().context("no machines to score")?;

    let mut output = String::new();
    let _ = writeln!(
        output,
        "- Highest failure risk: {} with probability {:.2}%",
        riskiest.machine_id,
        riskiest.risk * 100.0
    );
    let _ = writeln!(
        output,
        "- Lowest ADKAR dimension: {} (avg score: {:.2})",
        capitalize(dimension),
        score
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "# Executive Summary");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Out of {} departments surveyed, the weakest readiness factor is \
         \"{}\" with an average score of {:.2}.",
        means.len(),
        capitalize(dimension),
        score
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "The machine most at risk of failure is \"{}\" with a predicted \
         failure probability of {:.2}%.",
        riskiest.machine_id,
        riskiest.risk * 100.0
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Milestones for the change initiative can be tracked in the timeline \
         view. Address ADKAR gaps (dimension means below {ATTENTION_THRESHOLD:.1}) \
         and machine risks for smoother transformation."
    );
    Ok(output)
}
