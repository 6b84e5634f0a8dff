use crate::models::{DepartmentReadiness, SurveyRecord, ADKAR_DIMENSIONS};

/// A department needs attention when any dimension mean drops strictly
/// below this score. Exactly 3.0 passes.
pub const ATTENTION_THRESHOLD: f64 = 3.0;

/// Per-department means of the five dimensions over non-missing responses.
/// An empty selection means every department; output is sorted by name.
pub fn department_means(
    rows: &[SurveyRecord],
    selected: &[String],
) -> Vec<DepartmentReadiness> {
    let mut groups: std::collections::BTreeMap<String, [(f64, usize); 5]> =
        std::collections::BTreeMap::new();

    for row in rows {
        if !selected.is_empty() && !selected.iter().any(|name| name == &row.department) {
            continue;
        }

        let entry = groups.entry(row.department.clone()).or_insert([(0.0, 0); 5]);
        for (slot, value) in entry.iter_mut().zip(row.scores()) {
            if let Some(score) = value {
                slot.0 += score;
                slot.1 += 1;
            }
        }
    }

    groups
        .into_iter()
        .map(|(department, slots)| DepartmentReadiness {
            department,
            scores: slots.map(|(total, count)| {
                if count == 0 {
                    None
                } else {
                    Some(total / count as f64)
                }
            }),
        })
        .collect()
}

/// Departments with every dimension mean present and at least one strictly
/// below the threshold. Incomplete departments are excluded from the check.
pub fn needs_attention(means: &[DepartmentReadiness]) -> Vec<DepartmentReadiness> {
    means
        .iter()
        .filter(|dept| {
            dept.is_complete()
                && dept
                    .scores
                    .iter()
                    .flatten()
                    .any(|score| *score < ATTENTION_THRESHOLD)
        })
        .cloned()
        .collect()
}

/// Serializes the full mean table for download. Missing means stay as empty
/// cells so the shape always matches the survey schema.
pub fn means_to_csv(means: &[DepartmentReadiness]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["department"];
    header.extend(ADKAR_DIMENSIONS);
    writer.write_record(&header)?;

    for dept in means {
        let mut record = vec![dept.department.clone()];
        for score in &dept.scores {
            record.push(score.map(|value| format!("{value:.2}")).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush readiness csv: {err}"))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(department: &str, scores: [Option<f64>; 5]) -> SurveyRecord {
        SurveyRecord {
            department: department.to_string(),
            awareness: scores[0],
            desire: scores[1],
            knowledge: scores[2],
            ability: scores[3],
            reinforcement: scores[4],
        }
    }

    #[test]
    fn low_awareness_flags_the_department() {
        let rows = vec![response(
            "Ops",
            [Some(2.5), Some(3.5), Some(3.0), Some(3.0), Some(4.0)],
        )];
        let means = department_means(&rows, &[]);
        let flagged = needs_attention(&means);

        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].department, "Ops");
        assert_eq!(flagged[0].scores[0], Some(2.5));
    }

    #[test]
    fn a_mean_of_exactly_three_is_not_flagged() {
        let rows = vec![response(
            "Ops",
            [Some(3.0), Some(3.0), Some(3.0), Some(3.0), Some(3.0)],
        )];
        let means = department_means(&rows, &[]);

        assert!(needs_attention(&means).is_empty());
    }

    #[test]
    fn means_ignore_missing_values() {
        let rows = vec![
            response("Ops", [Some(2.0), Some(3.0), Some(3.0), Some(3.0), Some(3.0)]),
            response("Ops", [None, Some(3.0), Some(3.0), Some(3.0), Some(3.0)]),
            response("Ops", [Some(4.0), Some(3.0), Some(3.0), Some(3.0), Some(3.0)]),
        ];
        let means = department_means(&rows, &[]);

        assert_eq!(means[0].scores[0], Some(3.0));
    }

    #[test]
    fn departments_with_a_missing_dimension_skip_the_attention_check() {
        let rows = vec![response(
            "Ops",
            [Some(1.0), None, Some(1.0), Some(1.0), Some(1.0)],
        )];
        let means = department_means(&rows, &[]);

        assert_eq!(means.len(), 1);
        assert!(!means[0].is_complete());
        assert!(needs_attention(&means).is_empty());
    }

    #[test]
    fn selection_filters_departments() {
        let rows = vec![
            response("Ops", [Some(3.0); 5]),
            response("Engineering", [Some(4.0); 5]),
        ];

        let all = department_means(&rows, &[]);
        assert_eq!(all.len(), 2);

        let only_ops = department_means(&rows, &["Ops".to_string()]);
        assert_eq!(only_ops.len(), 1);
        assert_eq!(only_ops[0].department, "Ops");
    }

    #[test]
    fn csv_output_keeps_missing_cells_empty() {
        let means = vec![DepartmentReadiness {
            department: "Ops".to_string(),
            scores: [Some(2.5), None, Some(3.0), Some(3.0), Some(4.0)],
        }];
        let csv = means_to_csv(&means).unwrap();

        assert!(csv.starts_with("department,awareness,desire,knowledge,ability,reinforcement\n"));
        assert!(csv.contains("Ops,2.50,,3.00,3.00,4.00"));
    }
}
