use anyhow::ensure;
use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::models::{MachineRisk, MaintenanceRecord};

/// Fixed seed for the train/test partition so reported accuracy is
/// reproducible across renders.
pub const DEFAULT_SEED: u64 = 42;

const TRAIN_FRACTION: f64 = 0.8;
const MAX_ITERATIONS: u64 = 200;

pub type FailureModel = FittedLogisticRegression<f64, usize>;

fn feature_matrix(records: &[MaintenanceRecord]) -> anyhow::Result<Array2<f64>> {
    let mut values = Vec::with_capacity(records.len() * 3);

    for record in records {
        for value in record.features() {
            ensure!(
                value.is_finite(),
                "non-numeric feature value in maintenance row for machine {}",
                record.machine_id
            );
            values.push(value);
        }
    }

    Ok(Array2::from_shape_vec((records.len(), 3), values)?)
}

fn failure_labels(records: &[MaintenanceRecord]) -> Array1<usize> {
    records
        .iter()
        .map(|record| record.failure as usize)
        .collect()
}

/// Fits the failure classifier on every observation in the table. The model
/// is refit from scratch on each render; nothing is cached between views.
pub fn fit_failure_model(records: &[MaintenanceRecord]) -> anyhow::Result<FailureModel> {
    ensure!(!records.is_empty(), "maintenance table is empty");

    let dataset = Dataset::new(feature_matrix(records)?, failure_labels(records));
    let model = LogisticRegression::default()
        .max_iterations(MAX_ITERATIONS)
        .fit(&dataset)
        .map_err(|err| anyhow::anyhow!("failed to fit failure model: {err}"))?;

    Ok(model)
}

/// Accuracy on a held-out 20% partition after a seeded shuffle. The same
/// records and seed always produce the same split and the same accuracy.
pub fn held_out_accuracy(records: &[MaintenanceRecord], seed: u64) -> anyhow::Result<f64> {
    ensure!(
        records.len() >= 2,
        "need at least 2 observations to hold out a test partition"
    );

    let mut indices: Vec<usize> = (0..records.len()).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let train_len = ((records.len() as f64) * TRAIN_FRACTION).round() as usize;
    let train_len = train_len.clamp(1, records.len() - 1);
    let (train_indices, test_indices) = indices.split_at(train_len);

    let train: Vec<MaintenanceRecord> =
        train_indices.iter().map(|&i| records[i].clone()).collect();
    let test: Vec<MaintenanceRecord> = test_indices.iter().map(|&i| records[i].clone()).collect();

    let model = fit_failure_model(&train)?;
    let predicted = model.predict(&feature_matrix(&test)?);
    let correct = predicted
        .iter()
        .zip(test.iter())
        .filter(|(label, record)| **label == record.failure as usize)
        .count();

    Ok(correct as f64 / test.len() as f64)
}

/// Probability of the failure class (label 1) for each feature row.
/// linfa-logistic assigns its positive label to the majority class, so the
/// raw probabilities must be flipped whenever failures are the minority.
fn failure_probabilities(model: &FailureModel, features: &Array2<f64>) -> Array1<f64> {
    let probabilities = model.predict_probabilities(features);
    if model.labels().pos.class == 1 {
        probabilities
    } else {
        probabilities.mapv(|p| 1.0 - p)
    }
}

/// Scores each distinct machine by averaging its feature columns and
/// predicting the failure probability of that single mean vector. The
/// mean-then-predict order is deliberate: per-row probabilities are never
/// averaged. A machine with one observation is scored at that observation.
pub fn score_machines(
    model: &FailureModel,
    records: &[MaintenanceRecord],
) -> anyhow::Result<Vec<MachineRisk>> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: std::collections::HashMap<String, ([f64; 3], usize)> =
        std::collections::HashMap::new();

    for record in records {
        for value in record.features() {
            ensure!(
                value.is_finite(),
                "non-numeric feature value in maintenance row for machine {}",
                record.machine_id
            );
        }

        let entry = sums.entry(record.machine_id.clone()).or_insert_with(|| {
            order.push(record.machine_id.clone());
            ([0.0; 3], 0)
        });
        for (total, value) in entry.0.iter_mut().zip(record.features()) {
            *total += value;
        }
        entry.1 += 1;
    }

    let mut means = Array2::zeros((order.len(), 3));
    for (row, machine_id) in order.iter().enumerate() {
        let (totals, count) = &sums[machine_id];
        for (column, total) in totals.iter().enumerate() {
            means[[row, column]] = total / *count as f64;
        }
    }

    let probabilities = failure_probabilities(model, &means);
    let mut scores: Vec<MachineRisk> = order
        .into_iter()
        .zip(probabilities.iter())
        .map(|(machine_id, &risk)| MachineRisk { machine_id, risk })
        .collect();

    scores.sort_by(|a, b| b.risk.partial_cmp(&a.risk).unwrap_or(std::cmp::Ordering::Equal));
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn observation(
        machine_id: &str,
        day: u32,
        run_hours: f64,
        temperature_c: f64,
        vibration_level: f64,
        failure: u8,
    ) -> MaintenanceRecord {
        MaintenanceRecord {
            machine_id: machine_id.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            run_hours,
            temperature_c,
            vibration_level,
            failure,
        }
    }

    fn training_set() -> Vec<MaintenanceRecord> {
        vec![
            observation("M-101", 1, 120.0, 48.0, 1.1, 0),
            observation("M-101", 2, 160.0, 52.0, 1.3, 0),
            observation("M-102", 3, 300.0, 75.0, 3.1, 1),
            observation("M-102", 4, 340.0, 81.0, 3.4, 1),
            observation("M-103", 5, 150.0, 50.0, 1.2, 0),
            observation("M-103", 6, 320.0, 78.0, 3.2, 1),
            observation("M-101", 7, 140.0, 49.0, 1.0, 0),
            observation("M-102", 8, 330.0, 80.0, 3.3, 1),
            observation("M-103", 9, 130.0, 47.0, 1.1, 0),
            observation("M-103", 10, 310.0, 76.0, 3.0, 1),
        ]
    }

    #[test]
    fn one_risk_row_per_machine_within_unit_interval() {
        let records = training_set();
        let model = fit_failure_model(&records).unwrap();
        let scores = score_machines(&model, &records).unwrap();

        assert_eq!(scores.len(), 3);
        for score in &scores {
            assert!((0.0..=1.0).contains(&score.risk));
        }
        for pair in scores.windows(2) {
            assert!(pair[0].risk >= pair[1].risk);
        }
    }

    #[test]
    fn machines_are_scored_at_their_mean_feature_vector() {
        let mut records = vec![
            observation("M1", 1, 100.0, 50.0, 1.0, 0),
            observation("M1", 2, 200.0, 70.0, 2.0, 1),
        ];
        records.extend(training_set());

        let model = fit_failure_model(&records).unwrap();
        let scores = score_machines(&model, &records).unwrap();
        let m1 = scores
            .iter()
            .find(|score| score.machine_id == "M1")
            .unwrap();

        let expected = failure_probabilities(&model, &array![[150.0, 60.0, 1.5]])[0];
        assert!((m1.risk - expected).abs() < 1e-12);
    }

    #[test]
    fn machine_with_all_failures_ranks_riskiest() {
        let records = training_set();
        let model = fit_failure_model(&records).unwrap();
        let scores = score_machines(&model, &records).unwrap();

        // Every M-102 row is a failure and every M-101 row is not.
        assert_eq!(scores[0].machine_id, "M-102");
        assert!(scores[0].risk > 0.5);
        let healthy = scores
            .iter()
            .find(|score| score.machine_id == "M-101")
            .unwrap();
        assert!(healthy.risk < scores[0].risk);
        assert!(healthy.risk < 0.5);
    }

    #[test]
    fn single_observation_machine_is_scored_at_that_observation() {
        let mut records = training_set();
        records.push(observation("M-104", 11, 280.0, 72.0, 2.9, 0));

        let model = fit_failure_model(&records).unwrap();
        let scores = score_machines(&model, &records).unwrap();
        let lone = scores
            .iter()
            .find(|score| score.machine_id == "M-104")
            .unwrap();

        let expected = failure_probabilities(&model, &array![[280.0, 72.0, 2.9]])[0];
        assert!((lone.risk - expected).abs() < 1e-12);
    }

    #[test]
    fn accuracy_works_on_small_tables() {
        let records = vec![
            observation("M-101", 1, 120.0, 48.0, 1.1, 0),
            observation("M-101", 2, 140.0, 50.0, 1.2, 0),
            observation("M-102", 3, 320.0, 79.0, 3.3, 1),
            observation("M-102", 4, 340.0, 81.0, 3.4, 1),
        ];

        let accuracy = held_out_accuracy(&records, DEFAULT_SEED).unwrap();
        assert!((0.0..=1.0).contains(&accuracy));

        let too_small = vec![observation("M-101", 1, 120.0, 48.0, 1.1, 0)];
        assert!(held_out_accuracy(&too_small, DEFAULT_SEED).is_err());
    }

    #[test]
    fn identical_input_and_seed_reproduce_accuracy_and_ordering() {
        let records = training_set();

        let first = held_out_accuracy(&records, DEFAULT_SEED).unwrap();
        let second = held_out_accuracy(&records, DEFAULT_SEED).unwrap();
        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first));

        let model = fit_failure_model(&records).unwrap();
        let order_a: Vec<String> = score_machines(&model, &records)
            .unwrap()
            .into_iter()
            .map(|score| score.machine_id)
            .collect();
        let order_b: Vec<String> = score_machines(&model, &records)
            .unwrap()
            .into_iter()
            .map(|score| score.machine_id)
            .collect();
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn non_finite_features_are_rejected() {
        let mut records = training_set();
        records[0].temperature_c = f64::NAN;

        assert!(fit_failure_model(&records).is_err());
    }
}
