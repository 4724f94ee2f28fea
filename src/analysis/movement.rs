//! Daily aggregates over persisted rows.

use std::collections::BTreeMap;

use crate::db::LogEntry;

use super::{config::ClusteringConfig, kmeans};

/// Nominal time between samples at the default 5 Hz cadence.
pub const SAMPLE_PERIOD_SECS: f64 = 0.2;

/// Number of rows flagged as moving.
pub fn calculate_daily_stat(rows: &[LogEntry]) -> usize {
    rows.iter().filter(|entry| entry.reading.is_moving).count()
}

/// Approximate active time: sample count × nominal period. Gaps in sampling (the
/// process being down, for example) are not visible here and undercount.
pub fn active_seconds(moving_samples: usize) -> f64 {
    moving_samples as f64 * SAMPLE_PERIOD_SECS
}

/// Groups rows by acceleration vector into `k` posture clusters.
///
/// With fewer than `k` rows (or none, or `k == 0`) the rows come back untouched and
/// every `cluster_id` stays `None`.
pub fn run_clustering(rows: Vec<LogEntry>, k: usize) -> Vec<LogEntry> {
    run_clustering_with(rows, k, &ClusteringConfig::default())
}

pub fn run_clustering_with(
    mut rows: Vec<LogEntry>,
    k: usize,
    config: &ClusteringConfig,
) -> Vec<LogEntry> {
    let points: Vec<kmeans::Point> = rows.iter().map(|entry| entry.reading.acceleration()).collect();
    let Some(result) = kmeans::fit(&points, k, config) else {
        return rows;
    };

    for (entry, label) in rows.iter_mut().zip(result.labels) {
        entry.cluster_id = Some(label);
    }
    rows
}

/// Rows per cluster label, ascending by label. Unlabelled rows are ignored.
pub fn cluster_sizes(rows: &[LogEntry]) -> Vec<(usize, usize)> {
    let mut sizes = BTreeMap::new();
    for label in rows.iter().filter_map(|entry| entry.cluster_id) {
        *sizes.entry(label).or_insert(0usize) += 1;
    }
    sizes.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SensorReading;
    use chrono::Local;

    fn entry(id: i64, acc: [f64; 3], is_moving: bool) -> LogEntry {
        LogEntry {
            id,
            reading: SensorReading {
                timestamp: Local::now(),
                acc_x: acc[0],
                acc_y: acc[1],
                acc_z: acc[2],
                light_level: 100.0,
                is_moving,
            },
            cluster_id: None,
        }
    }

    #[test]
    fn daily_stat_counts_moving_rows() {
        assert_eq!(calculate_daily_stat(&[]), 0);

        let rows = vec![
            entry(1, [0.0, 9.8, 0.0], false),
            entry(2, [3.0, 7.0, 1.0], true),
            entry(3, [2.0, 8.0, 1.0], true),
            entry(4, [0.0, 9.8, 0.1], false),
        ];
        assert_eq!(calculate_daily_stat(&rows), 2);
        assert!((active_seconds(calculate_daily_stat(&rows)) - 0.4).abs() < 1e-12);
        assert_eq!(active_seconds(0), 0.0);
    }

    #[test]
    fn too_few_rows_are_returned_unchanged() {
        assert!(run_clustering(Vec::new(), 3).is_empty());

        let rows = vec![entry(1, [0.0, 9.8, 0.0], false), entry(2, [1.0, 1.0, 1.0], true)];
        let result = run_clustering(rows.clone(), 3);
        assert_eq!(result, rows);
        assert!(result.iter().all(|entry| entry.cluster_id.is_none()));

        assert_eq!(run_clustering(rows.clone(), 0), rows);
    }

    #[test]
    fn labels_every_row_and_keeps_order() {
        let mut rows = Vec::new();
        for i in 0..30 {
            let flat = i % 2 == 0;
            let acc = if flat { [0.0, 9.8, 0.0] } else { [6.9, 6.9, 0.0] };
            rows.push(entry(i, acc, false));
        }

        let result = run_clustering(rows, 2);
        assert_eq!(result.len(), 30);
        assert!(result.iter().enumerate().all(|(i, e)| e.id == i as i64));

        let flat_label = result[0].cluster_id.unwrap();
        let tilted_label = result[1].cluster_id.unwrap();
        assert_ne!(flat_label, tilted_label);
        for (i, entry) in result.iter().enumerate() {
            let expected = if i % 2 == 0 { flat_label } else { tilted_label };
            assert_eq!(entry.cluster_id, Some(expected));
        }
        assert_eq!(cluster_sizes(&result), {
            let mut sizes = vec![(flat_label, 15), (tilted_label, 15)];
            sizes.sort();
            sizes
        });
    }

    #[test]
    fn clustering_is_reproducible() {
        let rows: Vec<LogEntry> = (0..50)
            .map(|i| {
                let t = f64::from(i);
                entry(i64::from(i), [t.sin() * 3.0, 9.8 - t.cos(), (t * 0.3).sin()], false)
            })
            .collect();

        let first = run_clustering(rows.clone(), 3);
        let second = run_clustering(rows, 3);
        assert_eq!(first, second);
    }
}
