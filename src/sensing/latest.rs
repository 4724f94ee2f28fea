use std::sync::{
    atomic::{AtomicU64, Ordering},
    PoisonError, RwLock,
};

use serde::Serialize;

use crate::models::SensorReading;

/// The most recent reading with its publication number. A higher `seq` is newer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestSnapshot {
    pub seq: u64,
    pub reading: SensorReading,
}

/// Last-write-wins slot shared between the sampler and any number of readers.
/// Advisory only: nothing persisted depends on it.
#[derive(Debug, Default)]
pub struct LatestReading {
    next_seq: AtomicU64,
    slot: RwLock<Option<LatestSnapshot>>,
}

impl LatestReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, reading: SensorReading) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map_or(true, |current| current.seq < seq) {
            *slot = Some(LatestSnapshot { seq, reading });
        }
        seq
    }

    pub fn snapshot(&self) -> Option<LatestSnapshot> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reading(&self) -> Option<SensorReading> {
        self.snapshot().map(|snapshot| snapshot.reading)
    }

    /// Sequence number of the newest snapshot, 0 before the first publish.
    pub fn sequence(&self) -> u64 {
        self.snapshot().map_or(0, |snapshot| snapshot.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::{sync::Arc, thread};

    fn reading(light_level: f64) -> SensorReading {
        SensorReading {
            timestamp: Local::now(),
            acc_x: 0.0,
            acc_y: 9.8,
            acc_z: 0.0,
            light_level,
            is_moving: false,
        }
    }

    #[test]
    fn empty_until_first_publish() {
        let latest = LatestReading::new();
        assert!(latest.reading().is_none());
        assert_eq!(latest.sequence(), 0);
    }

    #[test]
    fn newest_reading_wins() {
        let latest = LatestReading::new();
        assert_eq!(latest.publish(reading(1.0)), 1);
        assert_eq!(latest.publish(reading(2.0)), 2);

        let snapshot = latest.snapshot().unwrap();
        assert_eq!(snapshot.seq, 2);
        assert_eq!(snapshot.reading.light_level, 2.0);
    }

    #[test]
    fn concurrent_publishers_leave_highest_sequence() {
        let latest = Arc::new(LatestReading::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let latest = Arc::clone(&latest);
                thread::spawn(move || {
                    for i in 0..250 {
                        latest.publish(reading(f64::from(t * 1000 + i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(latest.sequence(), 1000);
    }
}
