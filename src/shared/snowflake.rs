//! Snowflake ID Generator
//!
//! Time-ordered unique IDs for messages. Users, servers and channels use
//! UUIDs; message IDs are snowflakes so channel history sorts by ID.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default epoch (2015-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1420070400000;

/// Snowflake ID generator
pub struct SnowflakeGenerator {
    machine_id: u64,
    epoch: u64,
    sequence: AtomicU64,
    last_timestamp: AtomicU64,
}

impl SnowflakeGenerator {
    /// Create a generator for the given machine ID (10 bits) and custom epoch.
    pub fn new(machine_id: u64, epoch: u64) -> Self {
        Self {
            machine_id: machine_id & 0x3FF,
            epoch,
            sequence: AtomicU64::new(0),
            last_timestamp: AtomicU64::new(0),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let timestamp = self.current_timestamp();
        let last = self.last_timestamp.load(Ordering::SeqCst);

        let sequence = if timestamp == last {
            self.sequence.fetch_add(1, Ordering::SeqCst) & 0xFFF
        } else {
            self.last_timestamp.store(timestamp, Ordering::SeqCst);
            self.sequence.store(0, Ordering::SeqCst);
            0
        };

        let id = ((timestamp - self.epoch) << 22) | (self.machine_id << 12) | sequence;

        id as i64
    }

    fn current_timestamp(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }
}

impl Default for SnowflakeGenerator {
    fn default() -> Self {
        Self::new(1, DEFAULT_EPOCH)
    }
}

/// Extract the millisecond timestamp embedded in a snowflake.
pub fn extract_timestamp(snowflake: i64, epoch: u64) -> u64 {
    ((snowflake as u64) >> 22) + epoch
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_unique() {
        let gen = SnowflakeGenerator::default();
        let ids: HashSet<i64> = (0..1000).map(|_| gen.generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn generated_ids_are_monotonic_across_milliseconds() {
        let gen = SnowflakeGenerator::default();
        let first = gen.generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = gen.generate();
        assert!(second > first);
    }

    #[test]
    fn timestamp_round_trips() {
        let gen = SnowflakeGenerator::new(3, DEFAULT_EPOCH);
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let id = gen.generate();
        let ts = extract_timestamp(id, DEFAULT_EPOCH);
        assert!(ts >= before && ts < before + 1000);
    }
}
