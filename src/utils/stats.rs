//! Run summary statistics over a finished sample series.
//!
//! Two passes: the first collects extrema and the delay sum, the second accumulates squared
//! deviations from the mean. Standard deviation uses the sample variance (`n - 1`).
//! Delay figures are reported in seconds, memory figures in kilobytes.
//!
//! Fewer than two samples: the spread is defined as `0.0`. An empty series has no statistics.

use crate::sampler::jitter::Sample;

pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStatistics {
    pub count: usize,
    /// Seconds.
    pub max_delay: f64,
    pub min_delay: f64,
    pub mean_delay: f64,
    pub std_dev_delay: f64,
    /// Kilobytes.
    pub max_memory: f64,
    pub min_memory: f64,
}

impl RunStatistics {
    pub fn compute(samples: &[Sample]) -> Option<Self> {
        let count = samples.len();
        if count == 0 {
            return None;
        }

        // pass 1: extrema and sum
        let mut delay_max = i64::MIN;
        let mut delay_min = i64::MAX;
        let mut mem_max = i64::MIN;
        let mut mem_min = i64::MAX;
        let mut delay_sum: i128 = 0;
        for s in samples {
            delay_max = delay_max.max(s.delay_micros);
            delay_min = delay_min.min(s.delay_micros);
            mem_max = mem_max.max(s.memory_kilobytes);
            mem_min = mem_min.min(s.memory_kilobytes);
            delay_sum += i128::from(s.delay_micros);
        }
        let mean_delay = delay_sum as f64 / count as f64 / MICROS_PER_SECOND;

        // pass 2: squared deviations
        let std_dev_delay = if count < 2 {
            0.0
        } else {
            let sum_squares: f64 = samples
                .iter()
                .map(|s| {
                    let diff = s.delay_micros as f64 / MICROS_PER_SECOND - mean_delay;
                    diff * diff
                })
                .sum();
            (sum_squares / (count - 1) as f64).sqrt()
        };

        Some(Self {
            count,
            max_delay: delay_max as f64 / MICROS_PER_SECOND,
            min_delay: delay_min as f64 / MICROS_PER_SECOND,
            mean_delay,
            std_dev_delay,
            max_memory: mem_max as f64,
            min_memory: mem_min as f64,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use statrs::statistics::Statistics;

    fn series(delays: &[i64], memory: &[i64]) -> Vec<Sample> {
        delays
            .iter()
            .zip(memory.iter().cycle())
            .enumerate()
            .map(|(i, (d, m))| Sample {
                timestamp_millis: 1_000 + i as i64,
                memory_kilobytes: *m,
                delay_micros: *d,
            })
            .collect()
    }

    #[test]
    fn empty_series_has_no_statistics() {
        assert_eq!(RunStatistics::compute(&[]), None);
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let stats = RunStatistics::compute(&series(&[1_234], &[10])).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.std_dev_delay, 0.0);
        assert_eq!(stats.max_delay, 0.001234);
        assert_eq!(stats.min_delay, stats.max_delay);
        assert_eq!(stats.mean_delay, stats.max_delay);
    }

    #[test]
    fn equal_delays_have_zero_spread() {
        let stats = RunStatistics::compute(&series(&[750; 64], &[1, 2, 3])).unwrap();
        assert_eq!(stats.std_dev_delay, 0.0);
        assert_eq!(stats.mean_delay, 0.00075);
        assert_eq!(stats.max_memory, 3.0);
        assert_eq!(stats.min_memory, 1.0);
    }

    #[test]
    fn known_values() {
        let stats = RunStatistics::compute(&series(&[1, 2, 3, 4], &[100])).unwrap();
        assert!((stats.mean_delay - 2.5e-6).abs() < 1e-15);
        assert!((stats.std_dev_delay - (5.0f64 / 3.0).sqrt() * 1e-6).abs() < 1e-15);
        assert_eq!(stats.max_delay, 4e-6);
        assert_eq!(stats.min_delay, 1e-6);
    }

    #[test]
    fn negative_delays_are_kept() {
        let stats = RunStatistics::compute(&series(&[-300, 100, 200], &[5])).unwrap();
        assert_eq!(stats.min_delay, -0.0003);
        assert!(stats.mean_delay.abs() < 1e-12);
    }

    #[test]
    fn ordering_holds_and_matches_statrs() {
        let mut rng = StdRng::seed_from_u64(99);
        for len in [2usize, 3, 10, 300, 2_000] {
            let delays: Vec<i64> = (0..len).map(|_| rng.random_range(-2_000..250_000)).collect();
            let memory: Vec<i64> = (0..len).map(|_| rng.random_range(0..1 << 20)).collect();
            let stats = RunStatistics::compute(&series(&delays, &memory)).unwrap();

            assert!(stats.max_delay >= stats.mean_delay);
            assert!(stats.mean_delay >= stats.min_delay);
            assert!(stats.max_memory >= stats.min_memory);

            let seconds: Vec<f64> = delays.iter().map(|d| *d as f64 / MICROS_PER_SECOND).collect();
            let reference = seconds.iter().std_dev();
            assert!(
                (stats.std_dev_delay - reference).abs() < 1e-9,
                "len={} ours={} statrs={}",
                len,
                stats.std_dev_delay,
                reference
            );
        }
    }
}
