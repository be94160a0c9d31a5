//! Record inspection: loads a run record → prints the metadata block → re-derives the
//! statistics from the raw rows and checks them against the header → prints a delay
//! distribution as an ASCII bar chart.
//!
//! Exit status: 0 when header and rows agree, 1 on disagreement, 3 if the record
//! cannot be read or parsed.

use clap::Parser;
use std::{path::PathBuf, process::ExitCode};

use churn_jitter::{
    sampler::jitter::Sample,
    utils::{
        config::DEFAULT_OUTPUT,
        error::{EXIT_IO, JitterError},
        record::RunRecord,
        stats::{MICROS_PER_SECOND, RunStatistics},
    },
};

// Half a unit in the last printed digit.
const DELAY_TOLERANCE_S: f64 = 0.5e-6 + 1e-12;
const MEMORY_TOLERANCE_KB: f64 = 0.05 + 1e-9;
const BAR_WIDTH: usize = 40;

#[derive(Parser, Debug)]
#[command(name = "inspect", about = "Summarise and cross-check a churn jitter record")]
struct Args {
    /// Record to read
    #[arg(default_value = DEFAULT_OUTPUT)]
    input: PathBuf,

    /// Number of buckets in the delay distribution
    #[arg(long, default_value_t = 10)]
    buckets: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let record = match RunRecord::load(&args.input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!(" Failed to read {}: {}", args.input.display(), JitterError::from(e));
            return ExitCode::from(EXIT_IO);
        }
    };

    print_metadata(&record);

    let consistent = match RunStatistics::compute(&record.samples) {
        Some(derived) => compare(&record.statistics(), &derived),
        None => {
            println!("No samples recorded.");
            record.metadata.samples == 0
        }
    };

    plot_delays(&record.samples, args.buckets.max(1));

    if consistent {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_metadata(record: &RunRecord) {
    let m = &record.metadata;
    println!("RUN RECORD");
    println!("=====================\n");
    println!("  Test:       {}", m.label);
    println!("  VM:         {}", m.vm);
    println!("  Date:       {}", m.date);
    println!("  Samples:    {}", m.samples);
    if let (Some(first), Some(last)) = (record.samples.first(), record.samples.last()) {
        let span_s = (last.timestamp_millis - first.timestamp_millis) as f64 / 1_000.0;
        println!("  Span:       {:.3} seconds", span_s);
    }
    println!();
}

/// Prints stated vs derived figures; returns `false` if any pair disagrees beyond rounding.
fn compare(stated: &RunStatistics, derived: &RunStatistics) -> bool {
    println!(
        "{:<12} {:>16} {:>16} {:>4}",
        "Field", "Header", "From rows", ""
    );
    println!("{}", "=".repeat(52));

    let rows = [
        ("Max Memory", stated.max_memory, derived.max_memory, MEMORY_TOLERANCE_KB),
        ("Min Memory", stated.min_memory, derived.min_memory, MEMORY_TOLERANCE_KB),
        ("Max Delay", stated.max_delay, derived.max_delay, DELAY_TOLERANCE_S),
        ("Min Delay", stated.min_delay, derived.min_delay, DELAY_TOLERANCE_S),
        ("Avg Delay", stated.mean_delay, derived.mean_delay, DELAY_TOLERANCE_S),
        ("Std Dev", stated.std_dev_delay, derived.std_dev_delay, DELAY_TOLERANCE_S),
    ];

    let mut consistent = true;
    for (name, header, rows_value, tolerance) in rows {
        let ok = (header - rows_value).abs() <= tolerance;
        consistent &= ok;
        println!(
            "{:<12} {:>16.6} {:>16.6} {:>4}",
            name,
            header,
            rows_value,
            if ok { "ok" } else { "DIFF" }
        );
    }
    println!();
    consistent
}

/// ASCII histogram of delays (▓ block), equal-width buckets between min and max.
fn plot_delays(samples: &[Sample], buckets: usize) {
    let (Some(min), Some(max)) = (
        samples.iter().map(|s| s.delay_micros).min(),
        samples.iter().map(|s| s.delay_micros).max(),
    ) else {
        return;
    };

    let span = (i128::from(max) - i128::from(min)).max(1) as f64;
    let mut counts = vec![0usize; buckets];
    for s in samples {
        counts[bucket_of(s.delay_micros, min, span, buckets)] += 1;
    }

    println!("Delay distribution:");
    let peak = counts.iter().copied().max().unwrap_or(1).max(1) as f64;
    for (i, count) in counts.iter().enumerate() {
        let lower_us = min as f64 + span * i as f64 / buckets as f64;
        let width = ((*count as f64 / peak) * BAR_WIDTH as f64) as usize;
        println!(
            "  {:>10.6}s: {}{} ({})",
            lower_us / MICROS_PER_SECOND,
            "▓".repeat(width),
            " ".repeat(BAR_WIDTH.saturating_sub(width)),
            count
        );
    }
    println!();
}

/// Bucket index for `delay` in `[min, min + span]`; offsets are taken in `i128` so extreme
/// rows cannot overflow.
fn bucket_of(delay: i64, min: i64, span: f64, buckets: usize) -> usize {
    let offset = (i128::from(delay) - i128::from(min)) as f64;
    ((offset / span * buckets as f64) as usize).min(buckets - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delays(values: &[i64]) -> Vec<Sample> {
        values
            .iter()
            .map(|d| Sample {
                delay_micros: *d,
                ..Sample::default()
            })
            .collect()
    }

    #[test]
    fn extreme_delays_land_in_end_buckets() {
        let span = (i128::from(i64::MAX) - i128::from(i64::MIN)) as f64;
        assert_eq!(bucket_of(i64::MIN, i64::MIN, span, 10), 0);
        assert_eq!(bucket_of(i64::MAX, i64::MIN, span, 10), 9);
        assert_eq!(bucket_of(0, i64::MIN, span, 10), 5);
    }

    #[test]
    fn plotting_full_range_does_not_overflow() {
        plot_delays(&delays(&[i64::MIN, -1, 0, i64::MAX]), 4);
        plot_delays(&delays(&[7, 7, 7]), 3);
    }

    #[test]
    fn identical_records_compare_clean() {
        let samples = delays(&[100, 250, -40]);
        let stats = RunStatistics::compute(&samples).unwrap();
        assert!(compare(&stats, &stats));

        let mut shifted = stats;
        shifted.max_delay += 1e-3;
        assert!(!compare(&shifted, &stats));
    }
}
