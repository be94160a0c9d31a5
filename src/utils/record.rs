//! Persisted run record: metadata block, column header, then one row per sample.
//!
//! ```text
//! "Test=","GC Stress"
//! "VM=","churn_jitter 0.1.0 (x86_64-linux, heap)"
//! "Date=","2026-10-18 09:15:00"
//! "Samples=",300
//! "Max Memory=",412345.0
//! ...
//! "Std Dev=",0.000812
//! "Time","Used Memory","Delay"
//! 1760778900123,412001,132
//! ```
//!
//! Keys and the `Test`/`VM`/`Date` values are always quoted; numeric values and data rows
//! are bare. Metadata always precedes the rows so a streaming reader can set up before the data.
//! Every record occupies exactly one line. The reader checks each raw line against the three
//! shapes (quoted metadata, quoted column header, bare integer row) before splitting it, and
//! rejects anything else, blank lines included, with the offending line number.

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, Writer, WriterBuilder};
use std::{
    collections::HashMap,
    fmt::Display,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
    str::FromStr,
};

use crate::sampler::jitter::Sample;
use crate::utils::{error::RecordError, stats::RunStatistics};

const KEY_TEST: &str = "Test=";
const KEY_VM: &str = "VM=";
const KEY_DATE: &str = "Date=";
const KEY_SAMPLES: &str = "Samples=";
const KEY_MAX_MEMORY: &str = "Max Memory=";
const KEY_MIN_MEMORY: &str = "Min Memory=";
const KEY_MAX_DELAY: &str = "Max Delay=";
const KEY_MIN_DELAY: &str = "Min Delay=";
const KEY_AVG_DELAY: &str = "Avg Delay=";
const KEY_STD_DEV: &str = "Std Dev=";

const KNOWN_KEYS: [&str; 10] = [
    KEY_TEST,
    KEY_VM,
    KEY_DATE,
    KEY_SAMPLES,
    KEY_MAX_MEMORY,
    KEY_MIN_MEMORY,
    KEY_MAX_DELAY,
    KEY_MIN_DELAY,
    KEY_AVG_DELAY,
    KEY_STD_DEV,
];

// Metadata values written as quoted text; every other value is a bare number.
const TEXT_KEYS: [&str; 3] = [KEY_TEST, KEY_VM, KEY_DATE];

pub const COLUMN_HEADER: [&str; 3] = ["Time", "Used Memory", "Delay"];
const HEADER_LINE: &str = "\"Time\",\"Used Memory\",\"Delay\"";

/// Run metadata as it appears in the record header block.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMetadata {
    pub label: String,
    pub vm: String,
    pub date: String,
    pub samples: usize,
    /// Kilobytes.
    pub max_memory: f64,
    pub min_memory: f64,
    /// Seconds.
    pub max_delay: f64,
    pub min_delay: f64,
    pub avg_delay: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub metadata: RecordMetadata,
    pub samples: Vec<Sample>,
}

impl RunRecord {
    pub fn new(
        label: impl Into<String>,
        vm: impl Into<String>,
        date: impl Into<String>,
        stats: &RunStatistics,
        samples: Vec<Sample>,
    ) -> Self {
        Self {
            metadata: RecordMetadata {
                label: label.into(),
                vm: vm.into(),
                date: date.into(),
                samples: samples.len(),
                max_memory: stats.max_memory,
                min_memory: stats.min_memory,
                max_delay: stats.max_delay,
                min_delay: stats.min_delay,
                avg_delay: stats.mean_delay,
                std_dev: stats.std_dev_delay,
            },
            samples,
        }
    }

    /// Statistics as stated in the metadata block.
    pub fn statistics(&self) -> RunStatistics {
        let m = &self.metadata;
        RunStatistics {
            count: m.samples,
            max_delay: m.max_delay,
            min_delay: m.min_delay,
            mean_delay: m.avg_delay,
            std_dev_delay: m.std_dev,
            max_memory: m.max_memory,
            min_memory: m.min_memory,
        }
    }

    // ========================================================================
    // Encode
    // ========================================================================

    pub fn write_to<W: Write>(&self, mut out: W) -> Result<(), RecordError> {
        let m = &self.metadata;

        {
            let mut text = record_writer(QuoteStyle::Always, &mut out);
            for (key, value) in [(KEY_TEST, &m.label), (KEY_VM, &m.vm), (KEY_DATE, &m.date)] {
                if value.contains(['\n', '\r']) {
                    return Err(RecordError::InvalidValue {
                        key,
                        reason: "line breaks are not allowed".to_string(),
                    });
                }
                text.write_record([key, value.as_str()])?;
            }
            text.flush()?;
        }

        // keys and column names are text, values are numbers: non-numeric quoting fits both
        let mut wtr = record_writer(QuoteStyle::NonNumeric, &mut out);
        write_field(&mut wtr, KEY_SAMPLES, &m.samples.to_string())?;
        write_field(&mut wtr, KEY_MAX_MEMORY, &format!("{:.1}", m.max_memory))?;
        write_field(&mut wtr, KEY_MIN_MEMORY, &format!("{:.1}", m.min_memory))?;
        write_field(&mut wtr, KEY_MAX_DELAY, &format!("{:.6}", m.max_delay))?;
        write_field(&mut wtr, KEY_MIN_DELAY, &format!("{:.6}", m.min_delay))?;
        write_field(&mut wtr, KEY_AVG_DELAY, &format!("{:.6}", m.avg_delay))?;
        write_field(&mut wtr, KEY_STD_DEV, &format!("{:.6}", m.std_dev))?;

        wtr.write_record(COLUMN_HEADER)?;
        for sample in &self.samples {
            wtr.serialize(sample)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Creates (or truncates) `path` and writes the record. A failed write may leave a
    /// partial file behind.
    pub fn save(&self, path: &Path) -> Result<(), RecordError> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    pub fn to_text(&self) -> Result<String, RecordError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| RecordError::malformed(0, e.to_string()))
    }

    // ========================================================================
    // Decode
    // ========================================================================

    pub fn parse<R: Read>(input: R) -> Result<Self, RecordError> {
        let mut fields: HashMap<&'static str, (u64, String)> = HashMap::new();
        let mut seen_header = false;
        let mut samples = Vec::new();

        for (idx, raw) in BufReader::new(input).lines().enumerate() {
            let raw = raw?;
            let line = idx as u64 + 1;

            match classify(&raw, line)? {
                Line::Field { key, value } => {
                    if seen_header {
                        return Err(RecordError::malformed(line, "metadata after column header"));
                    }
                    if fields.insert(key, (line, value)).is_some() {
                        return Err(RecordError::DuplicateField {
                            line,
                            key: key.to_string(),
                        });
                    }
                }
                Line::Header => {
                    if seen_header {
                        return Err(RecordError::malformed(line, "repeated column header"));
                    }
                    seen_header = true;
                }
                Line::Row(sample) => {
                    if !seen_header {
                        return Err(RecordError::malformed(line, "data row before column header"));
                    }
                    samples.push(sample);
                }
            }
        }

        if !seen_header {
            return Err(RecordError::MissingField("Time,Used Memory,Delay header"));
        }

        let metadata = RecordMetadata {
            label: take(&mut fields, KEY_TEST)?.1,
            vm: take(&mut fields, KEY_VM)?.1,
            date: take(&mut fields, KEY_DATE)?.1,
            samples: number(&mut fields, KEY_SAMPLES)?,
            max_memory: number(&mut fields, KEY_MAX_MEMORY)?,
            min_memory: number(&mut fields, KEY_MIN_MEMORY)?,
            max_delay: number(&mut fields, KEY_MAX_DELAY)?,
            min_delay: number(&mut fields, KEY_MIN_DELAY)?,
            avg_delay: number(&mut fields, KEY_AVG_DELAY)?,
            std_dev: number(&mut fields, KEY_STD_DEV)?,
        };

        if metadata.samples != samples.len() {
            return Err(RecordError::SampleCountMismatch {
                declared: metadata.samples,
                found: samples.len(),
            });
        }

        Ok(Self { metadata, samples })
    }

    pub fn load(path: &Path) -> Result<Self, RecordError> {
        Self::parse(File::open(path)?)
    }
}

fn record_writer<W: Write>(style: QuoteStyle, out: W) -> Writer<W> {
    WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quote_style(style)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out)
}

fn write_field<W: Write>(wtr: &mut Writer<W>, key: &str, value: &str) -> Result<(), RecordError> {
    wtr.write_record([key, value])?;
    Ok(())
}

enum Line {
    Field { key: &'static str, value: String },
    Header,
    Row(Sample),
}

/// Splits one raw line into fields. Quoting is checked by the caller against `raw`.
fn split_fields(raw: &str, line: u64) -> Result<StringRecord, RecordError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());
    let mut record = StringRecord::new();
    if !rdr.read_record(&mut record)? {
        return Err(RecordError::malformed(line, "blank line"));
    }
    Ok(record)
}

fn classify(raw: &str, line: u64) -> Result<Line, RecordError> {
    if raw.trim().is_empty() {
        return Err(RecordError::malformed(line, "blank line"));
    }
    let record = split_fields(raw, line)?;

    match record.len() {
        2 => {
            let key = &record[0];
            if !key.ends_with('=') {
                return Err(RecordError::malformed(
                    line,
                    format!("metadata key '{}' does not end with '='", key),
                ));
            }
            let known = KNOWN_KEYS
                .iter()
                .copied()
                .find(|k| *k == key)
                .ok_or_else(|| RecordError::malformed(line, format!("unknown field '{}'", key)))?;

            let rest = raw
                .strip_prefix(format!("\"{}\",", known).as_str())
                .ok_or_else(|| {
                    RecordError::malformed(line, format!("metadata key '{}' must be quoted", key))
                })?;
            let quoted = rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"');
            if TEXT_KEYS.contains(&known) {
                if !quoted {
                    return Err(RecordError::malformed(
                        line,
                        format!("{} value must be quoted", known),
                    ));
                }
            } else if rest.contains('"') {
                return Err(RecordError::malformed(
                    line,
                    format!("{} value must be a bare number", known),
                ));
            }

            Ok(Line::Field {
                key: known,
                value: record[1].to_string(),
            })
        }
        3 => {
            if record.iter().eq(COLUMN_HEADER.iter().copied()) {
                if raw != HEADER_LINE {
                    return Err(RecordError::malformed(line, "column header must be quoted"));
                }
                return Ok(Line::Header);
            }
            if record[0].ends_with('=') {
                return Err(RecordError::malformed(
                    line,
                    format!("metadata line '{}' has 3 fields, expected 2", &record[0]),
                ));
            }
            if raw.contains('"') {
                return Err(RecordError::malformed(
                    line,
                    "data row fields must be bare integers",
                ));
            }
            record
                .deserialize::<Sample>(None)
                .map(Line::Row)
                .map_err(|e| {
                    RecordError::malformed(line, format!("data row is not three integers: {}", e))
                })
        }
        n => Err(RecordError::malformed(
            line,
            format!("expected 2 or 3 fields, found {}", n),
        )),
    }
}

fn take(
    fields: &mut HashMap<&'static str, (u64, String)>,
    key: &'static str,
) -> Result<(u64, String), RecordError> {
    fields.remove(key).ok_or(RecordError::MissingField(key))
}

fn number<T>(fields: &mut HashMap<&'static str, (u64, String)>, key: &'static str) -> Result<T, RecordError>
where
    T: FromStr,
    T::Err: Display,
{
    let (line, raw) = take(fields, key)?;
    raw.trim().parse::<T>().map_err(|e| {
        RecordError::malformed(line, format!("{} value '{}' is not a number: {}", key, raw, e))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: i64, mem: i64, delay: i64) -> Sample {
        Sample {
            timestamp_millis: t,
            memory_kilobytes: mem,
            delay_micros: delay,
        }
    }

    fn record(samples: Vec<Sample>) -> RunRecord {
        let stats = RunStatistics::compute(&samples).unwrap();
        RunRecord::new(
            "GC Stress",
            "churn_jitter 0.1.0",
            "2024-01-02 03:04:05",
            &stats,
            samples,
        )
    }

    const TWO_ROWS: &str = "\"Test=\",\"GC Stress\"\n\
\"VM=\",\"churn_jitter 0.1.0\"\n\
\"Date=\",\"2024-01-02 03:04:05\"\n\
\"Samples=\",2\n\
\"Max Memory=\",2048.0\n\
\"Min Memory=\",1024.0\n\
\"Max Delay=\",0.500000\n\
\"Min Delay=\",-0.250000\n\
\"Avg Delay=\",0.125000\n\
\"Std Dev=\",0.530330\n\
\"Time\",\"Used Memory\",\"Delay\"\n\
1700000000000,1024,500000\n\
1700000000100,2048,-250000\n";

    #[test]
    fn writes_exact_layout() {
        let rec = record(vec![
            sample(1_700_000_000_000, 1024, 500_000),
            sample(1_700_000_000_100, 2048, -250_000),
        ]);
        assert_eq!(rec.to_text().unwrap(), TWO_ROWS);
    }

    #[test]
    fn parses_exact_layout() {
        let rec = RunRecord::parse(TWO_ROWS.as_bytes()).unwrap();
        assert_eq!(rec.metadata.label, "GC Stress");
        assert_eq!(rec.metadata.date, "2024-01-02 03:04:05");
        assert_eq!(rec.metadata.samples, 2);
        assert_eq!(rec.metadata.min_delay, -0.25);
        assert_eq!(rec.metadata.std_dev, 0.53033);
        assert_eq!(rec.samples[1], sample(1_700_000_000_100, 2048, -250_000));
    }

    #[test]
    fn round_trip_reproduces_record() {
        // dyadic statistics survive the fixed-precision text exactly
        let original = record(vec![sample(10, 1024, 250_000); 4]);
        let parsed = RunRecord::parse(original.to_text().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn reencoding_is_stable() {
        let original = record(vec![
            sample(1, 100, 123_456),
            sample(2, 300, -17),
            sample(3, 200, 99_999),
        ]);
        let text = original.to_text().unwrap();
        let parsed = RunRecord::parse(text.as_bytes()).unwrap();
        assert_eq!(parsed.samples, original.samples);
        assert_eq!(parsed.metadata.label, original.metadata.label);
        assert!((parsed.metadata.std_dev - original.metadata.std_dev).abs() < 5e-7);
        assert_eq!(parsed.to_text().unwrap(), text);
    }

    #[test]
    fn label_with_comma_and_quote_survives() {
        let mut rec = record(vec![sample(1, 1, 1)]);
        rec.metadata.label = "churn, \"hot\" path".to_string();
        let parsed = RunRecord::parse(rec.to_text().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed.metadata.label, "churn, \"hot\" path");
    }

    fn expect_malformed(text: &str, needle: &str) {
        match RunRecord::parse(text.as_bytes()) {
            Err(RecordError::Malformed { reason, .. }) => {
                assert!(reason.contains(needle), "reason '{}' lacks '{}'", reason, needle)
            }
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_three_field_metadata() {
        let text = TWO_ROWS.replace("\"Test=\",\"GC Stress\"", "\"Test=\",\"GC Stress\",\"extra\"");
        expect_malformed(&text, "has 3 fields");
        match RunRecord::parse(text.as_bytes()) {
            Err(RecordError::Malformed { line, .. }) => assert_eq!(line, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_shapes() {
        expect_malformed(&TWO_ROWS.replace("1700000000000,1024,500000", "17,abc,5"), "three integers");
        expect_malformed(&TWO_ROWS.replace("1700000000000,1024,500000", "17,5"), "does not end with '='");
        expect_malformed(&TWO_ROWS.replace("1700000000000,1024,500000", "1,2,3,4"), "found 4");
        expect_malformed(&TWO_ROWS.replace("\"Samples=\",2", "\"Runs=\",2"), "unknown field");
        expect_malformed(&TWO_ROWS.replace("\"Samples=\",2", "\"Samples=\",two"), "not a number");
        expect_malformed(
            &TWO_ROWS.replace("\"Time\",\"Used Memory\",\"Delay\"\n", ""),
            "before column header",
        );
        expect_malformed(&format!("{}\"Test=\",\"again\"\n", TWO_ROWS), "metadata after");
    }

    fn malformed_line(text: &str) -> u64 {
        match RunRecord::parse(text.as_bytes()) {
            Err(RecordError::Malformed { line, .. }) => line,
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_wrong_quoting() {
        let quoted_row = TWO_ROWS.replace(
            "1700000000000,1024,500000",
            "\"1700000000000\",\"1024\",\"500000\"",
        );
        expect_malformed(&quoted_row, "bare integers");
        assert_eq!(malformed_line(&quoted_row), 12);

        let bare_header = TWO_ROWS.replace(HEADER_LINE, "Time,Used Memory,Delay");
        expect_malformed(&bare_header, "column header must be quoted");

        expect_malformed(&TWO_ROWS.replace("\"Samples=\",2", "Samples=,2"), "must be quoted");
        expect_malformed(&TWO_ROWS.replace("\"Samples=\",2", "\"Samples=\",\"2\""), "bare number");
        expect_malformed(
            &TWO_ROWS.replace("\"Test=\",\"GC Stress\"", "\"Test=\",GC Stress"),
            "Test= value must be quoted",
        );
    }

    #[test]
    fn rejects_blank_lines() {
        let between = TWO_ROWS.replace("\"Samples=\",2\n", "\"Samples=\",2\n\n");
        expect_malformed(&between, "blank line");
        assert_eq!(malformed_line(&between), 5);

        let trailing = format!("{}\n", TWO_ROWS);
        assert_eq!(malformed_line(&trailing), 14);

        expect_malformed(&TWO_ROWS.replace("\"Date=", "   \n\"Date="), "blank line");
    }

    #[test]
    fn numeric_looking_text_stays_quoted() {
        let samples = vec![sample(1, 2, 3)];
        let stats = RunStatistics::compute(&samples).unwrap();
        let rec = RunRecord::new("2024", "1.5", "2024-01-02 03:04:05", &stats, samples);
        let text = rec.to_text().unwrap();
        assert!(text.starts_with("\"Test=\",\"2024\"\n\"VM=\",\"1.5\"\n\"Date=\","));

        let parsed = RunRecord::parse(text.as_bytes()).unwrap();
        assert_eq!(parsed.metadata.label, "2024");
        assert_eq!(parsed.metadata.vm, "1.5");
    }

    #[test]
    fn line_break_in_text_is_not_written() {
        let mut rec = record(vec![sample(1, 1, 1)]);
        rec.metadata.label = "two\nlines".to_string();
        assert!(matches!(
            rec.to_text(),
            Err(RecordError::InvalidValue { key: "Test=", .. })
        ));
    }

    #[test]
    fn rejects_missing_and_duplicate_fields() {
        let missing = TWO_ROWS.replace("\"VM=\",\"churn_jitter 0.1.0\"\n", "");
        assert!(matches!(
            RunRecord::parse(missing.as_bytes()),
            Err(RecordError::MissingField("VM="))
        ));

        let dup = TWO_ROWS.replace("\"VM=\",", "\"Test=\",");
        assert!(matches!(
            RunRecord::parse(dup.as_bytes()),
            Err(RecordError::DuplicateField { line: 2, .. })
        ));
    }

    #[test]
    fn rejects_sample_count_mismatch() {
        let text = TWO_ROWS.replace("\"Samples=\",2", "\"Samples=\",3");
        assert!(matches!(
            RunRecord::parse(text.as_bytes()),
            Err(RecordError::SampleCountMismatch { declared: 3, found: 2 })
        ));
    }

    #[test]
    fn save_and_load_through_file() {
        let path = std::env::temp_dir().join(format!("churn_jitter_record_{}.csv", std::process::id()));
        let rec = record(vec![sample(5, 6, 7), sample(8, 9, -10)]);
        rec.save(&path).unwrap();
        let loaded = RunRecord::load(&path).unwrap();
        assert_eq!(loaded.samples, rec.samples);
        let _ = std::fs::remove_file(&path);
    }
}
