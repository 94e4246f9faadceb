use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use sampler::{Sample, SampleSink};

/// File written in the working directory when no output path is given
pub const DEFAULT_EXPORT_FILE: &str = "troubleSample.csv";

/// Writes samples as `is_slow,wall_time_us,instructions,cpu_time,cache_misses`
/// lines, with no header. `is_slow` is written as 0 or 1.
pub struct CsvExporter<W: Write> {
    writer: W,
}

impl CsvExporter<BufWriter<File>> {
    /// Creates (or truncates) the export file at `path`
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> CsvExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SampleSink for CsvExporter<W> {
    fn accept(&mut self, sample: &Sample) -> io::Result<()> {
        writeln!(
            self.writer,
            "{},{},{},{},{}",
            u8::from(sample.is_slow),
            sample.wall_time_us,
            sample.instructions,
            sample.cpu_time,
            sample.cache_misses
        )
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Parses one exported record
pub fn parse_record(line: &str) -> Result<Sample> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 5 {
        return Err(anyhow!("expected 5 fields, found {}", fields.len()));
    }

    let is_slow = match fields[0] {
        "0" => false,
        "1" => true,
        other => return Err(anyhow!("is_slow must be 0 or 1, found {:?}", other)),
    };
    let int = |i: usize, name: &str| -> Result<i64> {
        fields[i]
            .parse::<i64>()
            .with_context(|| format!("invalid {} value {:?}", name, fields[i]))
    };

    Ok(Sample {
        is_slow,
        wall_time_us: int(1, "wall_time_us")?,
        instructions: int(2, "instructions")?,
        cpu_time: int(3, "cpu_time")?,
        cache_misses: int(4, "cache_misses")?,
        anomalies: Vec::new(),
    })
}

/// Reads back every record of an export
pub fn parse_csv<R: BufRead>(reader: R) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", i + 1))?;
        let sample = parse_record(&line).with_context(|| format!("Malformed record on line {}", i + 1))?;
        samples.push(sample);
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{BufReader, Cursor};

    fn samples() -> Vec<Sample> {
        vec![
            Sample {
                is_slow: true,
                wall_time_us: 812,
                instructions: 41,
                cpu_time: 790,
                cache_misses: 12_345,
                anomalies: Vec::new(),
            },
            Sample {
                is_slow: false,
                wall_time_us: 3,
                instructions: 0,
                cpu_time: 1,
                cache_misses: 0,
                anomalies: Vec::new(),
            },
        ]
    }

    #[test]
    fn test_record_layout() {
        let mut exporter = CsvExporter::new(Vec::new());
        exporter.accept_batch(&samples()).unwrap();
        exporter.finish().unwrap();

        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert_eq!(text, "1,812,41,790,12345\n0,3,0,1,0\n");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_EXPORT_FILE);

        let mut exporter = CsvExporter::create(&path).unwrap();
        exporter.accept_batch(&samples()).unwrap();
        exporter.finish().unwrap();
        drop(exporter);

        let file = File::open(&path).unwrap();
        let parsed = parse_csv(BufReader::new(file)).unwrap();
        assert_eq!(parsed, samples());
    }

    #[test]
    fn test_empty_export() {
        let parsed = parse_csv(Cursor::new("")).unwrap();
        assert!(parsed.is_empty());
    }

    #[rstest]
    #[case("1,2,3,4")]
    #[case("1,2,3,4,5,6")]
    #[case("2,1,1,1,1")]
    #[case("true,1,1,1,1")]
    #[case("0,1,x,1,1")]
    #[case("")]
    fn test_malformed_records(#[case] line: &str) {
        assert!(parse_record(line).is_err());
    }

    #[test]
    fn test_error_names_line() {
        let err = parse_csv(Cursor::new("0,1,1,1,1\n0,1,1,1\n")).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
