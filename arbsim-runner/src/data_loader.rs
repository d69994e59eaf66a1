//! Quote file loading.
//!
//! Input files are headerless CSV with exactly seven fields per record:
//!
//! ```text
//! timestamp,instrument,event_type,bid_size,bid,ask,ask_size
//! ```
//!
//! [`CsvQuoteSource`] streams records lazily behind the core's `QuoteSource`
//! trait; [`load_quotes`] reads a whole file for in-memory replays (sweeps).
//! Every malformed record is fatal and reported with its 1-based line.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use arbsim_core::{Instrument, Quote, QuoteSource, SourceError};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

const FIELD_COUNT: usize = 7;

pub struct CsvQuoteSource<R> {
    reader: csv::Reader<R>,
    record: StringRecord,
    name: String,
    records: u64,
    finished: bool,
}

impl CsvQuoteSource<File> {
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| SourceError::Io {
            source_name: name.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %name, "opened quote file");
        Ok(Self::from_reader(file, name))
    }
}

impl<R: Read> CsvQuoteSource<R> {
    pub fn from_reader(reader: R, name: impl Into<String>) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        Self {
            reader,
            record: StringRecord::new(),
            name: name.into(),
            records: 0,
            finished: false,
        }
    }

    /// Records successfully parsed so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    fn malformed(&self, line: u64, reason: impl Into<String>) -> SourceError {
        SourceError::Malformed {
            source_name: self.name.clone(),
            line,
            reason: reason.into(),
        }
    }

    fn csv_error(&self, err: csv::Error) -> SourceError {
        match err.position() {
            Some(pos) => self.malformed(pos.line(), err.to_string()),
            None => SourceError::Io {
                source_name: self.name.clone(),
                reason: err.to_string(),
            },
        }
    }
}

impl<R: Read> QuoteSource for CsvQuoteSource<R> {
    fn next_quote(&mut self) -> Result<Option<Quote>, SourceError> {
        if self.finished {
            return Ok(None);
        }
        let has_record = match self.reader.read_record(&mut self.record) {
            Ok(has_record) => has_record,
            Err(e) => return Err(self.csv_error(e)),
        };
        if !has_record {
            self.finished = true;
            if self.records == 0 {
                warn!(source = %self.name, "quote file contains no records");
            }
            return Ok(None);
        }

        let line = self.record.position().map_or(0, |p| p.line());
        let quote = parse_record(&self.record).map_err(|reason| self.malformed(line, reason))?;
        self.records += 1;
        Ok(Some(quote))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn parse_record(record: &StringRecord) -> Result<Quote, String> {
    if record.len() != FIELD_COUNT {
        return Err(format!(
            "expected {FIELD_COUNT} fields, got {}",
            record.len()
        ));
    }
    let field = |i: usize| record.get(i).unwrap_or("");

    Ok(Quote {
        ts: parse_field(field(0), "timestamp")?,
        instrument: field(1).parse::<Instrument>().map_err(|e| e.to_string())?,
        event_type: parse_field(field(2), "event_type")?,
        bid_size: parse_field(field(3), "bid_size")?,
        bid: parse_field(field(4), "bid")?,
        ask: parse_field(field(5), "ask")?,
        ask_size: parse_field(field(6), "ask_size")?,
    })
}

fn parse_field<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("cannot parse {what} from '{raw}'"))
}

/// Read a whole quote file into memory.
pub fn load_quotes(path: &Path) -> Result<Vec<Quote>, SourceError> {
    let mut source = CsvQuoteSource::from_path(path)?;
    let mut quotes = Vec::new();
    while let Some(q) = source.next_quote()? {
        quotes.push(q);
    }
    debug!(path = %path.display(), count = quotes.len(), "loaded quotes");
    Ok(quotes)
}

/// BLAKE3 over the raw bytes of every file, in order.
///
/// Each file is framed by its length so that moving bytes from one file to
/// the next changes the hash.
pub fn dataset_hash(paths: &[&Path]) -> Result<String, SourceError> {
    let mut hasher = blake3::Hasher::new();
    for path in paths {
        let io_err = |e: io::Error| SourceError::Io {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        };
        let mut file = File::open(path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        hasher.update(&len.to_le_bytes());
        io::copy(&mut file, &mut hasher).map_err(io_err)?;
    }
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> CsvQuoteSource<&[u8]> {
        CsvQuoteSource::from_reader(text.as_bytes(), "test.csv")
    }

    fn drain(text: &str) -> Result<Vec<Quote>, SourceError> {
        let mut src = source(text);
        let mut out = Vec::new();
        while let Some(q) = src.next_quote()? {
            out.push(q);
        }
        Ok(out)
    }

    #[test]
    fn parses_records() {
        let quotes = drain(
            "1000,FutureA,0,5,100.25,100.5,7\n\
             1001,FutureB,2,0,101,101.75,3\n",
        )
        .unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(
            quotes[0],
            Quote {
                ts: 1000,
                instrument: Instrument::FutureA,
                event_type: 0,
                bid_size: 5,
                bid: 100.25,
                ask: 100.5,
                ask_size: 7,
            }
        );
        assert_eq!(quotes[1].instrument, Instrument::FutureB);
        assert_eq!(quotes[1].event_type, 2);
        assert_eq!(quotes[1].bid_size, 0);
    }

    #[test]
    fn skips_empty_lines_and_tolerates_crlf() {
        let quotes = drain("\n1,FutureA,0,1,1.0,2.0,1\r\n\r\n2,FutureB,0,1,1.0,2.0,1\r\n").unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[1].ts, 2);
    }

    #[test]
    fn wrong_field_count_reports_line() {
        let err = drain("1,FutureA,0,1,1.0,2.0,1\n2,FutureA,0,1,1.0,2.0\n").unwrap_err();
        match err {
            SourceError::Malformed { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("expected 7 fields, got 6"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_instrument_is_error() {
        let err = drain("1,FutureC,0,1,1.0,2.0,1\n").unwrap_err();
        assert!(matches!(err, SourceError::Malformed { line: 1, .. }));
        assert!(err.to_string().contains("FutureC"));
    }

    #[test]
    fn bad_number_is_error() {
        let err = drain("1,FutureA,0,1,1.0,2.0,1\n2,FutureA,0,x,1.0,2.0,1\n").unwrap_err();
        match err {
            SourceError::Malformed { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("bid_size"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_file_yields_nothing() {
        let mut src = source("");
        assert!(src.next_quote().unwrap().is_none());
        assert!(src.next_quote().unwrap().is_none());
        assert_eq!(src.records_read(), 0);
    }

    #[test]
    fn load_and_hash_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, "1,FutureA,0,1,1.0,2.0,1\n").unwrap();
        std::fs::write(&b, "2,FutureB,0,1,1.0,2.0,1\n").unwrap();

        assert_eq!(load_quotes(&a).unwrap().len(), 1);

        let h1 = dataset_hash(&[a.as_path(), b.as_path()]).unwrap();
        assert_eq!(h1, dataset_hash(&[a.as_path(), b.as_path()]).unwrap());
        assert_ne!(h1, dataset_hash(&[b.as_path(), a.as_path()]).unwrap());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CsvQuoteSource::from_path(Path::new("/nonexistent/quotes.csv"))
            .err()
            .unwrap();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
