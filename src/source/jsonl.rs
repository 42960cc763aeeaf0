//! Line-delimited JSON event dumps.
//!
//! Each non-blank line holds one [`RawEvent`]:
//!
//! ```text
//! {"serial":1,"banks":[{"name":"43FS","measurements":[{"channel":0,"samples":[1.0,2.0]}]}]}
//! ```

use super::{BankDecoder, EventDecoder, RawEvent};
use crate::acquisition::measurement::MeasurementBatch;
use crate::error::{AppResult, DaqError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Iterator over the raw event lines of a dump.
///
/// Blank lines are skipped. Read failures are returned as [`DaqError::Io`] and
/// end the run. A line that is not valid UTF-8 is a [`DaqError::Decode`], and
/// JSON parsing is left to [`JsonEventDecoder`], so a bad line only costs one
/// event.
pub struct EventLines<R> {
    reader: R,
    buf: Vec<u8>,
    line: u64,
}

impl EventLines<BufReader<File>> {
    /// Open a dump file.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            DaqError::Io(std::io::Error::new(
                e.kind(),
                format!("cannot open '{}': {}", path.as_ref().display(), e),
            ))
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventLines<R> {
    /// Wrap any buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventLines<R> {
    type Item = AppResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(e) => return Some(Err(DaqError::Io(e))),
            }

            let bytes = self.buf.trim_ascii();
            if bytes.is_empty() {
                continue;
            }
            return Some(String::from_utf8(bytes.to_vec()).map_err(|e| {
                DaqError::Decode(format!("line {}: {}", self.line, e))
            }));
        }
    }
}

/// Parses a JSON line into a [`RawEvent`] and selects the configured bank.
#[derive(Debug, Clone)]
pub struct JsonEventDecoder {
    banks: BankDecoder,
}

impl JsonEventDecoder {
    /// Decoder for banks named `bank`.
    pub fn new(bank: impl Into<String>) -> Self {
        Self {
            banks: BankDecoder::new(bank),
        }
    }
}

impl EventDecoder for JsonEventDecoder {
    type Event = str;

    fn measurements(&self, line: &str) -> AppResult<Option<Vec<MeasurementBatch>>> {
        let event: RawEvent = serde_json::from_str(line)?;
        self.banks.measurements(&event)
    }
}
