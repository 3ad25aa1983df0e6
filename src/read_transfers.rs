//! Reading the transfer list.
//!
//! The input is a headerless CSV file with one transfer per line:
//!
//! ```text
//! block_id,contract_id,from_address,to_address,amount
//! ```
//!
//! Every record is validated in full, including records the filter will later
//! reject, and the first malformed record ends the read with an error.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{GraphError, Result};
use crate::schemas::RawTransfer;

/// Number of fields in a transfer record
pub const FIELD_COUNT: usize = 5;

/// Iterator over the transfers of a CSV source, in file order.
pub struct TransferReader<R: Read> {
    inner: csv::Reader<R>,
    record: csv::StringRecord,
    failed: bool,
}

impl TransferReader<File> {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| GraphError::io(format!("opening {}", path.display()), e))?;
        Ok(Self::new(file))
    }
}

impl<R: Read> TransferReader<R> {
    pub fn new(source: R) -> Self {
        let inner = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(source);
        Self {
            inner,
            record: csv::StringRecord::new(),
            failed: false,
        }
    }

    fn read_next(&mut self) -> Result<Option<RawTransfer>> {
        match self.inner.read_record(&mut self.record) {
            Ok(false) => Ok(None),
            Ok(true) => {
                let line = self.record.position().map_or(0, |p| p.line());
                parse_record(&self.record, line).map(Some)
            }
            Err(e) => Err(from_csv_error(e)),
        }
    }
}

impl<R: Read> Iterator for TransferReader<R> {
    type Item = Result<RawTransfer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_next() {
            Ok(transfer) => transfer.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse one record; `line` is 1-based and only used in diagnostics.
pub fn parse_record(record: &csv::StringRecord, line: u64) -> Result<RawTransfer> {
    if record.len() != FIELD_COUNT {
        return Err(GraphError::InputFormat {
            line,
            message: format!("expected {} fields, found {}", FIELD_COUNT, record.len()),
        });
    }

    Ok(RawTransfer {
        block_id: parse_id(&record[0], "block_id", line)?,
        contract_id: parse_id(&record[1], "contract_id", line)?,
        from: parse_id(&record[2], "from_address", line)?,
        to: parse_id(&record[3], "to_address", line)?,
        amount: parse_amount(&record[4], line)?,
    })
}

fn parse_id(field: &str, name: &'static str, line: u64) -> Result<u64> {
    field.trim().parse::<u64>().map_err(|e| GraphError::NumericParse {
        line,
        field: name,
        value: field.to_string(),
        reason: e.to_string(),
    })
}

fn parse_amount(field: &str, line: u64) -> Result<f64> {
    let invalid = |reason: String| GraphError::NumericParse {
        line,
        field: "amount",
        value: field.to_string(),
        reason,
    };

    let amount: f64 = field.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    if !amount.is_finite() {
        return Err(invalid("amount must be finite".to_string()));
    }
    if amount < 0.0 {
        return Err(invalid("amount must not be negative".to_string()));
    }
    Ok(amount)
}

fn from_csv_error(err: csv::Error) -> GraphError {
    let line = err.position().map_or(0, |p| p.line());
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => GraphError::io("reading transfer records", e),
        csv::ErrorKind::Utf8 { err, .. } => GraphError::InputFormat {
            line,
            message: err.to_string(),
        },
        _ => GraphError::InputFormat { line, message },
    }
}
