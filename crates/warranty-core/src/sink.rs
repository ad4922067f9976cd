//! Output seam for result records.

use crate::error::Result;
use crate::types::ResultRecord;

/// Destination that result records are appended to, one per identifier.
///
/// Append is the only mutation: implementations must keep records in the
/// order they were appended.
pub trait RecordSink {
    /// Persist one record after any previously appended ones.
    fn append(&mut self, record: &ResultRecord) -> Result<()>;
}

/// In-memory sink, used where records only need to be collected.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Records in append order
    pub records: Vec<ResultRecord>,
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &ResultRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Identifier, LookupStatus};

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::default();
        for serial in ["A1", "B2", "C3"] {
            let record = ResultRecord::unavailable(
                Identifier::new(serial).expect("valid identifier"),
                LookupStatus::Unknown,
            );
            sink.append(&record).expect("append record");
        }

        let serials: Vec<_> = sink
            .records
            .iter()
            .map(|r| r.identifier.as_str().to_string())
            .collect();
        assert_eq!(serials, vec!["A1", "B2", "C3"]);
    }
}
