use std::fmt;

use crate::table::{AggregationTable, Entry};

/// Final per-station statistics, sorted by key bytes.
#[derive(Debug, Clone)]
pub struct Report {
    entries: Vec<Entry>,
}

impl Report {
    pub fn new(table: AggregationTable) -> Self {
        let mut entries: Vec<Entry> = table.into_items().collect();
        entries.sort_unstable_by(|a, b| a.key().cmp(b.key()));
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

impl From<AggregationTable> for Report {
    fn from(table: AggregationTable) -> Self {
        Self::new(table)
    }
}

/// `{a=min/mean/max, b=...}` followed by a `<n> stations` line.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{}={:.1}/{:.1}/{:.1}",
                String::from_utf8_lossy(entry.key()),
                entry.min,
                entry.mean(),
                entry.max
            )?;
        }
        writeln!(f, "}}")?;
        writeln!(f, "{} stations", self.entries.len())
    }
}
