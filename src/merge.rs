use rayon::prelude::*;

use crate::table::AggregationTable;

/// Accumulates worker tables one at a time into a single final table.
#[derive(Debug, Default)]
pub struct Merger {
    table: AggregationTable,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds every entry of `partial` into the final table.
    pub fn push(&mut self, partial: AggregationTable) {
        for entry in partial.into_items() {
            self.table.merge_entry(entry);
        }
    }

    pub fn finish(self) -> AggregationTable {
        self.table
    }
}

/// Serial fold of all tables, in the given order.
pub fn merge<I>(tables: I) -> AggregationTable
where
    I: IntoIterator<Item = AggregationTable>,
{
    let mut merger = Merger::new();
    for table in tables {
        merger.push(table);
    }
    merger.finish()
}

/// Pairwise reduction on the rayon pool. Each step owns both of its inputs.
pub fn merge_tree(tables: Vec<AggregationTable>) -> AggregationTable {
    tables
        .into_par_iter()
        .reduce(AggregationTable::new, AggregationTable::merge)
}
