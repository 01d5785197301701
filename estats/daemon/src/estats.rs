//! Per-connection aggregate
//!
//! Holds one [`StatTable`] per [`Category`]. Each table carries its own lock,
//! so loops feeding different categories of the same connection never wait
//! on each other.

use crate::error::EstatsError;
use crate::record::Operation;
use crate::table::StatTable;
use crate::types::{Category, TablesExport};
use estats_common::constants::CATEGORY_COUNT;

/// Extended statistics of one connection
#[derive(Debug)]
pub struct Estats {
    tables: [StatTable; CATEGORY_COUNT],
}

impl Default for Estats {
    fn default() -> Self {
        Self::new()
    }
}

impl Estats {
    pub fn new() -> Self {
        Self {
            tables: Category::ALL.map(StatTable::new),
        }
    }

    /// Table holding the variables of `category`
    pub fn table(&self, category: Category) -> &StatTable {
        &self.tables[category.index()]
    }

    /// Apply an operation to a variable of `category`
    pub fn apply(
        &self,
        category: Category,
        op: Operation,
        var: u32,
        val: u32,
    ) -> Result<u32, EstatsError> {
        self.table(category).apply(op, var, val)
    }

    /// Copy of every table
    pub fn snapshot(&self) -> TablesExport {
        let mut export = TablesExport::default();
        for table in &self.tables {
            *export.get_mut(table.category()) = table.snapshot();
        }
        export
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estats_common::{PerfVar, StackVar};

    #[test]
    fn test_tables_are_indexed_by_category() {
        let estats = Estats::new();
        for category in Category::ALL {
            assert_eq!(estats.table(category).category(), category);
        }
    }

    #[test]
    fn test_same_ordinal_in_different_categories() {
        let estats = Estats::new();

        estats
            .apply(Category::Perf, Operation::Set, PerfVar::DataOctetsIn as u32, 100)
            .unwrap();
        estats
            .apply(Category::Stack, Operation::Set, StackVar::SpuriousRtoDetected as u32, 1)
            .unwrap();

        assert_eq!(estats.table(Category::Perf).get(7), 100);
        assert_eq!(estats.table(Category::Stack).get(7), 1);

        let snapshot = estats.snapshot();
        assert_eq!(snapshot.perf["PERF_TABLE_DATAOCTETSIN"], 100);
        assert_eq!(snapshot.stack["STACK_TABLE_SPURIOUSRTODETECTED"], 1);
        assert!(snapshot.global.is_empty());
        assert!(snapshot.extras.is_empty());
    }
}
