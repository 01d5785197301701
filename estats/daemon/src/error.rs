//! Aggregation errors
//!
//! Decode and stream errors are recovered inside the ingestion loop and have
//! their own types next to the code that raises them. What remains here can
//! not be recovered from.

use crate::types::Category;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstatsError {
    /// The producer sent an ordinal this build has no variable for.
    /// Producer and consumer disagree on the variable namespace.
    #[error("unknown variable {var} for {} table", .category.name())]
    UnknownVariable { category: Category, var: u32 },
}
