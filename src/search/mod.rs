pub mod filter;
pub mod fuzzy;
pub mod ranking;

pub use filter::{parse as parse_filter, FilterResult};
pub use fuzzy::{FuzzyScorer, SubsequenceScorer, WeightedKey};
pub use ranking::{Ranker, SearchBranch};
