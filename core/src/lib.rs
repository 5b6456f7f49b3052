pub mod error;
mod index;
pub mod mapper;
pub mod persist;
pub mod reducer;
pub mod tokenizer;

pub use error::{IndexError, IndexResult};
pub use index::{IndexKey, InvertedIndexShard, TermFrequencyShard};
