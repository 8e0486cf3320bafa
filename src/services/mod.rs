pub mod association;
pub mod file_processor;
pub mod frequency;
pub mod loader;
pub mod normalize;
pub mod presentation;
pub mod profile;
pub mod sessions;

pub use association::{analyze_association, column_pairs, contingency_table};
pub use frequency::analyze_frequency;
