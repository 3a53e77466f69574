//! Strategy: candidate scoring and pick selection.

pub mod candidates;
pub mod selector;

pub use candidates::build_candidates;
pub use selector::{select_picks, SearchStrategy, SelectionConfig};
