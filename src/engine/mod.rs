//! Core engine: the fetch → score → select daily run, the multi-sport
//! refresh behind the dashboard, and rating training.

pub mod daily;
pub mod refresh;
pub mod trainer;

pub use daily::{run_daily, DailyReport};
pub use refresh::refresh_all;
pub use trainer::{load_results, train_ratings, TrainingSummary};
