//! Traffic prediction engine

mod forecast;
mod history;

pub use forecast::TrafficPredictor;
pub use history::TrafficHistory;
