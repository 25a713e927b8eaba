pub mod label_ranking;
pub mod utils;
