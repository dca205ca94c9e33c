pub mod analyze;
pub mod batch;
pub mod config;
pub mod output;
pub mod parse;
pub mod translate;
