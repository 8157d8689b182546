pub mod aggregator;
pub mod data;
pub mod report;
pub mod table_parser;

pub use aggregator::*;
pub use data::*;
pub use report::*;
pub use table_parser::*;
