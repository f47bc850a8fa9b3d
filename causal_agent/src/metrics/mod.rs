//! Run metrics and logging.
//!
//! ## Loggers
//!
//! - [`ConsoleLogger`]: Aligned table on stdout
//! - [`CsvLogger`]: CSV file logging for analysis
//! - [`MultiLogger`]: Combine multiple loggers

pub mod logger;

pub use logger::{ConsoleLogger, CsvLogger, MetricsLogger, MultiLogger, RunSnapshot};
