//! Output side of the harness: the CSV exporter, the console dump and the
//! mapping from failures to process exit statuses.

pub mod console;
pub mod csv_export;
pub mod exit;

pub use console::ConsoleSink;
pub use csv_export::{parse_csv, CsvExporter, DEFAULT_EXPORT_FILE};
pub use exit::{exit_status, ExitStatus};
