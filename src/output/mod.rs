//! Result formatters.
//!
//! - [`text`]: colored terminal report
//! - [`json`]: one JSON document for scripting
//! - [`csv`]: one row per duplicate file
//!
//! ```no_run
//! use dupsift::duplicates::DuplicateFinder;
//! use dupsift::error::ExitCode;
//! use dupsift::output::JsonOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! let output = JsonOutput::new(&groups, &summary, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

pub use csv::{CandidateCsv, CsvOutput, CsvOutputError};
pub use json::{CandidateJson, JsonOutput, JsonOutputError};
pub use text::{write_candidates, TextOutput};
