//! Export of scrape results.
//!
//! # Submodules
//!
//! - [`csv`]: the normalized table as CSV, zipped by default
//! - [`json`]: the raw API pages a scrape was built from
//!
//! # Output Structure
//!
//! ```text
//! out/
//! ├── cnn.csv.zip     # zip holding cnn.csv
//! ├── ria.csv         # --no-zip
//! └── raw/
//!     └── cnn.json    # --raw-output out/raw/cnn.json
//! ```

pub mod csv;
pub mod json;
