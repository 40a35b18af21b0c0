//! da-core: Core library for decoding 2DA tables and resolving TLK strings
//!
//! This library provides functionality to:
//! - Decode 2DA V2.0 text into typed tables
//! - Resolve numeric string references against standard and custom TLK tables
//! - Load named tables through a pluggable resource fetcher
//! - Scan directories for 2DA files
//! - Render tables as CSV or JSON

pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod loader;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod strings;
pub mod table;

pub use config::{ColumnRoleMap, ColumnRoles, Config, StringTableNames};
pub use error::{Error, Result};
pub use export::{export_csv, to_csv, to_json};
pub use fetch::{DirectoryFetcher, ResourceFetcher};
pub use loader::TableLoader;
pub use parser::{decode, decode_with_report, DecodeReport};
pub use resolver::{ResolverStatus, StringResolver, CUSTOM_OFFSET};
pub use scanner::{scan_directory, ScanResult, TableResource};
pub use strings::{StringEntry, StringTable};
pub use table::{CellValue, TableData, TableRow};
