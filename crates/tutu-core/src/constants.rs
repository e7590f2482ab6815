//! Application-wide constants
//!
//! Default locations, environment variable names and external tool
//! defaults shared by the library and the CLI.

/// Directory under the user's home that holds the database and config
pub const DATA_DIR: &[&str] = &["a", "base"];

pub const DB_FILE_NAME: &str = "tutu.sqlite";
pub const CONFIG_FILE_NAME: &str = "tutu.json";

/// Overrides the default database location
pub const DB_PATH_ENV: &str = "TUTU_DB";
/// EnvFilter directives for stderr logging
pub const LOG_FILTER_ENV: &str = "TUTU_LOG";
/// When set, DEBUG logs are appended to this file
pub const LOG_FILE_ENV: &str = "TUTU_LOG_FILE";

/// Reference zone used for every naive timestamp in the store
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

// Assistant defaults
pub const DEFAULT_ASSISTANT_PROGRAM: &str = "claude";
pub const DEFAULT_ASSISTANT_ARGS: &[&str] = &["--dangerously-skip-permissions"];

/// Exit code recorded for a batch item whose assistant could not run to completion
pub const FAILED_EXIT_CODE: i32 = -1;

pub const REPORT_FILE_PREFIX: &str = "tutu_report_";

// Table names are shared with databases created by earlier versions of the tool
pub mod tables {
    pub const ITEMS: &str = "tutu_items";
    pub const STEPS: &str = "tutu_item_steps";
}
