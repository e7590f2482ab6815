pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod query;
pub mod report;
pub mod runner;
pub mod store;
pub mod time;
pub mod tracing_setup;

pub use config::TutuConfig;
pub use error::{ConfigError, LaunchError, RunError, StoreError};
pub use models::{ItemStatus, NewItem, Step, StepStatus, WorkItem};
pub use query::{ItemFilter, Scope};
pub use store::Store;
pub use time::{Clock, Timestamp};
