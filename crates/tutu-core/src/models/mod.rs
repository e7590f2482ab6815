pub mod item;
pub mod step;

pub use item::{ItemStatus, NewItem, WorkItem};
pub use step::{Step, StepStatus};
