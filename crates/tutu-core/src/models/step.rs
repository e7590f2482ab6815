use std::fmt;

use crate::time::Timestamp;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepStatus {
    #[default]
    Pending,
    Done,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sub-step owned by exactly one work item
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub id: i64,
    pub item_id: i64,
    pub description: String,
    pub status: StepStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Step {
    pub fn is_done(&self) -> bool {
        self.status == StepStatus::Done
    }
}
