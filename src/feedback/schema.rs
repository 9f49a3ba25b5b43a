// Feedback schemas.
// Each respondent role answers its own ordered set of rating questions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Columns every schema starts with, before the role's questions.
pub const LEADING_COLUMNS: &[&str] = &[
    "Timestamp",
    "Name",
    "Role",
    "Setup",
    "Variable",
    "Date",
    "Overall Rating",
];

/// Column every schema ends with.
pub const COMMENTS_COLUMN: &str = "Comments";

/// Respondent role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Student,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Farmer => "Farmer",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "farmer" => Ok(Role::Farmer),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role '{}' (expected farmer or student)", other)),
        }
    }
}

/// The set of fields a feedback record carries, chosen by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackSchema {
    Farmer,
    Student,
}

impl FeedbackSchema {
    pub const ALL: [FeedbackSchema; 2] = [FeedbackSchema::Farmer, FeedbackSchema::Student];

    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Farmer => FeedbackSchema::Farmer,
            Role::Student => FeedbackSchema::Student,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            FeedbackSchema::Farmer => Role::Farmer,
            FeedbackSchema::Student => Role::Student,
        }
    }

    /// Versioned id; each id gets its own store.
    pub fn id(&self) -> &'static str {
        match self {
            FeedbackSchema::Farmer => "farmer-v1",
            FeedbackSchema::Student => "student-v1",
        }
    }

    /// Ordered rating question identifiers.
    pub fn questions(&self) -> &'static [&'static str] {
        match self {
            FeedbackSchema::Farmer => &["Q1", "Q2", "Q3"],
            FeedbackSchema::Student => &["Q1", "Q2", "Q3", "Q4", "Q5"],
        }
    }

    /// Full header row for this schema's store.
    pub fn header(&self) -> Vec<String> {
        LEADING_COLUMNS
            .iter()
            .chain(self.questions())
            .chain(std::iter::once(&COMMENTS_COLUMN))
            .map(|col| col.to_string())
            .collect()
    }
}
