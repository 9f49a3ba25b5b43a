// Feedback record.
// One user submission, validated against a schema and flattened to store fields.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{DashError, Result};

use super::schema::{FeedbackSchema, Role};

/// Ratings are on a 1-5 scale.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Replacement for the field delimiter inside free text.
const DELIMITER_SUBSTITUTE: char = ';';

/// A feedback submission. Immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub submitted_at: DateTime<Utc>,
    pub name: String,
    pub role: Option<Role>,
    pub setup: String,
    pub variable: String,
    pub date: NaiveDate,
    pub overall_rating: u8,
    /// One rating per schema question, in question order.
    pub answers: Vec<u8>,
    pub comments: String,
}

impl FeedbackRecord {
    pub fn new(
        setup: impl Into<String>,
        variable: impl Into<String>,
        date: NaiveDate,
        overall_rating: u8,
    ) -> Self {
        Self {
            submitted_at: Utc::now(),
            name: String::new(),
            role: None,
            setup: setup.into(),
            variable: variable.into(),
            date,
            overall_rating,
            answers: Vec::new(),
            comments: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_answers(mut self, answers: Vec<u8>) -> Self {
        self.answers = answers;
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    /// Check this record fits `schema`: answer count, rating range, role.
    pub fn validate(&self, schema: FeedbackSchema) -> Result<()> {
        let expected = schema.questions().len();
        if self.answers.len() != expected {
            return Err(DashError::SchemaMismatch(format!(
                "{} expects {} answers, got {}",
                schema.id(),
                expected,
                self.answers.len()
            )));
        }

        if let Some(role) = self.role.filter(|&role| role != schema.role()) {
            return Err(DashError::SchemaMismatch(format!(
                "role {} cannot write to {}",
                role,
                schema.id()
            )));
        }

        std::iter::once(&self.overall_rating)
            .chain(&self.answers)
            .find(|&&rating| !RATING_RANGE.contains(&rating))
            .map_or(Ok(()), |&rating| Err(DashError::InvalidRating(rating)))
    }

    /// Store fields in header order, with free text made delimiter-safe.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.submitted_at.to_rfc3339(),
            sanitize_text(&self.name),
            self.role.map(|r| r.label().to_string()).unwrap_or_default(),
            sanitize_text(&self.setup),
            sanitize_text(&self.variable),
            self.date.format("%Y-%m-%d").to_string(),
            self.overall_rating.to_string(),
        ];
        fields.extend(self.answers.iter().map(u8::to_string));
        fields.push(sanitize_text(&self.comments));
        fields
    }
}

/// Replace the field delimiter and line breaks so text stays in one field on
/// one line.
pub fn sanitize_text(text: &str) -> String {
    text.replace("\r\n", " ")
        .chars()
        .map(|c| match c {
            ',' => DELIMITER_SUBSTITUTE,
            '\n' | '\r' => ' ',
            _ => c,
        })
        .collect()
}
