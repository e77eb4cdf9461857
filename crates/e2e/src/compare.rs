//! Field-by-field comparison of reconciled cards with fixture tasks

use std::fmt;

use serde::{Deserialize, Serialize};

use taskboard_common::Task;

use crate::reconciler::ReconciledCard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardField {
    Status,
    Priority,
    Assignee,
    DueDate,
    Tags,
}

impl CardField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardField::Status => "status",
            CardField::Priority => "priority",
            CardField::Assignee => "assignee",
            CardField::DueDate => "due date",
            CardField::Tags => "tags",
        }
    }
}

/// One field where the rendered card disagrees with the fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMismatch {
    pub title: String,
    pub field: CardField,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' {}: expected {:?}, found {:?}",
            self.title,
            self.field.as_str(),
            self.expected,
            self.actual
        )
    }
}

/// Compare a rendered card against its fixture record.
///
/// Status is always checked. Priority, assignee and due date are checked
/// only when the fixture sets them. The card's tags must include every
/// fixture tag; extra tags are tolerated since substring matching can pick up
/// tag names from surrounding text.
pub fn compare_card(task: &Task, card: &ReconciledCard) -> Vec<FieldMismatch> {
    let mut mismatches = Vec::new();
    let mut check = |field: CardField, expected: &str, actual: &str| {
        if expected != actual {
            mismatches.push(FieldMismatch {
                title: task.title.clone(),
                field,
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    };

    check(CardField::Status, &task.status, &card.status);
    if let Some(priority) = &task.priority {
        check(CardField::Priority, priority, &card.priority);
    }
    if let Some(assignee) = &task.assignee {
        check(CardField::Assignee, assignee, &card.assignee);
    }
    if let Some(due_date) = &task.due_date {
        check(CardField::DueDate, due_date, &card.due_date);
    }

    let missing: Vec<&str> = task
        .tags
        .iter()
        .filter(|tag| !card.tags.contains(tag))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        mismatches.push(FieldMismatch {
            title: task.title.clone(),
            field: CardField::Tags,
            expected: task.tags.join(", "),
            actual: card.tags.join(", "),
        });
    }

    mismatches
}
