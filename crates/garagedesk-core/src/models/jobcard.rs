use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow status of a job card. Declaration order is workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    AwaitingParts,
    Completed,
    Delivered,
}

impl JobStatus {
    pub const COUNT: usize = 5;

    pub const ALL: [JobStatus; Self::COUNT] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::AwaitingParts,
        JobStatus::Completed,
        JobStatus::Delivered,
    ];

    /// Wire value, as sent in the status PATCH
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::AwaitingParts => "awaiting_parts",
            JobStatus::Completed => "completed",
            JobStatus::Delivered => "delivered",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::InProgress => "In Progress",
            JobStatus::AwaitingParts => "Awaiting Parts",
            JobStatus::Completed => "Completed",
            JobStatus::Delivered => "Delivered",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    /// Accepts wire values and labels, case-insensitively, with `-`, `_` or
    /// spaces as separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown job status '{}' (expected one of: {})",
                    s,
                    JobStatus::ALL.map(|st| st.as_str()).join(", ")
                )
            })
    }
}

/// A work order for one vehicle (`/jobcards/`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCard {
    pub id: i64,
    #[serde(default)]
    pub vehicle: Option<i64>,
    #[serde(default)]
    pub client: Option<i64>,
    /// Assigned employee id
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub description: String,
    pub status: JobStatus,
    /// Order within the status column
    #[serde(default)]
    pub position: i64,
    #[serde(default, deserialize_with = "super::decimal")]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_variants() {
        assert_eq!("in_progress".parse::<JobStatus>(), Ok(JobStatus::InProgress));
        assert_eq!("In Progress".parse::<JobStatus>(), Ok(JobStatus::InProgress));
        assert_eq!("awaiting-parts".parse::<JobStatus>(), Ok(JobStatus::AwaitingParts));
        assert_eq!("DELIVERED".parse::<JobStatus>(), Ok(JobStatus::Delivered));
        assert!("scrapped".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_ordering_follows_workflow() {
        assert!(JobStatus::Pending < JobStatus::InProgress);
        assert!(JobStatus::AwaitingParts < JobStatus::Completed);
        assert_eq!(JobStatus::Delivered.index(), 4);
    }

    #[test]
    fn test_job_card_from_backend_json() {
        let card: JobCard = serde_json::from_str(
            r#"{"id":7,"vehicle":3,"client":2,"assigned_to":null,
                "description":"Brake pads","status":"awaiting_parts",
                "estimated_cost":"240.00","created_at":"2024-03-01T09:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(card.status, JobStatus::AwaitingParts);
        assert_eq!(card.estimated_cost, Some(240.0));
        assert_eq!(card.position, 0);
        assert!(card.created_at.is_some());
    }
}
