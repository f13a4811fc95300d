use serde::{Deserialize, Serialize};

use crate::utils::{contains_ignore_case, format_date};

/// Lifecycle state of a job. The server sends free-form strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Active,
    Completed,
    OnHold,
    Planning,
    Other(String),
}

impl JobStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "active" => JobStatus::Active,
            "completed" => JobStatus::Completed,
            "on-hold" => JobStatus::OnHold,
            "planning" => JobStatus::Planning,
            _ => JobStatus::Other(s.to_string()),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Active => write!(f, "Active"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::OnHold => write!(f, "On Hold"),
            JobStatus::Planning => write!(f, "Planning"),
            JobStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A project / work order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Job {
    pub id: i64,
    pub name: String,
    #[serde(rename = "projectNumber", default)]
    pub project_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(rename = "clientName", default)]
    pub client_name: Option<String>,
}

impl Job {
    pub fn status(&self) -> Option<JobStatus> {
        self.status.as_deref().map(JobStatus::parse)
    }

    /// Case-insensitive match on name or project number
    pub fn matches_search(&self, query: &str) -> bool {
        contains_ignore_case(&self.name, query)
            || self
                .project_number
                .as_deref()
                .map(|n| contains_ignore_case(n, query))
                .unwrap_or(false)
    }

    pub fn start_date_display(&self) -> Option<String> {
        self.start_date.as_deref().map(format_date)
    }
}

/// Filter jobs by a search query. An empty query keeps everything.
pub fn filter_jobs<'a>(jobs: &'a [Job], query: &str) -> Vec<&'a Job> {
    let query = query.trim();
    jobs.iter().filter(|j| j.matches_search(query)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: i64, name: &str, number: Option<&str>) -> Job {
        Job {
            id,
            name: name.to_string(),
            project_number: number.map(str::to_string),
            status: None,
            location: None,
            start_date: None,
            client_name: None,
        }
    }

    #[test]
    fn test_job_status_parse() {
        assert_eq!(JobStatus::parse("Active"), JobStatus::Active);
        assert_eq!(JobStatus::parse("COMPLETED"), JobStatus::Completed);
        assert_eq!(JobStatus::parse("on-hold"), JobStatus::OnHold);
        assert_eq!(JobStatus::parse("planning"), JobStatus::Planning);
        assert_eq!(JobStatus::parse("archived"), JobStatus::Other("archived".to_string()));
        assert_eq!(JobStatus::OnHold.to_string(), "On Hold");
    }

    #[test]
    fn test_parse_job() {
        let json = r#"{"id":12,"name":"Harbour Tower","projectNumber":"P-2041","status":"active","location":"Pier 4","startDate":"2024-03-01T00:00:00Z","clientName":"Acme"}"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.id, 12);
        assert_eq!(job.status(), Some(JobStatus::Active));
        assert_eq!(job.start_date_display().as_deref(), Some("Mar 01, 2024"));
    }

    #[test]
    fn test_filter_jobs() {
        let jobs = vec![
            job(1, "Harbour Tower", Some("P-2041")),
            job(2, "Riverside Car Park", None),
            job(3, "School Annex", Some("HT-9")),
        ];

        let ids = |q: &str| filter_jobs(&jobs, q).iter().map(|j| j.id).collect::<Vec<_>>();
        assert_eq!(ids("harbour"), vec![1]);
        assert_eq!(ids("p-20"), vec![1]);
        assert_eq!(ids("ht"), vec![3]);
        assert_eq!(ids(""), vec![1, 2, 3]);
        assert!(ids("nothing").is_empty());
    }
}
