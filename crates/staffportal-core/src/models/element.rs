use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Work status of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementStatus {
    NotStarted,
    InProgress,
    Complete,
    OnHold,
}

impl ElementStatus {
    /// Every status an element can be moved to, in workflow order
    pub const ALL: [ElementStatus; 4] = [
        ElementStatus::NotStarted,
        ElementStatus::InProgress,
        ElementStatus::Complete,
        ElementStatus::OnHold,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "not_started" => Some(ElementStatus::NotStarted),
            "in_progress" => Some(ElementStatus::InProgress),
            "complete" => Some(ElementStatus::Complete),
            "on_hold" => Some(ElementStatus::OnHold),
            _ => None,
        }
    }

    /// Wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementStatus::NotStarted => "not_started",
            ElementStatus::InProgress => "in_progress",
            ElementStatus::Complete => "complete",
            ElementStatus::OnHold => "on_hold",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ElementStatus::NotStarted => "Not Started",
            ElementStatus::InProgress => "In Progress",
            ElementStatus::Complete => "Complete",
            ElementStatus::OnHold => "On Hold",
        }
    }
}

impl std::fmt::Display for ElementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Production phase of an element (`primaryStatus` on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementPhase {
    Drawing,
    Production,
    Delivery,
    Install,
    Other(String),
}

impl ElementPhase {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "drawing" => ElementPhase::Drawing,
            "production" => ElementPhase::Production,
            "delivery" => ElementPhase::Delivery,
            "install" => ElementPhase::Install,
            _ => ElementPhase::Other(s.to_string()),
        }
    }
}

impl std::fmt::Display for ElementPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementPhase::Drawing => write!(f, "Drawing"),
            ElementPhase::Production => write!(f, "Production"),
            ElementPhase::Delivery => write!(f, "Delivery"),
            ElementPhase::Install => write!(f, "Install"),
            ElementPhase::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A trackable fabrication/installation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Element {
    pub id: i64,
    /// External code printed on the element's QR label
    #[serde(rename = "elementId")]
    pub element_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "elementType", default)]
    pub element_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "primaryStatus", default)]
    pub primary_status: Option<String>,
    #[serde(rename = "secondaryStatus", default)]
    pub secondary_status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(rename = "assignedTo", default)]
    pub assigned_to: Option<String>,
    #[serde(rename = "lastModified", default)]
    pub last_modified: Option<String>,
    #[serde(rename = "jobId", default)]
    pub job_id: Option<i64>,
}

impl Element {
    /// Parsed status, `None` when absent or unrecognised
    pub fn status(&self) -> Option<ElementStatus> {
        self.status.as_deref().and_then(ElementStatus::parse)
    }

    /// Status to pre-select when editing. Absent means not started.
    pub fn editable_status(&self) -> ElementStatus {
        self.status().unwrap_or(ElementStatus::NotStarted)
    }

    pub fn status_label(&self) -> &'static str {
        self.status().map(|s| s.label()).unwrap_or("Unknown")
    }

    pub fn phase(&self) -> Option<ElementPhase> {
        self.primary_status.as_deref().map(ElementPhase::parse)
    }

    /// Secondary status uses the same vocabulary as `status`
    pub fn secondary(&self) -> Option<ElementStatus> {
        self.secondary_status.as_deref().and_then(ElementStatus::parse)
    }

    /// "L × W × H mm", only when all three dimensions are known
    pub fn dimensions_display(&self) -> String {
        match (self.length, self.width, self.height) {
            (Some(l), Some(w), Some(h)) => format!("{} × {} × {}mm", l, w, h),
            _ => "Not specified".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Named {
    #[serde(default)]
    name: Option<String>,
}

/// One row of a job's element listing, with optional building/level.
#[derive(Debug, Clone)]
pub struct JobElement {
    pub element: Element,
    pub building: Option<String>,
    pub level: Option<String>,
}

impl JobElement {
    /// "Building - Level" when either is known
    pub fn location(&self) -> Option<String> {
        if self.building.is_none() && self.level.is_none() {
            return None;
        }
        Some(format!(
            "{} - {}",
            self.building.as_deref().unwrap_or(""),
            self.level.as_deref().unwrap_or("")
        ))
    }
}

// The listing endpoint returns either joined rows or bare elements
#[derive(Deserialize)]
#[serde(untagged)]
enum JobElementRow {
    Joined {
        elements: Element,
        #[serde(default)]
        levels: Option<Named>,
        #[serde(default)]
        buildings: Option<Named>,
    },
    Bare(Element),
}

impl<'de> Deserialize<'de> for JobElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match JobElementRow::deserialize(deserializer)? {
            JobElementRow::Joined {
                elements,
                levels,
                buildings,
            } => JobElement {
                element: elements,
                building: buildings.and_then(|b| b.name),
                level: levels.and_then(|l| l.name),
            },
            JobElementRow::Bare(element) => JobElement {
                element,
                building: None,
                level: None,
            },
        })
    }
}

/// Partial element update. Unset fields are left out of the request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ElementUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "lastModified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ElementUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ElementStatus) -> Self {
        self.status = Some(status.as_str().to_string());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Stamp the update with the current time
    pub fn touched_now(mut self) -> Self {
        self.last_modified = Some(Utc::now());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.notes.is_none()
    }
}
