use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

pub type UserId = String;
pub type DocId = String;
pub type AttachmentId = String;
pub type RequirementId = String;
pub type CommentId = String;
pub type TaskId = String;

/// Generates an opaque identifier such as `r-9f6c0c3e...`
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// Represents the status of a requirement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RequirementStatus {
    Draft,
    Review,
    Approved,
    Development,
    Done,
}

impl RequirementStatus {
    /// All statuses in workflow order
    pub const ALL: [RequirementStatus; 5] = [
        RequirementStatus::Draft,
        RequirementStatus::Review,
        RequirementStatus::Approved,
        RequirementStatus::Development,
        RequirementStatus::Done,
    ];

    /// Label shown in the workbench UI
    pub fn label(&self) -> &'static str {
        match self {
            RequirementStatus::Draft => "草稿",
            RequirementStatus::Review => "待评审",
            RequirementStatus::Approved => "已通过",
            RequirementStatus::Development => "开发中",
            RequirementStatus::Done => "已完成",
        }
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementStatus::Draft => write!(f, "Draft"),
            RequirementStatus::Review => write!(f, "Review"),
            RequirementStatus::Approved => write!(f, "Approved"),
            RequirementStatus::Development => write!(f, "Development"),
            RequirementStatus::Done => write!(f, "Done"),
        }
    }
}

impl FromStr for RequirementStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" | "草稿" => Ok(RequirementStatus::Draft),
            "review" | "待评审" => Ok(RequirementStatus::Review),
            "approved" | "已通过" => Ok(RequirementStatus::Approved),
            "development" | "dev" | "开发中" => Ok(RequirementStatus::Development),
            "done" | "已完成" => Ok(RequirementStatus::Done),
            other => Err(CoreError::Parse(format!("unknown status '{}'", other))),
        }
    }
}

/// Represents the priority of a requirement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "低",
            Priority::Medium => "中",
            Priority::High => "高",
            Priority::Critical => "紧急",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
            Priority::Critical => write!(f, "Critical"),
        }
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "低" => Ok(Priority::Low),
            "medium" | "med" | "中" => Ok(Priority::Medium),
            "high" | "高" => Ok(Priority::High),
            "critical" | "紧急" => Ok(Priority::Critical),
            other => Err(CoreError::Parse(format!("unknown priority '{}'", other))),
        }
    }
}

/// A member of the team directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Placeholder avatar URL derived at creation time
    pub avatar: String,
    pub employee_id: String,
    pub department: String,
    pub project_group: String,
}

/// Whether a node of the document tree is a container or a page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Folder,
    Document,
}

/// A node of the knowledge base tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocId,

    /// Parent folder, `None` only for the root sentinel
    pub parent_id: Option<DocId>,

    pub title: String,

    /// Markdown body; ignored for folders
    #[serde(default)]
    pub content: String,

    pub kind: DocKind,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// Refreshed on every content, title or attachment change
    pub last_modified: DateTime<Utc>,
}

impl Document {
    pub fn is_folder(&self) -> bool {
        self.kind == DocKind::Folder
    }

    pub(crate) fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}

/// Classification of an uploaded file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    File,
}

impl AttachmentKind {
    /// Classifies by MIME prefix: `image/*`, `video/*`, everything else is a file
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            AttachmentKind::Image
        } else if mime.starts_with("video/") {
            AttachmentKind::Video
        } else {
            AttachmentKind::File
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentKind::Image => write!(f, "image"),
            AttachmentKind::Video => write!(f, "video"),
            AttachmentKind::File => write!(f, "file"),
        }
    }
}

/// A file attached to a document. The url is an opaque blob handle owned elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub id: AttachmentId,
    pub name: String,
    pub kind: AttachmentKind,
    pub url: String,
}

/// A comment on a requirement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub user_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Represents a single requirement in the tracker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirement {
    pub id: RequirementId,

    /// Short title describing the requirement
    pub title: String,

    /// Detailed description of the requirement
    pub description: String,

    /// Current position in the approval workflow
    pub status: RequirementStatus,

    pub priority: Priority,

    /// Responsible user, `None` when unassigned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,

    /// When the requirement was created. Never changes.
    pub created_at: DateTime<Utc>,

    /// Append-only discussion thread
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Board lane of a task. The lane is the task's status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskLane {
    Todo,
    InProgress,
    Done,
}

impl TaskLane {
    /// Lanes in board order
    pub const ALL: [TaskLane; 3] = [TaskLane::Todo, TaskLane::InProgress, TaskLane::Done];

    pub fn label(&self) -> &'static str {
        match self {
            TaskLane::Todo => "待办事项",
            TaskLane::InProgress => "进行中",
            TaskLane::Done => "已完成",
        }
    }
}

impl fmt::Display for TaskLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskLane::Todo => write!(f, "todo"),
            TaskLane::InProgress => write!(f, "in-progress"),
            TaskLane::Done => write!(f, "done"),
        }
    }
}

impl FromStr for TaskLane {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "todo" | "待办" | "待办事项" => Ok(TaskLane::Todo),
            "in-progress" | "in_progress" | "inprogress" | "doing" | "进行中" => {
                Ok(TaskLane::InProgress)
            }
            "done" | "已完成" => Ok(TaskLane::Done),
            other => Err(CoreError::Parse(format!("unknown lane '{}'", other))),
        }
    }
}

/// Kind of work a board task represents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskType {
    #[serde(rename = "R&D")]
    RnD,
    Delivery,
}

impl TaskType {
    pub fn label(&self) -> &'static str {
        match self {
            TaskType::RnD => "研发",
            TaskType::Delivery => "交付",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::RnD => write!(f, "R&D"),
            TaskType::Delivery => write!(f, "Delivery"),
        }
    }
}

impl FromStr for TaskType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "r&d" | "rnd" | "rd" | "研发" => Ok(TaskType::RnD),
            "delivery" | "交付" => Ok(TaskType::Delivery),
            other => Err(CoreError::Parse(format!("unknown task type '{}'", other))),
        }
    }
}

/// A card on the project board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectTask {
    pub id: TaskId,
    pub title: String,
    pub status: TaskLane,
    /// Free-text name, not a directory reference
    pub assignee: String,
    #[serde(rename = "type")]
    pub kind: TaskType,
}
