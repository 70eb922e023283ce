//! Requirement Workflow Engine
//!
//! Enforces the approval lifecycle of a requirement:
//!
//! ```text
//! Draft --request review--> Review --approve--> Approved --start--> Development --done--> Done
//!   ^                         |
//!   +---------reject----------+
//! ```
//!
//! Every engine function takes the current value and returns a new one; a
//! rejected action leaves the input untouched.

use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::models::{
    new_id, Comment, Priority, Requirement, RequirementId, RequirementStatus, UserId,
};

/// An action a user can take on a requirement's status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowAction {
    RequestReview,
    Approve,
    Reject,
    StartDevelopment,
    MarkDone,
}

impl WorkflowAction {
    /// Label shown on the action button
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowAction::RequestReview => "提交评审",
            WorkflowAction::Approve => "通过",
            WorkflowAction::Reject => "驳回",
            WorkflowAction::StartDevelopment => "开始开发",
            WorkflowAction::MarkDone => "标记完成",
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowAction::RequestReview => write!(f, "request review"),
            WorkflowAction::Approve => write!(f, "approve"),
            WorkflowAction::Reject => write!(f, "reject"),
            WorkflowAction::StartDevelopment => write!(f, "start development"),
            WorkflowAction::MarkDone => write!(f, "mark done"),
        }
    }
}

impl FromStr for WorkflowAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        match normalized.as_str() {
            "requestreview" | "review" | "submit" => Ok(WorkflowAction::RequestReview),
            "approve" => Ok(WorkflowAction::Approve),
            "reject" => Ok(WorkflowAction::Reject),
            "startdevelopment" | "start" | "develop" => Ok(WorkflowAction::StartDevelopment),
            "markdone" | "done" | "finish" => Ok(WorkflowAction::MarkDone),
            _ => Err(CoreError::Parse(format!("unknown workflow action '{}'", s))),
        }
    }
}

impl RequirementStatus {
    /// Returns the status reached by applying `action`, or `None` if the
    /// action is not valid from this status
    pub fn next(self, action: WorkflowAction) -> Option<RequirementStatus> {
        use RequirementStatus::*;
        use WorkflowAction::*;

        match (self, action) {
            (Draft, RequestReview) => Some(Review),
            (Review, Approve) => Some(Approved),
            (Review, Reject) => Some(Draft),
            (Approved, StartDevelopment) => Some(Development),
            (Development, MarkDone) => Some(Done),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == RequirementStatus::Done
    }
}

/// Actions that are valid from `status`, in button order
pub fn allowed_actions(status: RequirementStatus) -> Vec<WorkflowAction> {
    [
        WorkflowAction::RequestReview,
        WorkflowAction::Approve,
        WorkflowAction::Reject,
        WorkflowAction::StartDevelopment,
        WorkflowAction::MarkDone,
    ]
    .into_iter()
    .filter(|action| status.next(*action).is_some())
    .collect()
}

/// Creates a new requirement in Draft with no comments
///
/// Title and description are accepted as-is, including empty strings.
pub fn create(title: &str, description: &str, priority: Priority) -> Requirement {
    Requirement {
        id: new_id("r"),
        title: title.to_string(),
        description: description.to_string(),
        status: RequirementStatus::Draft,
        priority,
        assigned_to: None,
        created_at: Utc::now(),
        comments: Vec::new(),
    }
}

/// Applies a workflow action, returning the updated requirement
pub fn transition(req: &Requirement, action: WorkflowAction) -> CoreResult<Requirement> {
    match req.status.next(action) {
        Some(status) => {
            debug!("Requirement {}: {} -> {}", req.id, req.status, status);
            Ok(Requirement {
                status,
                ..req.clone()
            })
        }
        None => {
            warn!(
                "Rejected '{}' on requirement {} in status {}",
                action, req.id, req.status
            );
            Err(CoreError::InvalidTransition {
                from: req.status,
                action,
            })
        }
    }
}

/// Appends a comment. Status and creation time are left alone.
pub fn add_comment(req: &Requirement, user_id: &str, content: &str) -> Requirement {
    let comment = Comment {
        id: new_id("c"),
        user_id: user_id.to_string(),
        content: content.to_string(),
        timestamp: Utc::now(),
    };

    let mut updated = req.clone();
    updated.comments.push(comment);
    updated
}

/// Sets or clears the assignee
pub fn assign(req: &Requirement, user_id: Option<UserId>) -> Requirement {
    Requirement {
        assigned_to: user_id,
        ..req.clone()
    }
}

/// Actions accepted by the requirements collection reducer
#[derive(Debug, Clone, PartialEq)]
pub enum RequirementAction {
    Create {
        title: String,
        description: String,
        priority: Priority,
    },
    /// Insert an already-built requirement (seed data, snapshots)
    Insert(Requirement),
    Transition {
        id: RequirementId,
        action: WorkflowAction,
    },
    Comment {
        id: RequirementId,
        user_id: UserId,
        content: String,
    },
    Assign {
        id: RequirementId,
        user_id: Option<UserId>,
    },
}

/// Reduces the requirements collection, returning the new collection
pub fn reduce(
    requirements: &[Requirement],
    action: RequirementAction,
) -> CoreResult<Vec<Requirement>> {
    match action {
        RequirementAction::Create {
            title,
            description,
            priority,
        } => insert(requirements, create(&title, &description, priority)),
        RequirementAction::Insert(req) => insert(requirements, req),
        RequirementAction::Transition { id, action } => {
            replace(requirements, &id, |r| transition(r, action))
        }
        RequirementAction::Comment {
            id,
            user_id,
            content,
        } => replace(requirements, &id, |r| Ok(add_comment(r, &user_id, &content))),
        RequirementAction::Assign { id, user_id } => {
            replace(requirements, &id, |r| Ok(assign(r, user_id.clone())))
        }
    }
}

fn insert(requirements: &[Requirement], req: Requirement) -> CoreResult<Vec<Requirement>> {
    if requirements.iter().any(|r| r.id == req.id) {
        return Err(CoreError::duplicate("requirement", &req.id));
    }
    check_comments(&req)?;
    let mut next = requirements.to_vec();
    next.push(req);
    Ok(next)
}

/// Comment ids are unique within their requirement
pub(crate) fn check_comments(req: &Requirement) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for comment in &req.comments {
        if !seen.insert(comment.id.as_str()) {
            return Err(CoreError::duplicate("comment", &comment.id));
        }
    }
    Ok(())
}

fn replace<F>(requirements: &[Requirement], id: &str, update: F) -> CoreResult<Vec<Requirement>>
where
    F: Fn(&Requirement) -> CoreResult<Requirement>,
{
    let pos = requirements
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| CoreError::not_found("requirement", id))?;

    let updated = update(&requirements[pos])?;
    let mut next = requirements.to_vec();
    next[pos] = updated;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Requirement {
        create("暗黑模式 UI", "添加暗黑模式切换开关", Priority::Low)
    }

    fn with_status(status: RequirementStatus) -> Requirement {
        Requirement { status, ..draft() }
    }

    #[test]
    fn test_create_starts_in_draft() {
        for priority in [Priority::Low, Priority::Critical] {
            let req = create("", "", priority);
            assert_eq!(req.status, RequirementStatus::Draft);
            assert!(req.comments.is_empty());
            assert_eq!(req.priority, priority);
            assert!(req.assigned_to.is_none());
        }
    }

    #[test]
    fn test_full_lifecycle() {
        let req = draft();
        let req = transition(&req, WorkflowAction::RequestReview).unwrap();
        assert_eq!(req.status, RequirementStatus::Review);
        let req = transition(&req, WorkflowAction::Approve).unwrap();
        assert_eq!(req.status, RequirementStatus::Approved);
        let req = transition(&req, WorkflowAction::StartDevelopment).unwrap();
        assert_eq!(req.status, RequirementStatus::Development);
        let req = transition(&req, WorkflowAction::MarkDone).unwrap();
        assert_eq!(req.status, RequirementStatus::Done);
        assert!(allowed_actions(req.status).is_empty());
    }

    #[test]
    fn test_reject_returns_to_draft() {
        let req = with_status(RequirementStatus::Review);
        let req = transition(&req, WorkflowAction::Reject).unwrap();
        assert_eq!(req.status, RequirementStatus::Draft);
    }

    #[test]
    fn test_approve_on_draft_is_rejected() {
        let req = draft();
        let err = transition(&req, WorkflowAction::Approve).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidTransition {
                from: RequirementStatus::Draft,
                action: WorkflowAction::Approve,
            }
        );
        assert_eq!(req.status, RequirementStatus::Draft);
    }

    #[test]
    fn test_only_table_transitions_succeed() {
        let actions = [
            WorkflowAction::RequestReview,
            WorkflowAction::Approve,
            WorkflowAction::Reject,
            WorkflowAction::StartDevelopment,
            WorkflowAction::MarkDone,
        ];
        let mut accepted = 0;
        for status in RequirementStatus::ALL {
            for action in actions {
                let req = with_status(status);
                if let Ok(next) = transition(&req, action) {
                    accepted += 1;
                    assert_eq!(Some(next.status), status.next(action));
                }
            }
        }
        assert_eq!(accepted, 5);
    }

    #[test]
    fn test_allowed_actions() {
        assert_eq!(
            allowed_actions(RequirementStatus::Review),
            vec![WorkflowAction::Approve, WorkflowAction::Reject]
        );
        assert_eq!(
            allowed_actions(RequirementStatus::Draft),
            vec![WorkflowAction::RequestReview]
        );
    }

    #[test]
    fn test_comment_keeps_status_and_created_at() {
        let req = with_status(RequirementStatus::Approved);
        let updated = add_comment(&req, "u2", "请确保优雅地处理 Token 刷新机制。");
        assert_eq!(updated.comments.len(), req.comments.len() + 1);
        assert_eq!(updated.status, req.status);
        assert_eq!(updated.created_at, req.created_at);
        assert_eq!(updated.comments[0].user_id, "u2");
    }

    #[test]
    fn test_reduce_transition_unknown_id() {
        let reqs = vec![draft()];
        let err = reduce(
            &reqs,
            RequirementAction::Transition {
                id: "missing".to_string(),
                action: WorkflowAction::RequestReview,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn test_reduce_rejects_duplicate_insert() {
        let req = draft();
        let reqs = vec![req.clone()];
        let err = reduce(&reqs, RequirementAction::Insert(req)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { .. }));
    }

    #[test]
    fn test_reduce_rejects_insert_with_colliding_comments() {
        let mut req = add_comment(&draft(), "u2", "第一条");
        let mut repeat = req.comments[0].clone();
        repeat.content = "第二条".to_string();
        req.comments.push(repeat);

        let err = reduce(&[], RequirementAction::Insert(req)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { kind: "comment", .. }));
    }

    #[test]
    fn test_reduce_preserves_order() {
        let reqs = vec![draft(), draft(), draft()];
        let target = reqs[1].id.clone();
        let next = reduce(
            &reqs,
            RequirementAction::Transition {
                id: target.clone(),
                action: WorkflowAction::RequestReview,
            },
        )
        .unwrap();
        let ids: Vec<_> = next.iter().map(|r| r.id.clone()).collect();
        let before: Vec<_> = reqs.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, before);
        assert_eq!(next[1].status, RequirementStatus::Review);
        assert_eq!(reqs[1].status, RequirementStatus::Draft);
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!(
            "start-development".parse::<WorkflowAction>(),
            Ok(WorkflowAction::StartDevelopment)
        );
        assert_eq!("requestReview".parse::<WorkflowAction>(), Ok(WorkflowAction::RequestReview));
        assert!("ship".parse::<WorkflowAction>().is_err());
    }
}
