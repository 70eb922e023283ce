//! Entity Store
//!
//! `Workspace` is the whole workbench state as one value. The presentation
//! layer dispatches an `Action`; on success it swaps in the returned
//! snapshot, on error it keeps the one it had.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::board::{self, LaneView, TaskAction, TaskFilter};
use crate::directory::{self, DirectoryAction};
use crate::docs::{DocumentAction, DocumentTree};
use crate::error::{CoreError, CoreResult};
use crate::models::{Document, ProjectTask, Requirement, User};
use crate::workflow::{self, RequirementAction};

/// An action dispatched against the workspace
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Requirement(RequirementAction),
    Task(TaskAction),
    Directory(DirectoryAction),
    Document(DocumentAction),
}

impl From<RequirementAction> for Action {
    fn from(action: RequirementAction) -> Self {
        Action::Requirement(action)
    }
}

impl From<TaskAction> for Action {
    fn from(action: TaskAction) -> Self {
        Action::Task(action)
    }
}

impl From<DirectoryAction> for Action {
    fn from(action: DirectoryAction) -> Self {
        Action::Directory(action)
    }
}

impl From<DocumentAction> for Action {
    fn from(action: DocumentAction) -> Self {
        Action::Document(action)
    }
}

/// Serialized shape of a workspace, validated on the way in
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct WorkspaceData {
    users: Vec<User>,
    documents: Vec<Document>,
    requirements: Vec<Requirement>,
    tasks: Vec<ProjectTask>,
}

/// Snapshot of every collection in the workbench
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorkspaceData", into = "WorkspaceData")]
pub struct Workspace {
    users: Vec<User>,
    documents: DocumentTree,
    requirements: Vec<Requirement>,
    tasks: Vec<ProjectTask>,
}

impl Workspace {
    /// An empty workspace holding only the root folder
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a workspace, rejecting duplicate ids and a broken document tree
    pub fn from_parts(
        users: Vec<User>,
        documents: Vec<Document>,
        requirements: Vec<Requirement>,
        tasks: Vec<ProjectTask>,
    ) -> CoreResult<Self> {
        ensure_unique("user", users.iter().map(|u| u.id.as_str()))?;
        ensure_unique("requirement", requirements.iter().map(|r| r.id.as_str()))?;
        ensure_unique("task", tasks.iter().map(|t| t.id.as_str()))?;
        for req in &requirements {
            workflow::check_comments(req)?;
        }

        Ok(Self {
            users,
            documents: DocumentTree::from_documents(documents)?,
            requirements,
            tasks,
        })
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn documents(&self) -> &DocumentTree {
        &self.documents
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn tasks(&self) -> &[ProjectTask] {
        &self.tasks
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn requirement(&self, id: &str) -> Option<&Requirement> {
        self.requirements.iter().find(|r| r.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&ProjectTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The three board lanes under `filter`
    pub fn board(&self, filter: TaskFilter) -> Vec<LaneView<'_>> {
        board::board_view(&self.tasks, filter)
    }

    /// Applies an action and returns the resulting snapshot
    pub fn apply(&self, action: Action) -> CoreResult<Workspace> {
        debug!("Applying {:?}", action);
        let mut next = self.clone();
        match action {
            Action::Requirement(action) => {
                self.check_user_references(&action)?;
                next.requirements = workflow::reduce(&self.requirements, action)?;
            }
            Action::Task(action) => {
                next.tasks = board::reduce(&self.tasks, action)?;
            }
            Action::Directory(action) => {
                next.users = directory::reduce(&self.users, action)?;
            }
            Action::Document(action) => {
                next.documents = self.documents.apply(action)?;
            }
        }
        Ok(next)
    }

    /// New comments, assignments and inserted requirements must point at
    /// known users
    fn check_user_references(&self, action: &RequirementAction) -> CoreResult<()> {
        let user_ids: Vec<&str> = match action {
            RequirementAction::Comment { user_id, .. } => vec![user_id.as_str()],
            RequirementAction::Assign {
                user_id: Some(user_id),
                ..
            } => vec![user_id.as_str()],
            RequirementAction::Insert(req) => req
                .assigned_to
                .iter()
                .chain(req.comments.iter().map(|c| &c.user_id))
                .map(String::as_str)
                .collect(),
            _ => Vec::new(),
        };
        match user_ids.into_iter().find(|id| self.user(id).is_none()) {
            Some(id) => Err(CoreError::not_found("user", id)),
            None => Ok(()),
        }
    }
}

fn ensure_unique<'a>(kind: &'static str, ids: impl Iterator<Item = &'a str>) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CoreError::duplicate(kind, id));
        }
    }
    Ok(())
}

impl TryFrom<WorkspaceData> for Workspace {
    type Error = CoreError;

    fn try_from(data: WorkspaceData) -> Result<Self, Self::Error> {
        Self::from_parts(data.users, data.documents, data.requirements, data.tasks)
    }
}

impl From<Workspace> for WorkspaceData {
    fn from(ws: Workspace) -> Self {
        Self {
            users: ws.users,
            documents: ws.documents.into(),
            requirements: ws.requirements,
            tasks: ws.tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::NewUser;
    use crate::docs::{Upload, ROOT_ID};
    use crate::models::{AttachmentKind, Priority, RequirementStatus, TaskLane, TaskType};
    use crate::workflow::WorkflowAction;

    fn workspace_with_user() -> (Workspace, String) {
        let user = directory::add_user(NewUser {
            name: "Sarah Product".to_string(),
            ..Default::default()
        });
        let id = user.id.clone();
        let ws = Workspace::new()
            .apply(DirectoryAction::Add(user).into())
            .unwrap();
        (ws, id)
    }

    fn with_requirement(ws: &Workspace) -> (Workspace, String) {
        let next = ws
            .apply(
                RequirementAction::Create {
                    title: "用户 SSO 单点登录".to_string(),
                    description: "OAuth2".to_string(),
                    priority: Priority::High,
                }
                .into(),
            )
            .unwrap();
        let id = next.requirements().last().unwrap().id.clone();
        (next, id)
    }

    #[test]
    fn test_new_workspace_has_root_only() {
        let ws = Workspace::new();
        assert!(ws.users().is_empty());
        assert_eq!(ws.documents().len(), 1);
        assert_eq!(ws.documents().root().id, ROOT_ID);
    }

    #[test]
    fn test_rejected_transition_keeps_snapshot() {
        let (ws, _) = workspace_with_user();
        let (ws, req_id) = with_requirement(&ws);

        let err = ws
            .apply(
                RequirementAction::Transition {
                    id: req_id.clone(),
                    action: WorkflowAction::Approve,
                }
                .into(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(ws.requirement(&req_id).unwrap().status, RequirementStatus::Draft);

        let next = ws
            .apply(
                RequirementAction::Transition {
                    id: req_id.clone(),
                    action: WorkflowAction::RequestReview,
                }
                .into(),
            )
            .unwrap();
        assert_eq!(next.requirement(&req_id).unwrap().status, RequirementStatus::Review);
    }

    #[test]
    fn test_comment_requires_known_user() {
        let (ws, user_id) = workspace_with_user();
        let (ws, req_id) = with_requirement(&ws);

        let missing = ws.apply(
            RequirementAction::Comment {
                id: req_id.clone(),
                user_id: "ghost".to_string(),
                content: "hi".to_string(),
            }
            .into(),
        );
        assert!(matches!(missing, Err(CoreError::NotFound { kind: "user", .. })));

        let next = ws
            .apply(
                RequirementAction::Comment {
                    id: req_id.clone(),
                    user_id: user_id.clone(),
                    content: "请确保优雅地处理 Token 刷新机制。".to_string(),
                }
                .into(),
            )
            .unwrap();
        let req = next.requirement(&req_id).unwrap();
        assert_eq!(req.comments.len(), 1);
        assert_eq!(req.comments[0].user_id, user_id);
    }

    #[test]
    fn test_assign_and_unassign() {
        let (ws, user_id) = workspace_with_user();
        let (ws, req_id) = with_requirement(&ws);

        let assigned = ws
            .apply(
                RequirementAction::Assign {
                    id: req_id.clone(),
                    user_id: Some(user_id.clone()),
                }
                .into(),
            )
            .unwrap();
        assert_eq!(
            assigned.requirement(&req_id).unwrap().assigned_to.as_deref(),
            Some(user_id.as_str())
        );

        let cleared = assigned
            .apply(
                RequirementAction::Assign {
                    id: req_id.clone(),
                    user_id: None,
                }
                .into(),
            )
            .unwrap();
        assert!(cleared.requirement(&req_id).unwrap().assigned_to.is_none());
    }

    #[test]
    fn test_task_moves_through_board() {
        let task = board::create("客户 A 现场部署", "Mike", TaskType::Delivery);
        let id = task.id.clone();
        let ws = Workspace::new().apply(TaskAction::Add(task).into()).unwrap();
        let ws = ws
            .apply(
                TaskAction::Move {
                    id: id.clone(),
                    lane: TaskLane::Done,
                }
                .into(),
            )
            .unwrap();

        let lanes = ws.board(TaskFilter::All);
        assert!(lanes[0].tasks.is_empty());
        assert_eq!(lanes[2].tasks[0].id, id);
    }

    #[test]
    fn test_document_attachment_through_workspace() {
        let ws = Workspace::new()
            .apply(
                DocumentAction::Create {
                    parent_id: ROOT_ID.to_string(),
                    title: Some("新人入职指南".to_string()),
                }
                .into(),
            )
            .unwrap();
        let doc_id = ws.documents().children(ROOT_ID)[0].id.clone();

        let ws = ws
            .apply(
                DocumentAction::Attach {
                    id: doc_id.clone(),
                    upload: Upload {
                        name: "demo.mp4".to_string(),
                        mime: "video/mp4".to_string(),
                        blob_ref: "blob:demo".to_string(),
                    },
                }
                .into(),
            )
            .unwrap();
        let doc = ws.documents().get(&doc_id).unwrap();
        assert_eq!(doc.attachments[0].kind, AttachmentKind::Video);
    }

    #[test]
    fn test_insert_keeps_snapshot_loadable() {
        let (ws, user_id) = workspace_with_user();
        let req = workflow::add_comment(
            &workflow::create("视频上传与处理", "HLS", Priority::Medium),
            &user_id,
            "第一条",
        );

        let mut colliding = req.clone();
        colliding.comments.push(req.comments[0].clone());
        let err = ws
            .apply(RequirementAction::Insert(colliding).into())
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId { kind: "comment", .. }));

        let mut ghost_author = req.clone();
        ghost_author.comments[0].user_id = "ghost".to_string();
        let err = ws
            .apply(RequirementAction::Insert(ghost_author).into())
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { kind: "user", .. }));

        let mut ghost_assignee = req.clone();
        ghost_assignee.assigned_to = Some("ghost".to_string());
        assert!(ws
            .apply(RequirementAction::Insert(ghost_assignee).into())
            .is_err());

        let next = ws.apply(RequirementAction::Insert(req).into()).unwrap();
        let json = serde_json::to_string(&next).unwrap();
        let reloaded: Workspace = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, next);
    }

    #[test]
    fn test_from_parts_rejects_duplicates() {
        let user = directory::add_user(NewUser::default());
        let result = Workspace::from_parts(vec![user.clone(), user], vec![], vec![], vec![]);
        assert!(matches!(result, Err(CoreError::DuplicateId { kind: "user", .. })));
    }

    #[test]
    fn test_serde_validates_snapshot() {
        let (ws, _) = workspace_with_user();
        let (ws, _) = with_requirement(&ws);
        let json = serde_json::to_string(&ws).unwrap();
        let back: Workspace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ws);

        let dup = r#"{"tasks":[
            {"id":"t1","title":"a","status":"todo","assignee":"A","type":"R&D"},
            {"id":"t1","title":"b","status":"done","assignee":"B","type":"Delivery"}
        ]}"#;
        assert!(serde_json::from_str::<Workspace>(dup).is_err());
    }
}
