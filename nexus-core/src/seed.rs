//! Demo data the workbench starts with when no snapshot is given

use chrono::{DateTime, TimeZone, Utc};

use crate::docs::ROOT_ID;
use crate::error::CoreResult;
use crate::models::{
    Attachment, AttachmentKind, Comment, DocKind, Document, Priority, ProjectTask, Requirement,
    RequirementStatus, TaskLane, TaskType, User,
};
use crate::store::Workspace;

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn user(id: &str, name: &str, avatar: u32, employee_id: &str, dept: &str, group: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        avatar: format!("https://picsum.photos/id/{}/100/100", avatar),
        employee_id: employee_id.to_string(),
        department: dept.to_string(),
        project_group: group.to_string(),
    }
}

fn task(id: &str, title: &str, status: TaskLane, assignee: &str, kind: TaskType) -> ProjectTask {
    ProjectTask {
        id: id.to_string(),
        title: title.to_string(),
        status,
        assignee: assignee.to_string(),
        kind,
    }
}

pub fn users() -> Vec<User> {
    vec![
        user("u1", "Alex Engineer", 64, "RD-001", "研发部", "核心平台组"),
        user("u2", "Sarah Product", 65, "PM-002", "产品部", "移动端组"),
        user("u3", "Mike Dev", 66, "RD-003", "研发部", "交付组"),
    ]
}

pub fn documents() -> Vec<Document> {
    vec![
        Document {
            id: ROOT_ID.to_string(),
            parent_id: None,
            title: "通用文档".to_string(),
            content: String::new(),
            kind: DocKind::Folder,
            attachments: Vec::new(),
            last_modified: Utc::now(),
        },
        Document {
            id: "d1".to_string(),
            parent_id: Some(ROOT_ID.to_string()),
            title: "新人入职指南".to_string(),
            content: "# 欢迎来到 Nexus 研发平台\n\n这是我们工程团队的核心知识库。在这里你可以找到环境搭建指南、架构图以及更多内容。\n\n## 快速开始\n1. 安装 Node.js\n2. 克隆仓库\n3. 运行 `npm install`".to_string(),
            kind: DocKind::Document,
            attachments: vec![Attachment {
                id: "a1".to_string(),
                name: "系统架构图.png".to_string(),
                kind: AttachmentKind::Image,
                url: "https://picsum.photos/id/2/600/400".to_string(),
            }],
            last_modified: date(2023, 10, 1),
        },
        Document {
            id: "d2".to_string(),
            parent_id: Some(ROOT_ID.to_string()),
            title: "API 开发规范".to_string(),
            content: "所有 API 必须遵循 RESTful 原则。请求和响应体请统一使用 JSON 格式。"
                .to_string(),
            kind: DocKind::Document,
            attachments: Vec::new(),
            last_modified: date(2023, 10, 5),
        },
    ]
}

pub fn requirements() -> Vec<Requirement> {
    vec![
        Requirement {
            id: "r1".to_string(),
            title: "用户 SSO 单点登录".to_string(),
            description: "使用 OAuth2 提供商实现单点登录功能。必须支持 Google 和 GitHub 登录方式。"
                .to_string(),
            status: RequirementStatus::Approved,
            priority: Priority::High,
            assigned_to: Some("u1".to_string()),
            created_at: date(2023, 10, 10),
            comments: vec![Comment {
                id: "c1".to_string(),
                user_id: "u2".to_string(),
                content: "请确保优雅地处理 Token 刷新机制。".to_string(),
                timestamp: Utc::now(),
            }],
        },
        Requirement {
            id: "r2".to_string(),
            title: "视频上传与处理".to_string(),
            description:
                "允许用户上传最大 500MB 的视频文件。上传后需转码为 HLS 格式以支持流媒体播放。"
                    .to_string(),
            status: RequirementStatus::Review,
            priority: Priority::Medium,
            assigned_to: Some("u1".to_string()),
            created_at: date(2023, 10, 12),
            comments: Vec::new(),
        },
        Requirement {
            id: "r3".to_string(),
            title: "暗黑模式 UI".to_string(),
            description: "根据用户偏好添加系统级的暗黑模式切换开关。".to_string(),
            status: RequirementStatus::Draft,
            priority: Priority::Low,
            assigned_to: None,
            created_at: date(2023, 10, 15),
            comments: Vec::new(),
        },
    ]
}

pub fn tasks() -> Vec<ProjectTask> {
    vec![
        task("t1", "设计数据库 Schema", TaskLane::Done, "Alex", TaskType::RnD),
        task("t2", "实现登录 API 接口", TaskLane::InProgress, "Alex", TaskType::RnD),
        task("t3", "设计个人主页 UI", TaskLane::Todo, "Sarah", TaskType::RnD),
        task("t4", "客户 A 现场部署", TaskLane::InProgress, "Mike", TaskType::Delivery),
        task("t5", "编写系统交付手册", TaskLane::Todo, "Sarah", TaskType::Delivery),
        task("t6", "演示环境搭建", TaskLane::Done, "Alex", TaskType::Delivery),
    ]
}

/// The demo workspace
pub fn workspace() -> CoreResult<Workspace> {
    Workspace::from_parts(users(), documents(), requirements(), tasks())
}
