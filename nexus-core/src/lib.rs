pub mod ai;
pub mod board;
pub mod config;
pub mod directory;
pub mod docs;
pub mod error;
pub mod export;
pub mod models;
pub mod seed;
pub mod stats;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use ai::{
    AiError, AssistantGateway, CancelToken, CommandProvider, DisabledProvider, GenerationRequest,
    PendingReply, ReplyState, TextProvider,
};
pub use board::{LaneView, TaskAction, TaskFilter};
pub use config::{get_config_path, AssistantConfig, NexusConfig};
pub use directory::{DirectoryAction, DropReason, DroppedRow, ImportReport, NewUser};
pub use docs::{DocumentAction, DocumentTree, OutlineEntry, Upload, ROOT_ID};
pub use error::{CoreError, CoreResult};
pub use export::{load_snapshot, parse_snapshot, write_snapshot, SnapshotFormat};
pub use models::{
    Attachment, AttachmentKind, Comment, DocKind, Document, Priority, ProjectTask, Requirement,
    RequirementStatus, TaskLane, TaskType, User,
};
pub use store::{Action, Workspace};
pub use workflow::{allowed_actions, RequirementAction, WorkflowAction};
