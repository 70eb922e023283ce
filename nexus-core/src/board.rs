//! Task Board Engine
//!
//! A task's lane is its `status` field. Lanes are queries over the full task
//! collection, never separate containers.

use log::debug;

use crate::error::{CoreError, CoreResult};
use crate::models::{new_id, ProjectTask, TaskId, TaskLane, TaskType};

/// Type filter applied to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Only(TaskType),
}

impl TaskFilter {
    pub fn matches(&self, task: &ProjectTask) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Only(kind) => task.kind == *kind,
        }
    }

    /// Board heading for the current filter
    pub fn label(&self) -> &'static str {
        match self {
            TaskFilter::All => "全部项目",
            TaskFilter::Only(TaskType::RnD) => "研发任务",
            TaskFilter::Only(TaskType::Delivery) => "交付任务",
        }
    }
}

/// Places a task in `lane`. Any lane may be reached from any other.
pub fn move_task(task: &ProjectTask, lane: TaskLane) -> ProjectTask {
    ProjectTask {
        status: lane,
        ..task.clone()
    }
}

/// Tasks matching `filter`, in their original order
pub fn filter_by_type(tasks: &[ProjectTask], filter: TaskFilter) -> Vec<&ProjectTask> {
    tasks.iter().filter(|t| filter.matches(t)).collect()
}

/// Tasks currently in `lane`, in insertion order
pub fn lane(tasks: &[ProjectTask], lane: TaskLane) -> Vec<&ProjectTask> {
    tasks.iter().filter(|t| t.status == lane).collect()
}

/// One column of the rendered board
#[derive(Debug, Clone, PartialEq)]
pub struct LaneView<'a> {
    pub lane: TaskLane,
    pub tasks: Vec<&'a ProjectTask>,
}

/// Builds the three board columns in order, applying the type filter
pub fn board_view(tasks: &[ProjectTask], filter: TaskFilter) -> Vec<LaneView<'_>> {
    let visible = filter_by_type(tasks, filter);
    TaskLane::ALL
        .into_iter()
        .map(|l| LaneView {
            lane: l,
            tasks: visible.iter().copied().filter(|t| t.status == l).collect(),
        })
        .collect()
}

/// Creates a task in the todo lane
pub fn create(title: &str, assignee: &str, kind: TaskType) -> ProjectTask {
    ProjectTask {
        id: new_id("t"),
        title: title.to_string(),
        status: TaskLane::Todo,
        assignee: assignee.to_string(),
        kind,
    }
}

/// Actions accepted by the task collection reducer
#[derive(Debug, Clone, PartialEq)]
pub enum TaskAction {
    Add(ProjectTask),
    Move { id: TaskId, lane: TaskLane },
}

/// Reduces the task collection, returning the new collection
pub fn reduce(tasks: &[ProjectTask], action: TaskAction) -> CoreResult<Vec<ProjectTask>> {
    match action {
        TaskAction::Add(task) => {
            if tasks.iter().any(|t| t.id == task.id) {
                return Err(CoreError::duplicate("task", &task.id));
            }
            let mut next = tasks.to_vec();
            next.push(task);
            Ok(next)
        }
        TaskAction::Move { id, lane } => {
            let pos = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| CoreError::not_found("task", &id))?;
            debug!("Task {}: {} -> {}", id, tasks[pos].status, lane);
            let mut next = tasks.to_vec();
            next[pos] = move_task(&tasks[pos], lane);
            Ok(next)
        }
    }
}
