use anyhow::Result;
use inquire::{Confirm, Select, Text};

use nexus_core::{NewUser, Priority, TaskLane, WorkflowAction, Workspace};

/// Prompts the user for a new requirement
pub fn prompt_new_requirement() -> Result<(String, String, Priority)> {
    let title = Text::new("Title:").prompt()?;

    // Use the Editor type for multiline input
    let description = inquire::Editor::new("Description:").prompt()?;

    let priority_options = vec![
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];
    let priority = Select::new("Priority:", priority_options)
        .with_starting_cursor(1)
        .prompt()?;

    Ok((title, description, priority))
}

/// Prompts the user for a new directory entry
pub fn prompt_new_user() -> Result<NewUser> {
    Ok(NewUser {
        name: Text::new("Name:").prompt()?,
        employee_id: Text::new("Employee ID:").prompt()?,
        department: Text::new("Department:").prompt()?,
        project_group: Text::new("Project group:").prompt()?,
    })
}

/// Prompts the user to select a requirement, returning its id
pub fn prompt_select_requirement(ws: &Workspace) -> Result<Option<String>> {
    let options: Vec<String> = ws
        .requirements()
        .iter()
        .map(|r| format!("{} [{}] {}", r.id, r.status.label(), r.title))
        .collect();
    select_id("Select a requirement:", options)
}

/// Prompts the user to select a task, returning its id
pub fn prompt_select_task(ws: &Workspace) -> Result<Option<String>> {
    let options: Vec<String> = ws
        .tasks()
        .iter()
        .map(|t| format!("{} [{}] {}", t.id, t.status.label(), t.title))
        .collect();
    select_id("Select a task:", options)
}

/// Prompts the user to select a document (folders excluded)
pub fn prompt_select_document(ws: &Workspace) -> Result<Option<String>> {
    let options: Vec<String> = ws
        .documents()
        .documents()
        .iter()
        .filter(|d| !d.is_folder())
        .map(|d| format!("{} {}", d.id, d.title))
        .collect();
    select_id("Select a document:", options)
}

/// Prompts the user to select a user, returning its id
pub fn prompt_select_user(ws: &Workspace) -> Result<Option<String>> {
    let options: Vec<String> = ws
        .users()
        .iter()
        .map(|u| format!("{} {} ({})", u.id, u.name, u.department))
        .collect();
    select_id("Select a user:", options)
}

pub fn prompt_select_action(actions: Vec<WorkflowAction>) -> Result<WorkflowAction> {
    Ok(Select::new("Action:", actions).prompt()?)
}

pub fn prompt_select_lane() -> Result<TaskLane> {
    Ok(Select::new("Move to lane:", TaskLane::ALL.to_vec()).prompt()?)
}

pub fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::new(message).with_default(false).prompt()?)
}

/// Options are formatted as `<id> <rest>`; the id is everything before the first space
fn select_id(message: &str, options: Vec<String>) -> Result<Option<String>> {
    if options.is_empty() {
        return Ok(None);
    }
    let selection = Select::new(message, options).prompt()?;
    Ok(selection.split(' ').next().map(str::to_string))
}
