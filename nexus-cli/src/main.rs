mod cli;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use inquire::{Select, Text};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use nexus_core::{
    allowed_actions, board, directory, get_config_path, load_snapshot, seed, stats, Action,
    AssistantGateway, DirectoryAction, DocumentAction, ImportReport, NexusConfig, Priority,
    Requirement, RequirementAction, RequirementStatus, SnapshotFormat, TaskAction, TaskFilter,
    TaskLane, TaskType, Upload, WorkflowAction, Workspace,
};

use crate::cli::{BoardCommand, Cli, Command, ConfigCommand, DocsCommand, ReqCommand, UserCommand};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => get_config_path()?,
    };
    let config = NexusConfig::load_or_default(&config_path)?;
    let gateway = config.assistant.build_gateway();

    // Start from the given snapshot, or the demo data
    let workspace = match &cli.workspace {
        Some(path) => {
            log::info!("Loading workspace from {:?}", path);
            load_snapshot(path)?
        }
        None => seed::workspace().context("Demo data is inconsistent")?,
    };
    log::debug!("Assistant provider: {}", gateway.describe());

    let workspace = match &cli.command {
        Command::Stats => {
            print_stats(&workspace);
            workspace
        }
        Command::Req(cmd) => handle_req_command(cmd, workspace, &gateway)?,
        Command::Board(cmd) => handle_board_command(cmd, workspace)?,
        Command::Docs(cmd) => handle_docs_command(cmd, workspace, &gateway)?,
        Command::Users(cmd) => handle_user_command(cmd, workspace)?,
        Command::Export { format } => {
            let format: SnapshotFormat = format.parse()?;
            nexus_core::write_snapshot(&workspace, format, io::stdout().lock())?;
            workspace
        }
        Command::Shell => run_shell(workspace, &gateway)?,
        Command::Config(cmd) => {
            handle_config_command(cmd, &config_path, &config, &gateway)?;
            workspace
        }
    };

    if let Some(format) = &cli.emit {
        let format: SnapshotFormat = format.parse()?;
        nexus_core::write_snapshot(&workspace, format, io::stdout().lock())?;
    }

    Ok(())
}

/// Applies an action, turning a rejection into a readable error
fn dispatch(ws: &Workspace, action: impl Into<Action>) -> Result<Workspace> {
    let next = ws.apply(action.into())?;
    Ok(next)
}

// =========================================================================
// Requirements
// =========================================================================

fn handle_req_command(
    cmd: &ReqCommand,
    ws: Workspace,
    gateway: &AssistantGateway,
) -> Result<Workspace> {
    match cmd {
        ReqCommand::List { status } => {
            let status = status
                .as_deref()
                .map(str::parse::<RequirementStatus>)
                .transpose()?;
            print_requirements(&ws, status);
            Ok(ws)
        }
        ReqCommand::Show { id } => {
            let req = find_requirement(&ws, id)?;
            print_requirement_detail(&ws, req);
            Ok(ws)
        }
        ReqCommand::Add {
            title,
            description,
            priority,
            interactive,
        } => {
            let should_be_interactive =
                *interactive || (title.is_none() && description.is_none() && priority.is_none());

            let (title, description, priority) = if should_be_interactive {
                prompts::prompt_new_requirement()?
            } else {
                let title = match title {
                    Some(t) => t.clone(),
                    None => anyhow::bail!("Title is required. Use --title to specify a title."),
                };
                let priority = match priority {
                    Some(p) => p.parse::<Priority>()?,
                    None => Priority::default(),
                };
                (title, description.clone().unwrap_or_default(), priority)
            };

            let next = dispatch(
                &ws,
                RequirementAction::Create {
                    title,
                    description,
                    priority,
                },
            )?;
            if let Some(req) = next.requirements().last() {
                println!("{}", "Requirement added successfully!".green());
                println!("ID: {}", req.id.green());
            }
            Ok(next)
        }
        ReqCommand::Transition { id, action } => {
            let action: WorkflowAction = action.parse()?;
            let next = dispatch(
                &ws,
                RequirementAction::Transition {
                    id: id.clone(),
                    action,
                },
            )?;
            let req = find_requirement(&next, id)?;
            println!("{} {} -> {}", "Updated".green(), req.id, status_badge(req.status));
            Ok(next)
        }
        ReqCommand::Comment { id, user, content } => {
            let next = dispatch(
                &ws,
                RequirementAction::Comment {
                    id: id.clone(),
                    user_id: user.clone(),
                    content: content.clone(),
                },
            )?;
            println!("{}", "Comment added.".green());
            Ok(next)
        }
        ReqCommand::Assign { id, user, clear } => {
            if user.is_none() && !clear {
                anyhow::bail!("Use --user <id> to assign or --clear to unassign.");
            }
            let next = dispatch(
                &ws,
                RequirementAction::Assign {
                    id: id.clone(),
                    user_id: user.clone(),
                },
            )?;
            println!("{}", "Assignment updated.".green());
            Ok(next)
        }
        ReqCommand::Summarize { id } => {
            let req = find_requirement(&ws, id)?;
            println!("{}", "AI 智能分析报告:".bold());
            println!("{}", gateway.summarize(&req.description));
            Ok(ws)
        }
    }
}

fn find_requirement<'a>(ws: &'a Workspace, id: &str) -> Result<&'a Requirement> {
    ws.requirement(id)
        .with_context(|| format!("Requirement not found: {}", id))
}

fn status_badge(status: RequirementStatus) -> String {
    let label = format!("{} ({})", status.label(), status);
    match status {
        RequirementStatus::Draft => label.dimmed().to_string(),
        RequirementStatus::Review => label.yellow().to_string(),
        RequirementStatus::Approved => label.green().to_string(),
        RequirementStatus::Development => label.blue().to_string(),
        RequirementStatus::Done => label.magenta().to_string(),
    }
}

fn print_requirements(ws: &Workspace, status: Option<RequirementStatus>) {
    let reqs: Vec<_> = ws
        .requirements()
        .iter()
        .filter(|r| status.map_or(true, |s| r.status == s))
        .collect();

    if reqs.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return;
    }

    for req in reqs {
        println!(
            "{:<12} {:<20} {:<6} {}",
            req.id,
            status_badge(req.status),
            req.priority.label(),
            req.title
        );
    }
}

fn print_requirement_detail(ws: &Workspace, req: &Requirement) {
    println!("{}", req.title.bold());
    println!("ID:       {}", req.id);
    println!("Status:   {}", status_badge(req.status));
    println!("Priority: {} ({})", req.priority.label(), req.priority);
    let assignee = req
        .assigned_to
        .as_deref()
        .map(|id| ws.user(id).map_or(id.to_string(), |u| u.name.clone()))
        .unwrap_or_else(|| "Unassigned".to_string());
    println!("Assignee: {}", assignee);
    println!("Created:  {}", req.created_at.format("%Y-%m-%d"));
    println!();
    println!("{}", req.description);

    let actions = allowed_actions(req.status);
    if !actions.is_empty() {
        let names: Vec<String> = actions
            .iter()
            .map(|a| format!("{} ({})", a.label(), a))
            .collect();
        println!();
        println!("Actions: {}", names.join(", "));
    }

    println!();
    if req.comments.is_empty() {
        println!("{}", "暂无评论。".dimmed());
    }
    for comment in &req.comments {
        let author = ws
            .user(&comment.user_id)
            .map_or(comment.user_id.to_uppercase(), |u| u.name.clone());
        println!(
            "{} {}: {}",
            comment.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            author.cyan(),
            comment.content
        );
    }
}

// =========================================================================
// Board
// =========================================================================

fn parse_filter(value: &str) -> Result<TaskFilter> {
    match value.to_lowercase().as_str() {
        "all" | "全部" => Ok(TaskFilter::All),
        other => Ok(TaskFilter::Only(other.parse::<TaskType>()?)),
    }
}

fn handle_board_command(cmd: &BoardCommand, ws: Workspace) -> Result<Workspace> {
    match cmd {
        BoardCommand::Show { r#type } => {
            print_board(&ws, parse_filter(r#type)?);
            Ok(ws)
        }
        BoardCommand::Move { id, lane } => {
            let lane: TaskLane = lane.parse()?;
            let next = dispatch(&ws, TaskAction::Move { id: id.clone(), lane })?;
            println!("{} {} -> {}", "Moved".green(), id, lane.label());
            Ok(next)
        }
        BoardCommand::Add {
            title,
            assignee,
            r#type,
        } => {
            let task = board::create(title, assignee, r#type.parse()?);
            let id = task.id.clone();
            let next = dispatch(&ws, TaskAction::Add(task))?;
            println!("{} {}", "Task added:".green(), id);
            Ok(next)
        }
    }
}

fn print_board(ws: &Workspace, filter: TaskFilter) {
    println!("{}", filter.label().bold());
    for lane in ws.board(filter) {
        println!();
        println!("{} ({})", lane.lane.label().bold(), lane.tasks.len());
        for task in lane.tasks {
            let kind = match task.kind {
                TaskType::RnD => task.kind.label().blue(),
                TaskType::Delivery => task.kind.label().yellow(),
            };
            println!("  {:<6} [{}] {} ({})", task.id, kind, task.title, task.assignee);
        }
    }
}

// =========================================================================
// Documents
// =========================================================================

fn handle_docs_command(
    cmd: &DocsCommand,
    ws: Workspace,
    gateway: &AssistantGateway,
) -> Result<Workspace> {
    match cmd {
        DocsCommand::Tree => {
            print_tree(&ws);
            Ok(ws)
        }
        DocsCommand::Show { id } => {
            let doc = ws
                .documents()
                .get(id)
                .with_context(|| format!("Document not found: {}", id))?;
            println!("{}", doc.title.bold());
            println!(
                "{}",
                format!("Last modified {}", doc.last_modified.format("%Y-%m-%d %H:%M")).dimmed()
            );
            println!();
            println!("{}", doc.content);
            for attachment in &doc.attachments {
                println!("  [{}] {} <{}>", attachment.kind, attachment.name, attachment.url);
            }
            Ok(ws)
        }
        DocsCommand::New {
            parent,
            title,
            folder,
        } => {
            let action = if *folder {
                let title = title
                    .clone()
                    .context("Folders need a name. Use --title to specify one.")?;
                DocumentAction::CreateFolder {
                    parent_id: parent.clone(),
                    title,
                }
            } else {
                DocumentAction::Create {
                    parent_id: parent.clone(),
                    title: title.clone(),
                }
            };
            let next = dispatch(&ws, action)?;
            if let Some(doc) = next.documents().documents().last() {
                println!("{} {}", "Created".green(), doc.id);
            }
            Ok(next)
        }
        DocsCommand::Edit { id, from } => {
            let content = read_input(from)?;
            let next = dispatch(
                &ws,
                DocumentAction::UpdateContent {
                    id: id.clone(),
                    content,
                },
            )?;
            println!("{}", "Document updated.".green());
            Ok(next)
        }
        DocsCommand::Attach {
            id,
            name,
            mime,
            url,
        } => {
            let next = dispatch(
                &ws,
                DocumentAction::Attach {
                    id: id.clone(),
                    upload: Upload {
                        name: name.clone(),
                        mime: mime.clone(),
                        blob_ref: url.clone(),
                    },
                },
            )?;
            println!("{}", "Attachment added.".green());
            Ok(next)
        }
        DocsCommand::Move { id, parent } => {
            let next = dispatch(
                &ws,
                DocumentAction::Reparent {
                    id: id.clone(),
                    parent_id: parent.clone(),
                },
            )?;
            println!("{} {} -> {}", "Moved".green(), id, parent);
            Ok(next)
        }
        DocsCommand::Rm { id, yes } => {
            if !*yes && !prompts::confirm(&format!("Delete {} and everything beneath it?", id))? {
                println!("Cancelled.");
                return Ok(ws);
            }
            let next = dispatch(&ws, DocumentAction::Remove(id.clone()))?;
            println!("{}", "Deleted.".green());
            Ok(next)
        }
        DocsCommand::Ask { id, question } => {
            let doc = ws
                .documents()
                .get(id)
                .with_context(|| format!("Document not found: {}", id))?;
            println!("{}", gateway.ask(question, &doc.content));
            Ok(ws)
        }
    }
}

fn print_tree(ws: &Workspace) {
    for entry in ws.documents().outline() {
        let indent = "  ".repeat(entry.depth);
        let title = if entry.doc.is_folder() {
            entry.doc.title.bold().to_string()
        } else {
            entry.doc.title.clone()
        };
        let attachments = match entry.doc.attachments.len() {
            0 => String::new(),
            n => format!(" ({} attachment(s))", n).dimmed().to_string(),
        };
        println!("{}{} {}{}", indent, entry.doc.id.dimmed(), title, attachments);
    }
}

// =========================================================================
// Users
// =========================================================================

fn handle_user_command(cmd: &UserCommand, ws: Workspace) -> Result<Workspace> {
    match cmd {
        UserCommand::List => {
            print_users(&ws);
            Ok(ws)
        }
        UserCommand::Add {
            name,
            employee_id,
            department,
            project_group,
        } => {
            let fields = match name {
                Some(name) => nexus_core::NewUser {
                    name: name.clone(),
                    employee_id: employee_id.clone(),
                    department: department.clone(),
                    project_group: project_group.clone(),
                },
                None => prompts::prompt_new_user()?,
            };
            let user = directory::add_user(fields);
            let id = user.id.clone();
            let next = dispatch(&ws, DirectoryAction::Add(user))?;
            println!("{} {}", "User added:".green(), id);
            Ok(next)
        }
        UserCommand::Import { file } => {
            let text = read_input(file)?;
            let report = directory::bulk_import(&text);
            print_import_report(&report);
            dispatch(&ws, DirectoryAction::AddMany(report.users))
        }
        UserCommand::Rm { id, yes } => {
            if !*yes && !prompts::confirm("确认删除该用户吗？")? {
                println!("Cancelled.");
                return Ok(ws);
            }
            let next = dispatch(&ws, DirectoryAction::Remove(id.clone()))?;
            println!("{}", "User removed.".green());
            Ok(next)
        }
    }
}

fn print_users(ws: &Workspace) {
    if ws.users().is_empty() {
        println!("{}", "No users found.".yellow());
        return;
    }
    for user in ws.users() {
        println!(
            "{:<16} {:<20} {:<10} {:<10} {}",
            user.id, user.name, user.employee_id, user.department, user.project_group
        );
    }
}

fn print_import_report(report: &ImportReport) {
    let summary = report.summary();
    if report.dropped.is_empty() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
        for row in &report.dropped {
            println!("  line {}: {} ({:?})", row.line, row.reason, row.content);
        }
    }
}

/// Reads a file, or stdin when the path is `-`
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
}

// =========================================================================
// Dashboard / config
// =========================================================================

fn print_stats(ws: &Workspace) {
    println!("{}", "需求状态分布".bold());
    for (status, count) in stats::status_counts(ws.requirements()) {
        println!("  {:<20} {}", status_badge(status), count);
    }
    println!();
    println!("待评审: {}", stats::pending_review(ws.requirements()));
    println!("任务:   {}", ws.tasks().len());
    println!("文档:   {}", ws.documents().len() - 1);
    println!("成员:   {}", ws.users().len());
}

fn handle_config_command(
    cmd: &ConfigCommand,
    path: &Path,
    config: &NexusConfig,
    gateway: &AssistantGateway,
) -> Result<()> {
    match cmd {
        ConfigCommand::Path => println!("{}", path.display()),
        ConfigCommand::Init => {
            NexusConfig::create_default(path)?;
            println!("{} {}", "Config ready at".green(), path.display());
        }
        ConfigCommand::Show => {
            println!("Model:    {}", config.assistant.model);
            println!("Timeout:  {}s", config.assistant.timeout().as_secs());
            println!("Provider: {}", gateway.describe());
        }
    }
    Ok(())
}

// =========================================================================
// Interactive shell
// =========================================================================

const MENU: [&str; 10] = [
    "Dashboard",
    "Requirements",
    "Advance requirement",
    "Comment on requirement",
    "Board",
    "Move task",
    "Documents",
    "Ask about a document",
    "Import users",
    "Quit",
];

fn run_shell(mut ws: Workspace, gateway: &AssistantGateway) -> Result<Workspace> {
    loop {
        // Esc or Ctrl-C on the menu ends the session
        let Ok(choice) = Select::new("Nexus:", MENU.to_vec()).prompt() else {
            return Ok(ws);
        };
        let result = match choice {
            "Dashboard" => {
                print_stats(&ws);
                Ok(None)
            }
            "Requirements" => {
                print_requirements(&ws, None);
                Ok(None)
            }
            "Advance requirement" => shell_advance(&ws),
            "Comment on requirement" => shell_comment(&ws),
            "Board" => {
                print_board(&ws, TaskFilter::All);
                Ok(None)
            }
            "Move task" => shell_move_task(&ws),
            "Documents" => {
                print_tree(&ws);
                Ok(None)
            }
            "Ask about a document" => shell_ask(&ws, gateway).map(|_| None),
            "Import users" => shell_import(&ws),
            _ => return Ok(ws),
        };

        // A rejected action keeps the current snapshot
        match result {
            Ok(Some(next)) => ws = next,
            Ok(None) => {}
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
        println!();
    }
}

fn shell_advance(ws: &Workspace) -> Result<Option<Workspace>> {
    let Some(id) = prompts::prompt_select_requirement(ws)? else {
        return Ok(None);
    };
    let req = find_requirement(ws, &id)?;
    let actions = allowed_actions(req.status);
    if actions.is_empty() {
        println!("{}", "This requirement is done.".dimmed());
        return Ok(None);
    }
    let action = prompts::prompt_select_action(actions)?;
    let next = dispatch(ws, RequirementAction::Transition { id: id.clone(), action })?;
    if let Some(req) = next.requirement(&id) {
        println!("{} {}", "Now".green(), status_badge(req.status));
    }
    Ok(Some(next))
}

fn shell_comment(ws: &Workspace) -> Result<Option<Workspace>> {
    let Some(id) = prompts::prompt_select_requirement(ws)? else {
        return Ok(None);
    };
    let Some(user_id) = prompts::prompt_select_user(ws)? else {
        return Ok(None);
    };
    let content = Text::new("Comment:").prompt()?;
    let next = dispatch(
        ws,
        RequirementAction::Comment {
            id,
            user_id,
            content,
        },
    )?;
    Ok(Some(next))
}

fn shell_move_task(ws: &Workspace) -> Result<Option<Workspace>> {
    let Some(id) = prompts::prompt_select_task(ws)? else {
        return Ok(None);
    };
    let lane = prompts::prompt_select_lane()?;
    Ok(Some(dispatch(ws, TaskAction::Move { id, lane })?))
}

fn shell_ask(ws: &Workspace, gateway: &AssistantGateway) -> Result<()> {
    let Some(id) = prompts::prompt_select_document(ws)? else {
        return Ok(());
    };
    let question = Text::new("Question:").prompt()?;
    let context = ws
        .documents()
        .get(&id)
        .map(|d| d.content.clone())
        .unwrap_or_default();
    println!("{}", gateway.ask(&question, &context));
    Ok(())
}

fn shell_import(ws: &Workspace) -> Result<Option<Workspace>> {
    let text = inquire::Editor::new("Paste rows (name, employee id, department, group):")
        .prompt()?;
    let report = directory::bulk_import(&text);
    print_import_report(&report);
    Ok(Some(dispatch(ws, DirectoryAction::AddMany(report.users))?))
}
