use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Nexus R&D workbench: requirements, board, docs and team directory")]
pub struct Cli {
    /// Workspace snapshot to start from (YAML or JSON). Demo data when omitted.
    #[clap(long, short = 'w', global = true)]
    pub workspace: Option<PathBuf>,

    /// Path to the config file (defaults to $NEXUS_CONFIG_PATH or ~/.nexus.config)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the resulting snapshot (yaml or json) after the command
    #[clap(long, global = true)]
    pub emit: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show dashboard figures
    Stats,

    /// Requirement tracker
    #[clap(subcommand)]
    Req(ReqCommand),

    /// Project board
    #[clap(subcommand)]
    Board(BoardCommand),

    /// Knowledge base
    #[clap(subcommand)]
    Docs(DocsCommand),

    /// Team directory
    #[clap(subcommand)]
    Users(UserCommand),

    /// Print the workspace snapshot
    Export {
        /// Output format (yaml or json)
        #[clap(long, default_value = "yaml")]
        format: String,
    },

    /// Interactive session; changes last until you quit
    Shell,

    /// Configuration file helpers
    #[clap(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ReqCommand {
    /// List requirements
    List {
        /// Only show this status
        #[clap(long)]
        status: Option<String>,
    },

    /// Show a requirement with its comments and available actions
    Show { id: String },

    /// Create a requirement in Draft
    Add {
        #[clap(long)]
        title: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// Low, Medium, High or Critical
        #[clap(long)]
        priority: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// Apply a workflow action (request-review, approve, reject, start-development, mark-done)
    Transition { id: String, action: String },

    /// Add a comment
    Comment {
        id: String,

        /// Author user id
        #[clap(long)]
        user: String,

        content: String,
    },

    /// Assign a requirement to a user, or clear it with --clear
    Assign {
        id: String,

        #[clap(long, conflicts_with = "clear")]
        user: Option<String>,

        #[clap(long)]
        clear: bool,
    },

    /// Ask the assistant for a summary and test ideas
    Summarize { id: String },
}

#[derive(Subcommand, Debug)]
pub enum BoardCommand {
    /// Show the three lanes
    Show {
        /// all, rd or delivery
        #[clap(long, short = 't', default_value = "all")]
        r#type: String,
    },

    /// Move a task to a lane (todo, in-progress, done)
    Move { id: String, lane: String },

    /// Add a task to the todo lane
    Add {
        #[clap(long)]
        title: String,

        #[clap(long, default_value = "")]
        assignee: String,

        /// rd or delivery
        #[clap(long, short = 't', default_value = "rd")]
        r#type: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocsCommand {
    /// Show the document tree
    Tree,

    /// Print a document
    Show { id: String },

    /// Create a document
    New {
        /// Parent folder id
        #[clap(long, default_value = "root")]
        parent: String,

        #[clap(long)]
        title: Option<String>,

        /// Create a folder instead of a document
        #[clap(long)]
        folder: bool,
    },

    /// Replace a document's body with the contents of a file
    Edit {
        id: String,

        /// File holding the new content
        #[clap(long)]
        from: PathBuf,
    },

    /// Attach a file reference to a document
    Attach {
        id: String,

        /// Display name of the file
        #[clap(long)]
        name: String,

        /// MIME type, e.g. image/png
        #[clap(long)]
        mime: String,

        /// Blob handle or URL
        #[clap(long)]
        url: String,
    },

    /// Move a node under another folder
    Move { id: String, parent: String },

    /// Delete a node and everything beneath it
    Rm {
        id: String,

        /// Skip confirmation
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Ask the assistant about a document
    Ask { id: String, question: String },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// List users
    List,

    /// Add a user
    Add {
        #[clap(long)]
        name: Option<String>,

        #[clap(long, default_value = "")]
        employee_id: String,

        #[clap(long, default_value = "")]
        department: String,

        #[clap(long, default_value = "")]
        project_group: String,
    },

    /// Import users from pasted rows: name, employee id, department, project group
    Import {
        /// File to read, or - for stdin
        file: PathBuf,
    },

    /// Remove a user
    Rm {
        id: String,

        /// Skip confirmation
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Write a default config file if none exists
    Init,

    /// Show the effective assistant settings
    Show,
}
