use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "lessonnote")]
#[command(version, about = "Lesson-linked study notes that stay in sync with their lessons")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Act as this user (defaults to $LESSONNOTE_USER, then the configured default)
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new lessonnote workspace in the current directory
    Init {
        /// Default user written to the config
        #[arg(long)]
        default_user: Option<String>,
    },

    /// Import, save and sync lessons
    Lesson(LessonCommand),

    /// Create and edit notes
    Note(NoteCommand),

    /// Search the current user's notes
    Search {
        /// Search text; may include `topic:ID` and `tag:ID` filters
        #[arg(default_value = "")]
        query: String,

        /// Only notes with this topic
        #[arg(long)]
        topic: Option<String>,

        /// Only notes carrying one of these tags, by name or ID (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the current user's tags
    Tag(TagCommand),

    /// Print a note template, prefilled from a lesson if given
    Template {
        /// Lesson ID
        #[arg(long)]
        lesson: Option<String>,
    },

    /// Export the current user's notes
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,

        /// Output directory (markdown) or file (json); defaults to the configured export dir
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },

    /// Run the HTTP API
    Serve {
        /// Address to bind, overriding the config
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

#[derive(Args, Debug)]
pub struct LessonCommand {
    #[command(subcommand)]
    pub action: LessonAction,
}

#[derive(Subcommand, Debug)]
pub enum LessonAction {
    /// Import a lesson from the JSON lesson format and sync its notes
    Import {
        /// Lesson file, or `-` for stdin
        file: String,

        /// Lesson ID to store it under
        #[arg(long)]
        id: String,

        #[arg(long)]
        topic_id: Option<String>,

        /// Topic display name
        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        level: Option<String>,

        /// Lesson date, e.g. 2024-03-15
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        series: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save a complete lesson record and sync its notes
    Save {
        /// Lesson file, or `-` for stdin
        file: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List lessons
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a lesson
    Show {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-run sync for a stored lesson
    Sync {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a lesson; linked notes keep their last synced copy
    Delete {
        id: String,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct NoteCommand {
    #[command(subcommand)]
    pub action: NoteAction,
}

#[derive(Subcommand, Debug)]
pub enum NoteAction {
    /// Create a note, optionally linked to a lesson
    New {
        /// Lesson to link and prefill from
        #[arg(long)]
        lesson: Option<String>,

        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        title: Option<String>,

        /// Tags by name or ID (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Read content from stdin instead of using the template
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes, newest first
    List {
        /// Only notes linked to this lesson
        #[arg(long)]
        lesson: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a note
    Show {
        /// Note UUID or unique prefix
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a note's title, topic or content
    Edit {
        /// Note UUID or unique prefix
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, conflicts_with = "clear_topic")]
        topic: Option<String>,

        /// Remove the note's topic
        #[arg(long)]
        clear_topic: bool,

        /// Replace content with stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a note
    Delete {
        /// Note UUID or unique prefix
        id: String,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Add or remove tags on a note
    Tag {
        /// Note UUID or unique prefix
        id: String,

        /// Tag to add, by name or ID (repeatable)
        #[arg(long = "add", short = 'a')]
        add: Vec<String>,

        /// Tag to remove, by name or ID (repeatable)
        #[arg(long = "remove", short = 'r')]
        remove: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct TagCommand {
    #[command(subcommand)]
    pub action: TagAction,
}

#[derive(Subcommand, Debug)]
pub enum TagAction {
    /// Create a tag
    Add {
        name: String,

        /// Hex color like #22c55e
        #[arg(long)]
        color: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List tags
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename or recolor a tag
    Edit {
        /// Tag name, UUID or unique prefix
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        color: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a tag; notes keep the reference but no longer show it
    Delete {
        /// Tag name, UUID or unique prefix
        id: String,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },
}
