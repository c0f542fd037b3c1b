use clap::Parser;
use lessonnote::cli::{
    handle_export, handle_init, handle_lesson, handle_note, handle_search, handle_serve,
    handle_tag, handle_template, Cli, Commands,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set and valid, otherwise the crate level from `-v`
fn log_filter(verbose: u8, rust_log: Option<&str>) -> EnvFilter {
    if let Some(filter) = rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
    {
        return filter;
    }

    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    EnvFilter::new(format!("lessonnote={}", level))
}

fn main() {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let user = cli.user;
    let result = match cli.command {
        Commands::Init { default_user } => handle_init(default_user),
        Commands::Lesson(cmd) => handle_lesson(cmd.action),
        Commands::Note(cmd) => handle_note(cmd.action, user),
        Commands::Search {
            query,
            topic,
            tags,
            limit,
            json,
        } => handle_search(user, query, topic, tags, limit, json),
        Commands::Tag(cmd) => handle_tag(cmd.action, user),
        Commands::Template { lesson } => handle_template(lesson),
        Commands::Export { format, out } => handle_export(user, format, out),
        Commands::Serve { bind } => handle_serve(bind),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
