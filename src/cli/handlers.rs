use std::env;
use std::fs;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::commands::{ExportFormat, LessonAction, NoteAction, TagAction};
use crate::cache::{refresh_cache, SqliteCache};
use crate::config::Config;
use crate::entity::{Lesson, NewNote, Note, NoteTag};
use crate::error::{LessonNoteError, Result};
use crate::export::{export_json, export_markdown, utils::short_uuid};
use crate::import::{import_lesson, LessonMeta};
use crate::lesson::LessonRepo;
use crate::notes::{resolve_tags, NoteRepo, NoteUpdate, TagRepo};
use crate::search::{parse_query, SearchFilter};
use crate::server::{self, AppState};
use crate::storage::{LoroStore, DATA_DIR};
use crate::sync::{extract_class_info, extract_vocabulary, SyncOutcome};
use crate::template::{generate_note_template, TemplateParams};

/// Find the workspace root by looking for .lessonnote/ or .git/
fn find_project_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(DATA_DIR).exists() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

/// An opened workspace: root, store and config
struct Workspace {
    root: PathBuf,
    store: LoroStore,
    config: Config,
}

impl Workspace {
    fn open() -> Result<Self> {
        let root = find_project_root();
        let store = LoroStore::open(&root)?;
        let config = Config::load(store.data_dir()?)?;
        Ok(Self { root, store, config })
    }

    fn user(&self, explicit: Option<String>) -> String {
        self.config.resolve_user(explicit)
    }
}

/// Read a file argument, with `-` meaning stdin
fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(fs::read_to_string(file)?)
    }
}

fn read_stdin() -> Result<String> {
    read_input("-")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Ask for confirmation on an interactive terminal; refuse otherwise
fn confirm(prompt: &str) -> Result<bool> {
    eprintln!("{} [y/N] ", prompt);

    if atty::is(atty::Stream::Stdin) {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().eq_ignore_ascii_case("y"))
    } else {
        Err(LessonNoteError::Validation(
            "Use --force to delete in non-interactive mode".to_string(),
        ))
    }
}

fn print_sync(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Completed(stats) => {
            println!(
                "Synced lesson {}: {} note(s) updated",
                stats.lesson_id, stats.updated_count
            );
            for issue in &stats.skipped {
                println!("  skipped {} ({}): {}", short_uuid(&issue.note_id), issue.user_id, issue.reason);
            }
            for issue in &stats.failed {
                println!("  failed {} ({}): {}", short_uuid(&issue.note_id), issue.user_id, issue.reason);
            }
        }
        SyncOutcome::Failed { error } => println!("Sync failed: {}", error),
    }
}

fn print_note_line(note: &Note, tags: &[NoteTag]) {
    let lesson = note
        .lesson_id
        .as_deref()
        .map(|l| format!(" [{}]", l))
        .unwrap_or_default();
    println!(
        "  {} {}{} ({})",
        short_uuid(&note.id),
        note.title,
        lesson,
        note.updated_at.format("%Y-%m-%d %H:%M")
    );
    let names: Vec<&str> = resolve_tags(note, tags).iter().map(|t| t.name.as_str()).collect();
    if !names.is_empty() {
        println!("      tags: {}", names.join(", "));
    }
}

/// Map tag names or ID prefixes to tag IDs
fn tag_ids(store: &LoroStore, user: &str, refs: &[String]) -> Result<Vec<String>> {
    let repo = TagRepo::new(store);
    refs.iter()
        .map(|r| repo.resolve(user, r).map(|t| t.id.to_string()))
        .collect()
}

// ============================================================================
// init
// ============================================================================

pub fn handle_init(default_user: Option<String>) -> Result<()> {
    let root = env::current_dir()?;
    let store = LoroStore::init(&root)?;

    let mut config = Config::default();
    if let Some(user) = default_user {
        config.default_user = user;
    }
    config.save(store.data_dir()?)?;

    println!("Initialized lessonnote workspace in {}", root.display());
    println!("  default user: {}", config.default_user);

    Ok(())
}

// ============================================================================
// lesson
// ============================================================================

pub fn handle_lesson(action: LessonAction) -> Result<()> {
    let ws = Workspace::open()?;
    let repo = LessonRepo::new(&ws.store);

    match action {
        LessonAction::Import {
            file,
            id,
            topic_id,
            topic,
            level,
            date,
            series,
            json,
        } => {
            let meta = LessonMeta {
                date,
                topic_id,
                topic_name: topic,
                level,
                series_info: series,
            };
            let lesson = import_lesson(&read_input(&file)?, &id, meta)?;
            let saved = repo.save(lesson)?;
            ws.store.save()?;

            if json {
                print_json(&saved)?;
            } else {
                println!(
                    "Imported lesson {} - {} ({} pages)",
                    saved.lesson.id,
                    saved.lesson.title,
                    saved.lesson.pages.len()
                );
                print_sync(&saved.sync);
            }
        }
        LessonAction::Save { file, json } => {
            let lesson: Lesson = serde_json::from_str(&read_input(&file)?)?;
            let saved = repo.save(lesson)?;
            ws.store.save()?;

            if json {
                print_json(&saved)?;
            } else {
                println!("Saved lesson {} - {}", saved.lesson.id, saved.lesson.title);
                print_sync(&saved.sync);
            }
        }
        LessonAction::List { json } => {
            let lessons = repo.list()?;
            if json {
                print_json(&lessons)?;
            } else if lessons.is_empty() {
                println!("No lessons found.");
            } else {
                println!("Lessons:\n");
                for l in lessons {
                    let level = l.level.as_deref().map(|lv| format!(" [{}]", lv)).unwrap_or_default();
                    println!("  {}{} {} ({} pages)", l.id, level, l.title, l.pages.len());
                }
            }
        }
        LessonAction::Show { id, json } => {
            let lesson = repo.get(&id)?;
            if json {
                print_json(&lesson)?;
            } else {
                let info = extract_class_info(&lesson);
                println!("{} - {}", lesson.id, lesson.title);
                if let Some(description) = &lesson.description {
                    println!("  {}", description);
                }
                println!("  date:   {}", info.lesson_date);
                println!("  topic:  {}", info.topic_name);
                println!("  level:  {}", info.level);
                if let Some(series) = &info.series_info {
                    println!("  series: {}", series);
                }
                println!("  pages:");
                for page in &lesson.pages {
                    println!("    {} [{}] {}", page.id, page.page_type, page.title);
                }
                let vocabulary = extract_vocabulary(&lesson);
                if !vocabulary.is_empty() {
                    println!("  vocabulary: {} words", vocabulary.len());
                }
            }
        }
        LessonAction::Sync { id, json } => {
            let outcome = repo.resync(&id)?;
            ws.store.save()?;
            if json {
                print_json(&outcome)?;
            } else {
                print_sync(&outcome);
            }
        }
        LessonAction::Delete { id, force } => {
            let lesson = repo.get(&id)?;
            if !force && !confirm(&format!("Delete lesson {} - {}?", lesson.id, lesson.title))? {
                println!("Cancelled.");
                return Ok(());
            }
            repo.delete(&id)?;
            ws.store.save()?;
            println!("Deleted lesson {} - {}", lesson.id, lesson.title);
        }
    }

    Ok(())
}

// ============================================================================
// note
// ============================================================================

pub fn handle_note(action: NoteAction, user: Option<String>) -> Result<()> {
    let ws = Workspace::open()?;
    let user = ws.user(user);
    let repo = NoteRepo::new(&ws.store);

    match action {
        NoteAction::New {
            lesson,
            topic,
            title,
            tags,
            stdin,
            json,
        } => {
            let content = if stdin {
                Some(read_stdin()?).filter(|c| !c.is_empty())
            } else {
                None
            };
            let note = repo.create(NewNote {
                user_id: user.clone(),
                lesson_id: lesson,
                topic_id: topic,
                title,
                content,
                tags: tag_ids(&ws.store, &user, &tags)?,
            })?;
            ws.store.save()?;

            if json {
                print_json(&note)?;
            } else {
                println!("Created note {} - {}", short_uuid(&note.id), note.title);
            }
        }
        NoteAction::List { lesson, json } => {
            let notes: Vec<Note> = repo
                .list_for_user(&user)?
                .into_iter()
                .filter(|n| lesson.is_none() || n.lesson_id == lesson)
                .collect();
            if json {
                print_json(&notes)?;
            } else if notes.is_empty() {
                println!("No notes found.");
            } else {
                let tags = TagRepo::new(&ws.store).list(&user)?;
                println!("Notes for {}:\n", user);
                for note in &notes {
                    print_note_line(note, &tags);
                }
            }
        }
        NoteAction::Show { id, json } => {
            let note = repo.resolve(&user, &id)?;
            if json {
                print_json(&note)?;
            } else {
                let tags = TagRepo::new(&ws.store).list(&user)?;
                print_note_line(&note, &tags);
                println!();
                println!("{}", note.content);
            }
        }
        NoteAction::Edit {
            id,
            title,
            topic,
            clear_topic,
            stdin,
            json,
        } => {
            let note = repo.resolve(&user, &id)?;
            let content = if stdin { Some(read_stdin()?) } else { None };
            let topic_id = if clear_topic { Some(None) } else { topic.map(Some) };

            let updated = repo.update(
                &user,
                &note.id,
                NoteUpdate {
                    title,
                    content,
                    topic_id,
                    ..Default::default()
                },
            )?;
            ws.store.save()?;

            if json {
                print_json(&updated)?;
            } else {
                println!("Updated note {} - {}", short_uuid(&updated.id), updated.title);
            }
        }
        NoteAction::Delete { id, force } => {
            let note = repo.resolve(&user, &id)?;
            if !force
                && !confirm(&format!("Delete note {} - {}?", short_uuid(&note.id), note.title))?
            {
                println!("Cancelled.");
                return Ok(());
            }
            repo.delete(&user, &note.id)?;
            ws.store.save()?;
            println!("Deleted note {} - {}", short_uuid(&note.id), note.title);
        }
        NoteAction::Tag {
            id,
            add,
            remove,
            json,
        } => {
            let note = repo.resolve(&user, &id)?;
            let tag_repo = TagRepo::new(&ws.store);
            // Tags already deleted can still be removed by their raw ID
            let remove_tags = remove
                .iter()
                .map(|r| match tag_repo.resolve(&user, r) {
                    Ok(tag) => Ok(tag.id.to_string()),
                    Err(e) if e.is_not_found() => Ok(r.clone()),
                    Err(e) => Err(e),
                })
                .collect::<Result<Vec<_>>>()?;

            let updated = repo.update(
                &user,
                &note.id,
                NoteUpdate {
                    add_tags: tag_ids(&ws.store, &user, &add)?,
                    remove_tags,
                    ..Default::default()
                },
            )?;
            ws.store.save()?;

            if json {
                print_json(&updated)?;
            } else {
                let tags = tag_repo.list(&user)?;
                print_note_line(&updated, &tags);
            }
        }
    }

    Ok(())
}

// ============================================================================
// search
// ============================================================================

pub fn handle_search(
    user: Option<String>,
    query: String,
    topic: Option<String>,
    tags: Vec<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let ws = Workspace::open()?;
    let user = ws.user(user);
    let cache = SqliteCache::open(ws.store.data_dir()?)?;

    // Sync cache with store
    refresh_cache(&ws.store, &cache)?;

    let (text, inline) = parse_query(&query);
    let filter = inline.merge(SearchFilter {
        topic_id: topic,
        tag_ids: tag_ids(&ws.store, &user, &tags)?,
    });
    let results = cache.search_notes(
        &user,
        &text,
        &filter,
        Some(limit.unwrap_or(ws.config.search_limit)),
    )?;

    if json {
        print_json(&results)?;
    } else if results.is_empty() {
        println!("No results found for '{}'.", query);
    } else {
        println!("Search results for '{}':\n", query);
        for r in results {
            println!("  {} {}", &r.id[..8.min(r.id.len())], r.title);
            if let Some(snippet) = r.snippet {
                println!("      {}", snippet);
            }
        }
    }

    Ok(())
}

// ============================================================================
// tag
// ============================================================================

pub fn handle_tag(action: TagAction, user: Option<String>) -> Result<()> {
    let ws = Workspace::open()?;
    let user = ws.user(user);
    let repo = TagRepo::new(&ws.store);

    match action {
        TagAction::Add { name, color, json } => {
            let tag = repo.create(&user, &name, color)?;
            ws.store.save()?;
            if json {
                print_json(&tag)?;
            } else {
                println!("Created tag {} ({}) {}", tag.name, short_uuid(&tag.id), tag.color);
            }
        }
        TagAction::List { json } => {
            let tags = repo.list(&user)?;
            if json {
                print_json(&tags)?;
            } else if tags.is_empty() {
                println!("No tags found.");
            } else {
                for tag in tags {
                    println!("  {} {} {}", short_uuid(&tag.id), tag.color, tag.name);
                }
            }
        }
        TagAction::Edit {
            id,
            name,
            color,
            json,
        } => {
            let tag = repo.resolve(&user, &id)?;
            let updated = repo.update(&user, &tag.id, name.as_deref(), color)?;
            ws.store.save()?;
            if json {
                print_json(&updated)?;
            } else {
                println!("Updated tag {} ({}) {}", updated.name, short_uuid(&updated.id), updated.color);
            }
        }
        TagAction::Delete { id, force } => {
            let tag = repo.resolve(&user, &id)?;
            if !force && !confirm(&format!("Delete tag {}?", tag.name))? {
                println!("Cancelled.");
                return Ok(());
            }
            repo.delete(&user, &tag.id)?;
            ws.store.save()?;
            println!("Deleted tag {}", tag.name);
        }
    }

    Ok(())
}

// ============================================================================
// template / export / serve
// ============================================================================

pub fn handle_template(lesson: Option<String>) -> Result<()> {
    let params = match lesson {
        Some(id) => {
            let ws = Workspace::open()?;
            let lesson = LessonRepo::new(&ws.store).get(&id)?;
            TemplateParams::from_class_info(&extract_class_info(&lesson), &extract_vocabulary(&lesson))
        }
        None => TemplateParams::default(),
    };
    print!("{}", generate_note_template(&params));
    Ok(())
}

pub fn handle_export(user: Option<String>, format: ExportFormat, out: Option<PathBuf>) -> Result<()> {
    let ws = Workspace::open()?;
    let user = ws.user(user);
    let notes = NoteRepo::new(&ws.store).list_for_user(&user)?;
    let tags = TagRepo::new(&ws.store).list(&user)?;

    let target = out.unwrap_or_else(|| ws.root.join(&ws.config.export_dir));
    let stats = match format {
        ExportFormat::Markdown => export_markdown(&notes, &tags, &target)?,
        ExportFormat::Json => {
            let path = if target.extension().is_some() {
                target.clone()
            } else {
                target.join(format!("{}.json", user))
            };
            export_json(&notes, &tags, &path)?
        }
    };

    println!("Exported {} note(s) to {}", stats.notes, display_path(&ws.root, &target));
    Ok(())
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

pub fn handle_serve(bind: Option<String>) -> Result<()> {
    let ws = Workspace::open()?;
    let bind = bind.unwrap_or_else(|| ws.config.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| LessonNoteError::Config(format!("bind '{}' is not a socket address", bind)))?;

    let cache = SqliteCache::open(ws.store.data_dir()?)?;
    let state = AppState::new(ws.store, cache, ws.config.search_limit);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received Ctrl-C, shutting down");
                    trigger.cancel();
                }
                Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl-C"),
            }
        });

        server::serve(state, addr, shutdown).await
    })
}
