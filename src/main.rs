//! # Quillpad
//!
//! Command-line front end to the editor core: crash recovery, syntax
//! styling, search and plugin discovery without a GUI.
//!
//! ## Quick Start
//!
//! ```bash
//! # Recover the previous session and list the tabs
//! cargo run -- restore
//!
//! # Show the styled spans of a file
//! cargo run -- highlight src/main.rs
//!
//! # Search backwards with wrap-around
//! cargo run -- find notes.txt "TODO" --backward --wrap
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quillpad_buffer::{Position, SearchDirection, SearchOptions, TextBuffer};
use quillpad_core::{AppPaths, Config, Editor};
use quillpad_plugin::PluginManager;
use quillpad_syntax::GrammarRegistry;

/// Quillpad - a plain-text editor core
#[derive(Parser, Debug)]
#[command(name = "quillpad")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Application directory (defaults to $QUILLPAD_HOME, then the platform config dir)
    #[arg(long, value_name = "DIR", global = true)]
    home: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Recover the previous session, clean up stale backups and list the tabs
    Restore,

    /// Print the styled spans of a file
    Highlight {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Grammar to use instead of the one matching the file extension
        #[arg(short, long, value_name = "NAME")]
        language: Option<String>,
    },

    /// List registered grammars and their extensions
    Languages,

    /// Search a file
    Find {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "PATTERN")]
        pattern: String,

        /// Treat PATTERN as a regular expression
        #[arg(long)]
        regex: bool,

        /// Case-sensitive matching
        #[arg(long)]
        match_case: bool,

        /// Search from the end of the file towards the start
        #[arg(long)]
        backward: bool,

        /// Continue from the other end after the last match
        #[arg(long)]
        wrap: bool,
    },

    /// List installed plugins
    Plugins,
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Quillpad v{}", env!("CARGO_PKG_VERSION"));

    let paths = AppPaths::resolve(args.home).context("Could not determine the application directory")?;

    match args.command {
        Commands::Restore => restore(paths),
        Commands::Highlight { file, language } => highlight(&paths, &file, language.as_deref()),
        Commands::Languages => languages(&paths),
        Commands::Find {
            file,
            pattern,
            regex,
            match_case,
            backward,
            wrap,
        } => {
            let direction = if backward {
                SearchDirection::Up
            } else {
                SearchDirection::Down
            };
            let options = SearchOptions {
                text: pattern,
                match_case,
                wrap_around: wrap,
                use_regex: regex,
                direction,
            };
            find(&file, options)
        }
        Commands::Plugins => plugins(&paths),
    }
}

fn restore(paths: AppPaths) -> anyhow::Result<()> {
    let mut editor = Editor::open(paths).context("Could not open the editor state")?;
    editor.restore_session();

    for doc in editor.documents().iter() {
        let location = doc
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(unsaved)".to_string());
        println!(
            "{}\t{}\t{}\t{}{}",
            doc.title(),
            location,
            doc.grammar().unwrap_or(quillpad_syntax::NO_LANGUAGE),
            doc.caret(),
            if doc.is_modified() { "\tmodified" } else { "" },
        );
    }
    Ok(())
}

fn load_grammars(paths: &AppPaths) -> GrammarRegistry {
    GrammarRegistry::load(paths.grammars_dir(), paths.styles_dir())
}

fn highlight(paths: &AppPaths, file: &Path, language: Option<&str>) -> anyhow::Result<()> {
    let registry = load_grammars(paths);
    let grammar = match language {
        Some(name) => registry
            .name_lookup(name)
            .with_context(|| format!("Unknown language: {name}"))?,
        None => registry
            .extension_lookup(file)
            .with_context(|| format!("No grammar for {}, pass --language", file.display()))?,
    };

    let bytes = std::fs::read(file).with_context(|| format!("Could not read {}", file.display()))?;
    let text = quillpad_buffer::decode_file_contents(bytes);
    let theme = Config::load_or_default(paths.config_file()).theme_defaults();

    for span in quillpad_syntax::restyle(&text, 0..text.len(), grammar) {
        let style = registry.resolve_style(grammar.name(), span.category, theme);
        println!(
            "{}..{}\t{}\t{}\t{:?}",
            span.start,
            span.end(),
            span.category,
            style.foreground,
            &text[span.range()],
        );
    }
    Ok(())
}

fn languages(paths: &AppPaths) -> anyhow::Result<()> {
    let registry = load_grammars(paths);
    for grammar in registry.grammars() {
        println!(
            "{}\t{}",
            grammar.name(),
            grammar.descriptor().normalized_extensions().collect::<Vec<_>>().join(" ")
        );
    }
    Ok(())
}

fn find(file: &Path, options: SearchOptions) -> anyhow::Result<()> {
    let buffer = TextBuffer::from_file(file).with_context(|| format!("Could not read {}", file.display()))?;

    let mut caret = match options.direction {
        SearchDirection::Down => Position::ZERO,
        SearchDirection::Up => buffer.char_idx_to_position(buffer.len_chars())?,
    };
    let mut seen = Vec::new();

    while let Some(found) = buffer.find(&options, caret)? {
        if seen.contains(&found.start) {
            break;
        }
        seen.push(found.start);

        let start = buffer.char_idx_to_position(found.start)?;
        let line = buffer.line(start.line)?;
        println!("{}: {}", start, line.trim_end_matches(['\r', '\n']));

        let next = match options.direction {
            SearchDirection::Down if found.is_empty() => found.end + 1,
            SearchDirection::Down => found.end,
            SearchDirection::Up => found.start,
        };
        if next > buffer.len_chars() {
            break;
        }
        caret = buffer.char_idx_to_position(next)?;
    }

    if seen.is_empty() {
        anyhow::bail!("No match for {:?}", options.text);
    }
    Ok(())
}

fn plugins(paths: &AppPaths) -> anyhow::Result<()> {
    let mut manager = PluginManager::new(paths.plugins_dir());
    manager.discover()?;

    for info in manager.list() {
        let manifest = &info.manifest;
        println!(
            "{}\t{} {}\t{}\t{}",
            manifest.id,
            manifest.name,
            manifest.version,
            manifest.author.as_deref().unwrap_or("-"),
            manifest.description,
        );
    }
    Ok(())
}
