pub mod edit;
pub mod links;
pub mod rename;
pub mod report;

use anyhow::Context;
use clap::Subcommand;
use refgraph_core::PageRepository;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum Command {
    /// Rename a page and update every page that links to it
    Rename {
        from: String,
        to: String,

        /// Leave links in referring pages untouched
        #[arg(long)]
        keep_referrers: bool,

        /// Author recorded on the new revisions
        #[arg(long)]
        author: Option<String>,
    },

    /// Show pages linking to PAGE and pages PAGE links to
    Links { page: String },

    /// List pages nothing links to
    Unreferenced,

    /// List names that are linked to but do not exist
    Uncreated,

    /// Save page text from a file, or stdin when no file is given
    Save {
        page: String,

        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(long)]
        author: Option<String>,
    },

    /// Delete a page and its attachments
    Delete { page: String },
}

/// Run one command against an opened repository and return what to print.
pub fn dispatch(repo: &PageRepository, command: &Command, json: bool) -> anyhow::Result<String> {
    match command {
        Command::Rename {
            from,
            to,
            keep_referrers,
            author,
        } => rename::execute(repo, from, to, author.as_deref(), *keep_referrers, json),
        Command::Links { page } => links::execute(repo, page, json),
        Command::Unreferenced => report::unreferenced(repo, json),
        Command::Uncreated => report::uncreated(repo, json),
        Command::Save { page, file, author } => {
            let text = read_input(file.as_deref())?;
            edit::save(repo, page, &text, author.as_deref(), json)
        }
        Command::Delete { page } => edit::delete(repo, page, json),
    }
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read page text from stdin")?;
            Ok(text)
        }
    }
}

/// Bulleted list, or `- (none)` when empty.
pub(crate) fn bullet_list<'a>(heading: &str, items: impl IntoIterator<Item = &'a String>) -> String {
    let mut output = format!("{}\n", heading);
    let mut any = false;
    for item in items {
        output.push_str(&format!("- {}\n", item));
        any = true;
    }
    if !any {
        output.push_str("- (none)\n");
    }
    output
}
