use std::error::Error;
use std::fs;
use std::path::Path;

use chrono::Datelike;
use serde::Serialize;

use crate::cli::commands::Cli;
use crate::cli::handlers::{resolve_today, start_dir};
use crate::cli::output::print_json;
use crate::io::config_io::{self, CONFIG_FILE};
use crate::io::DocumentStore;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitJson {
    success: bool,
    config: String,
    config_created: bool,
    document: String,
    document_created: bool,
}

pub fn cmd_init(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let root = start_dir(cli.dir.as_deref())?;
    let today = resolve_today(cli.today.as_deref())?;
    let year = cli.year.unwrap_or(today.year());

    // Check for an enclosing workspace and warn
    if !root.join(CONFIG_FILE).is_file()
        && let Some(parent) = root.parent()
        && let Ok(parent_root) = config_io::discover_root(parent)
    {
        eprintln!(
            "note: enclosing workspace found at {}/",
            parent_root.display()
        );
        eprintln!("creating a new workspace in {}/", root.display());
    }

    init_workspace(&root, cli.user.as_deref(), year, cli.json)
}

/// Write todo.toml if missing, create the document directories and make sure
/// `year`'s document exists. Safe to repeat.
pub fn init_workspace(
    root: &Path,
    user: Option<&str>,
    year: i32,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let config_created = config_io::write_template(root)?;
    let config = config_io::read_config(root)?;
    let store = DocumentStore::new(root, &config);

    fs::create_dir_all(store.document_dir(None)?)?;
    let document_created = !store.exists(user, year)?;
    store.load(user, year)?;
    let document = store.document_path(user, year)?;

    if json {
        print_json(&InitJson {
            success: true,
            config: root.join(CONFIG_FILE).display().to_string(),
            config_created,
            document: document.display().to_string(),
            document_created,
        })?;
        return Ok(());
    }

    if config_created {
        println!("Initialized td workspace in {}/", root.display());
    } else {
        println!("Workspace already initialized in {}/", root.display());
    }
    let state = if document_created { "created" } else { "exists" };
    println!("  document: {} ({})", document.display(), state);
    Ok(())
}
