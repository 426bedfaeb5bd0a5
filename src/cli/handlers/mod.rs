mod init;
pub use init::{cmd_init, init_workspace};

use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{discover_root, read_config};
use crate::io::journal::JournalEntry;
use crate::io::{DocumentStore, StoreError};
use crate::ops::{DocError, InsertAnchor, edit_ops, project_ops, settle_week, week_ops};
use crate::parse::parse_document;

type CmdResult = Result<(), Box<dyn Error>>;

/// Everything a command needs besides its own arguments
pub struct Context {
    pub root: PathBuf,
    pub store: DocumentStore,
    pub user: Option<String>,
    pub year: i32,
    pub today: NaiveDate,
    pub json: bool,
}

impl Context {
    /// Resolve the global flags and open the workspace
    pub fn from_cli(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let today = resolve_today(cli.today.as_deref())?;
        let start = start_dir(cli.dir.as_deref())?;
        let root = discover_root(&start)?;
        let config = read_config(&root)?;
        Ok(Context {
            store: DocumentStore::new(&root, &config),
            root,
            user: cli.user.clone(),
            year: cli.year.unwrap_or(today.year()),
            today,
            json: cli.json,
        })
    }

    fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn document_path(&self) -> Result<PathBuf, StoreError> {
        self.store.document_path(self.user(), self.year)
    }
}

/// `--today`, or the local date
pub fn resolve_today(arg: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
    match arg {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| format!("invalid --today '{}': {}", s, e).into()),
        None => Ok(Local::now().date_naive()),
    }
}

/// `-C <dir>`, or the working directory
pub fn start_dir(dir: Option<&str>) -> Result<PathBuf, Box<dyn Error>> {
    match dir {
        Some(d) => std::fs::canonicalize(d)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", d, e).into()),
        None => Ok(std::env::current_dir()?),
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let result = Context::from_cli(&cli).and_then(|ctx| run(&ctx, cli.command));

    if json
        && let Err(e) = &result
        && let Some(doc_err) = doc_error(e.as_ref())
    {
        print_json(&ErrorJson {
            success: false,
            kind: doc_err.kind(),
            error: &doc_err.to_string(),
        })?;
    }
    result
}

fn run(ctx: &Context, command: Commands) -> CmdResult {
    match command {
        // Normally handled in main.rs before workspace discovery
        Commands::Init => init_workspace(&ctx.root, ctx.user(), ctx.year, ctx.json),

        // Read commands
        Commands::Years => cmd_years(ctx),
        Commands::Show(args) => cmd_show(ctx, args),
        Commands::Weeks => cmd_weeks(ctx),
        Commands::Project(ProjectCmd {
            action: ProjectAction::List,
        }) => cmd_project_list(ctx),
        Commands::Journal(args) => cmd_journal(ctx, args),

        // Write commands
        Commands::Toggle(args) => cmd_toggle(ctx, args),
        Commands::Add(args) => cmd_add(ctx, args),
        Commands::Sub(args) => cmd_sub(ctx, args),
        Commands::Rm(args) => cmd_rm(ctx, args),
        Commands::Edit(args) => cmd_edit(ctx, args),
        Commands::Mv(args) => cmd_mv(ctx, args),
        Commands::Project(ProjectCmd {
            action: ProjectAction::Add(args),
        }) => cmd_project_add(ctx, args),
        Commands::Week(WeekCmd {
            action: WeekAction::Add(args),
        }) => cmd_week_add(ctx, args),
        Commands::Settle => cmd_settle(ctx),
        Commands::Replace(args) => cmd_replace(ctx, args),
        Commands::Migrate(args) => cmd_migrate(ctx, args),
    }
}

/// The core error behind `err`, if there is one
pub fn doc_error<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a DocError> {
    if let Some(e) = err.downcast_ref::<DocError>() {
        return Some(e);
    }
    match err.downcast_ref::<StoreError>() {
        Some(StoreError::Doc(e)) => Some(e),
        _ => None,
    }
}

/// 2 when there was nothing to do, 1 for every other failure
pub fn exit_code(err: &(dyn Error + 'static)) -> i32 {
    if doc_error(err).is_some_and(DocError::is_soft) {
        2
    } else {
        1
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run one pure transform on the selected document under its lock and
/// return the new lines
fn write_lines<F>(ctx: &Context, f: F) -> Result<Vec<String>, StoreError>
where
    F: FnOnce(&[String]) -> Result<Vec<String>, DocError>,
{
    ctx.store.with_document(ctx.user(), ctx.year, |lines| {
        let out = f(lines)?;
        Ok((out.clone(), out))
    })
}

/// Print text that normally already ends in a newline
fn print_text(text: &str) {
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
}

fn print_write(ctx: &Context, reply: WriteJson) -> CmdResult {
    if ctx.json {
        print_json(&reply)?;
    } else {
        print_text(&reply.new_content);
    }
    Ok(())
}

fn parse_timestamp(flag: &str, s: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("invalid {} '{}': {}", flag, s, e).into())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_years(ctx: &Context) -> CmdResult {
    let years = ctx.store.list_years(ctx.user())?;
    if ctx.json {
        print_json(&years)?;
    } else if years.is_empty() {
        println!("no documents yet");
    } else {
        for year in years {
            println!("{}", year);
        }
    }
    Ok(())
}

fn cmd_show(ctx: &Context, args: ShowArgs) -> CmdResult {
    let doc = ctx.store.load(ctx.user(), ctx.year)?;
    if args.raw && !ctx.json {
        print_text(&doc.to_text());
        return Ok(());
    }

    let parsed = parse_document(&doc.lines, ctx.today);
    if ctx.json {
        print_json(&DocumentJson {
            year: ctx.year,
            path: ctx.document_path()?.display().to_string(),
            document: &parsed,
        })?;
        return Ok(());
    }
    for warning in &parsed.warnings {
        eprintln!("warning: {}", warning);
    }
    for line in format_document(&parsed) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_weeks(ctx: &Context) -> CmdResult {
    let doc = ctx.store.load(ctx.user(), ctx.year)?;
    let weeks = week_ops::list_weeks(&doc.lines, ctx.today);
    if ctx.json {
        print_json(&weeks)?;
    } else if weeks.is_empty() {
        println!("no week blocks yet");
    } else {
        for week in &weeks {
            println!("{}", format_week_listing(week));
        }
    }
    Ok(())
}

fn cmd_project_list(ctx: &Context) -> CmdResult {
    let doc = ctx.store.load(ctx.user(), ctx.year)?;
    let names = project_ops::list_projects(&doc.lines);
    if ctx.json {
        print_json(&names)?;
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}

fn cmd_journal(ctx: &Context, args: JournalCmd) -> CmdResult {
    let journal = ctx.store.journal();
    match args.action {
        Some(JournalAction::Path) => {
            println!("{}", journal.path().display());
            Ok(())
        }
        Some(JournalAction::Prune(prune)) => {
            let before = prune
                .before
                .as_deref()
                .map(|s| parse_timestamp("--before", s))
                .transpose()?;
            let removed = journal.prune(before, prune.all)?;
            if ctx.json {
                print_json(&PruneJson { removed })?;
            } else {
                println!("pruned {} entr{}", removed, if removed == 1 { "y" } else { "ies" });
            }
            Ok(())
        }
        None => {
            let since = args
                .since
                .as_deref()
                .map(|s| parse_timestamp("--since", s))
                .transpose()?;
            let entries = journal.entries(Some(args.limit.unwrap_or(10)), since);
            if ctx.json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("journal is empty");
            } else {
                if let Some(summary) = journal.summary() {
                    let oldest = summary
                        .oldest
                        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
                        .unwrap_or_default();
                    println!(
                        "{} entries in {} (oldest {})\n",
                        summary.entry_count,
                        journal.path().display(),
                        oldest
                    );
                }
                for entry in &entries {
                    print!("{}", entry.to_display_markdown());
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_toggle(ctx: &Context, args: LineArgs) -> CmdResult {
    let lines = write_lines(ctx, |l| edit_ops::toggle(l, args.line))?;
    print_write(ctx, WriteJson::new(&lines))
}

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let (anchor, text) = match (args.week, args.args.as_slice()) {
        (Some(header), [text]) => (InsertAnchor::Week(header), text),
        (None, [project, text]) => (InsertAnchor::Project(project.clone()), text),
        _ => {
            return Err("usage: td add <PROJECT> <TEXT>, or td add --week <LINE> <TEXT>".into());
        }
    };
    let lines = write_lines(ctx, |l| edit_ops::insert_task(l, &anchor, text))?;
    print_write(ctx, WriteJson::new(&lines))
}

fn cmd_sub(ctx: &Context, args: SubArgs) -> CmdResult {
    let lines = write_lines(ctx, |l| edit_ops::insert_subtask(l, args.parent, &args.text))?;
    print_write(ctx, WriteJson::new(&lines))
}

fn cmd_rm(ctx: &Context, args: LineArgs) -> CmdResult {
    let (lines, removed) = ctx.store.with_document(ctx.user(), ctx.year, |l| {
        let range = edit_ops::subtree_range(l, args.line)?;
        let removed = l[range].to_vec();
        let out = edit_ops::delete_subtree(l, args.line)?;
        Ok((out.clone(), (out, removed)))
    })?;
    ctx.store
        .journal()
        .append(JournalEntry::deletion(&ctx.document_path()?, args.line, &removed));
    print_write(ctx, WriteJson::new(&lines))
}

fn cmd_edit(ctx: &Context, args: EditArgs) -> CmdResult {
    let lines = write_lines(ctx, |l| edit_ops::edit_content(l, args.line, &args.text))?;
    print_write(ctx, WriteJson::new(&lines))
}

fn cmd_mv(ctx: &Context, args: MvArgs) -> CmdResult {
    let position = args.position.into();
    let lines = write_lines(ctx, |l| edit_ops::move_subtree(l, args.from, args.to, position))?;
    print_write(ctx, WriteJson::new(&lines))
}

fn cmd_project_add(ctx: &Context, args: ProjectAddArgs) -> CmdResult {
    let lines = write_lines(ctx, |l| project_ops::add_project(l, &args.name))?;
    print_write(ctx, WriteJson::new(&lines))
}

fn cmd_week_add(ctx: &Context, args: WeekAddArgs) -> CmdResult {
    let lines = write_lines(ctx, |l| week_ops::add_week(l, &args.title, ctx.today))?;
    print_write(ctx, WriteJson::new(&lines))
}

fn cmd_settle(ctx: &Context) -> CmdResult {
    let outcome = ctx.store.with_document(ctx.user(), ctx.year, |l| {
        let outcome = settle_week(l, ctx.today)?;
        Ok((outcome.lines.clone(), outcome))
    })?;

    let path = ctx.document_path()?;
    let journal = ctx.store.journal();
    journal.append(JournalEntry::settlement(
        &path,
        &outcome.week_title,
        outcome.settled_count,
        &outcome.archived,
    ));
    if !outcome.warnings.is_empty() {
        journal.append(JournalEntry::parse_warnings(&path, &outcome.warnings));
    }

    if !ctx.json {
        for warning in &outcome.warnings {
            eprintln!("warning: {}", warning);
        }
        eprintln!(
            "settled {} task(s) into {}",
            outcome.settled_count, outcome.week_title
        );
    }
    let mut reply = WriteJson::new(&outcome.lines);
    reply.settled_count = Some(outcome.settled_count);
    reply.week_title = Some(outcome.week_title);
    reply.created_weeks = outcome.created_weeks;
    print_write(ctx, reply)
}

fn read_input(file: &str) -> Result<String, Box<dyn Error>> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    let path = Path::new(file);
    std::fs::read_to_string(path).map_err(|e| {
        StoreError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }
        .into()
    })
}

fn cmd_replace(ctx: &Context, args: ReplaceArgs) -> CmdResult {
    let text = read_input(&args.file)?;
    ctx.store.replace(ctx.user(), ctx.year, &text)?;
    let lines: Vec<String> = text.split('\n').map(String::from).collect();
    print_write(ctx, WriteJson::new(&lines))
}

fn cmd_migrate(ctx: &Context, args: MigrateArgs) -> CmdResult {
    if args.from == args.to {
        return Err(DocError::EmptyOperation(format!("{} is both source and target", args.to)).into());
    }
    if !ctx.store.exists(ctx.user(), args.from)? {
        return Err(DocError::NotFound(format!("document for {}", args.from)).into());
    }
    let source = ctx.store.load(ctx.user(), args.from)?;

    let lines = ctx.store.with_document(ctx.user(), args.to, |current| {
        if !project_ops::is_untouched(&current.join("\n"), args.to) {
            return Err(DocError::AlreadyExists(format!("document for {}", args.to)));
        }
        let out = project_ops::migrate_year(&source.lines, args.to)?;
        Ok((out.clone(), out))
    })?;
    print_write(ctx, WriteJson::new(&lines))
}
