use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use desk_engine::{SimState, SimWindowSystem};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use storage::{FileKind, RetentionEntry, RetentionIndex, SnapshotStore};
use windowsill_core::Coordinator;

#[derive(Debug, Parser)]
#[command(name = "windowsill")]
#[command(about = "Capture and restore window arrangements across virtual desktops")]
pub struct Cli {
    /// Directory holding arrangement and backup files. Defaults to the
    /// per-user data directory.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Window-session state file driving the simulated window system.
    /// Required by commands that touch live windows.
    #[arg(long, global = true, value_name = "FILE")]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Save the current window arrangement to a new timestamped file.
    Capture,
    /// Apply a saved arrangement (latest save unless --file is given).
    Restore {
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Run one automatic-backup cycle: capture, record, prune past capacity.
    Backup,
    /// Print the arrangement index (or the backup index) as JSON.
    List {
        #[arg(long)]
        backups: bool,
    },
    /// Print the most recent saved arrangement entry.
    Latest,
    /// Pretty-print an arrangement file.
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Force a retention pass over the backup index.
    Prune,
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct EntryOutput {
    timestamp: String,
    path: String,
}

impl From<&RetentionEntry> for EntryOutput {
    fn from(entry: &RetentionEntry) -> Self {
        Self {
            timestamp: entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            path: entry.path.display().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OutcomeOutput {
    applied: usize,
    skipped: usize,
}

#[derive(Debug, Serialize)]
struct PruneOutput {
    kept: usize,
    deleted: usize,
}

#[derive(Debug, Serialize)]
struct BackupOutput {
    path: String,
    pruned: Option<PruneOutput>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse_from(args);
    let data_dir = cli.data_dir.as_deref();

    match cli.command {
        Commands::Capture => run_capture(&resolve_store(data_dir)?, cli.session.as_deref()),
        Commands::Restore { file } => {
            run_restore(&resolve_store(data_dir)?, cli.session.as_deref(), file.as_deref())
        }
        Commands::Backup => run_backup(&resolve_store(data_dir)?, cli.session.as_deref()),
        Commands::List { backups } => run_list(&resolve_store(data_dir)?, backups),
        Commands::Latest => run_latest(&resolve_store(data_dir)?),
        Commands::Show { file } => run_show(&file),
        Commands::Prune => run_prune(&resolve_store(data_dir)?),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn resolve_store(data_dir: Option<&Path>) -> Result<SnapshotStore> {
    match data_dir {
        Some(dir) => Ok(SnapshotStore::with_root(dir)),
        None => SnapshotStore::from_default_project()
            .context("failed to resolve the default data directory"),
    }
}

fn now_stamp() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn load_session(session: Option<&Path>) -> Result<(SimWindowSystem, PathBuf)> {
    let path = session
        .ok_or_else(|| anyhow::anyhow!("this command needs a window session; pass --session <FILE>"))?;

    let bytes = fs::read(path)
        .with_context(|| format!("failed to read session file {}", path.display()))?;
    let state: SimState = serde_json::from_slice(&bytes)
        .with_context(|| format!("invalid session file {}", path.display()))?;

    Ok((SimWindowSystem::from_state(state), path.to_path_buf()))
}

fn write_session(path: &Path, system: &SimWindowSystem) -> Result<()> {
    let json = serde_json::to_string_pretty(system.state())?;
    fs::write(path, json)
        .with_context(|| format!("failed to write session file {}", path.display()))?;
    Ok(())
}

fn run_capture(store: &SnapshotStore, session: Option<&Path>) -> Result<()> {
    let (system, _) = load_session(session)?;
    let mut coordinator = Coordinator::new(system, store.clone())?;

    let path = coordinator.save_arrangement(now_stamp())?;
    println!("{}", path.display());

    Ok(())
}

fn run_restore(
    store: &SnapshotStore,
    session: Option<&Path>,
    file: Option<&Path>,
) -> Result<()> {
    let (system, session_path) = load_session(session)?;
    let mut coordinator = Coordinator::new(system, store.clone())?;

    let outcome = match file {
        Some(path) => coordinator.restore_from(path)?,
        None => coordinator.restore_latest()?,
    };

    // Persist the moved windows so scripted runs can observe the effect.
    write_session(&session_path, &coordinator.into_system())?;

    let payload = OutcomeOutput { applied: outcome.applied, skipped: outcome.skipped };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}

fn run_backup(store: &SnapshotStore, session: Option<&Path>) -> Result<()> {
    let (system, _) = load_session(session)?;
    let mut coordinator = Coordinator::new(system, store.clone())?;

    let (path, pruned) = coordinator.backup(now_stamp())?;
    let payload = BackupOutput {
        path: path.display().to_string(),
        pruned: pruned.map(|p| PruneOutput { kept: p.kept, deleted: p.deleted }),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}

fn run_list(store: &SnapshotStore, backups: bool) -> Result<()> {
    let kind = if backups { FileKind::Backup } else { FileKind::Arrangement };
    let index = RetentionIndex::scan(store.root(), kind)?;

    let entries: Vec<EntryOutput> = index.entries().iter().map(EntryOutput::from).collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);

    Ok(())
}

fn run_latest(store: &SnapshotStore) -> Result<()> {
    let index = RetentionIndex::scan(store.root(), FileKind::Arrangement)?;
    let latest = index.latest().context("no saved arrangements")?;

    println!("{}", serde_json::to_string_pretty(&EntryOutput::from(latest))?);

    Ok(())
}

fn run_show(file: &Path) -> Result<()> {
    let arrangement = storage::load_arrangement(file)
        .with_context(|| format!("failed to load arrangement {}", file.display()))?;

    println!("{}", serde_json::to_string_pretty(arrangement.windows())?);

    Ok(())
}

fn run_prune(store: &SnapshotStore) -> Result<()> {
    let mut backups = storage::BackupIndex::scan(store.root())?;
    let outcome = backups.force_prune(now_stamp())?;

    let payload = PruneOutput { kept: outcome.kept, deleted: outcome.deleted };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(())
}
