mod finder;
mod terminal;

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use usagecore_config::{Direction, PanelSettings};
use usagecore_find::{FileSet, PlainConverter};
use usagecore_view::ui_channel;
use usagepanel::{PanelCollaborators, PanelMessage, UsagesPanel};
use walkdir::WalkDir;

use finder::{TextReferenceFinder, WorkspaceLock};
use terminal::{TerminalHost, TerminalViews};

const DEFAULT_CONFIG_FILE: &str = "usagepanel.json";

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    config: PathBuf,
    root: PathBuf,
    search_in: String,
    search_for: String,
    backward: bool,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut config = PathBuf::from(DEFAULT_CONFIG_FILE);
        let mut root = PathBuf::from(".");
        let mut search_in = None;
        let mut search_for = None;
        let mut backward = false;

        for arg in args {
            if arg == "--backward" {
                backward = true;
            } else if let Some(value) = arg.strip_prefix("--config=") {
                config = PathBuf::from(value);
            } else if let Some(value) = arg.strip_prefix("--root=") {
                root = PathBuf::from(value);
            } else if let Some(value) = arg.strip_prefix("--in=") {
                search_in = Some(value.to_string());
            } else if let Some(value) = arg.strip_prefix("--for=") {
                search_for = Some(value.to_string());
            } else {
                bail!("unknown argument: {arg}");
            }
        }

        let (Some(search_in), Some(search_for)) = (search_in, search_for) else {
            bail!("usage: usagepanel-cli [--config=FILE] [--backward] [--root=DIR] --in=FRAGMENT --for=FRAGMENT");
        };

        Ok(Self {
            config,
            root,
            search_in,
            search_for,
            backward,
        })
    }
}

fn collect_files(root: &Path, fragment: &str) -> FileSet {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().to_string_lossy().contains(fragment))
        .map(|entry| entry.into_path())
        .collect()
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse(env::args().skip(1))?;
    let mut settings = PanelSettings::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if args.backward {
        settings.direction = Direction::Backward;
    }

    let search_in = collect_files(&args.root, &args.search_in);
    let search_for = collect_files(&args.root, &args.search_for);
    info!(
        search_in = search_in.len(),
        search_for = search_for.len(),
        direction = ?settings.direction,
        "collected files"
    );
    if search_in.is_empty() || search_for.is_empty() {
        bail!("no files under {} match both fragments", args.root.display());
    }

    let (ui, queue) = ui_channel();
    let panel = UsagesPanel::new(
        settings,
        PanelCollaborators {
            finder: Arc::new(TextReferenceFinder),
            isolation: Arc::new(WorkspaceLock::default()),
            converter: PlainConverter,
            views: TerminalViews,
        },
        TerminalHost::new(ui.clone()),
        ui.clone(),
    )?;

    ui.invoke_later(PanelMessage::RequestSearch {
        search_in,
        search_for,
    });
    let panel = usagepanel::run(panel, queue).await;
    info!(workers = panel.started_workers(), "usages panel closed");
    Ok(())
}
