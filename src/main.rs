use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use console::style;

use docuintel::library::{display_summary, FileId, FileRecord, FolderId, LocalFile, UploadBatch};
use docuintel::workflow::ReconcileOutcome;
use docuintel::{
    logging, AutoConfirm, ClientConfig, Confirm, ConsoleNotifier, DialoguerConfirm,
    HttpDocumentApi, NotificationCenter, PollStrategy, ViewController,
};

/// Command-line client for the DocuIntel document library.
#[derive(Parser, Debug)]
#[command(name = "docuintel", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "DOCUINTEL_CONFIG")]
    config: Option<String>,

    /// Log workflow details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List folders with their file counts
    Folders,
    /// List files at Home (unassigned) or in a folder
    Ls {
        #[arg(long)]
        folder: Option<FolderId>,
    },
    /// Upload files; without --folder the AI classifies them
    Upload {
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long)]
        folder: Option<FolderId>,
        /// Override how the client waits for classification (fixed|backoff)
        #[arg(long)]
        strategy: Option<PollStrategy>,
    },
    /// Create a folder
    Mkdir { name: String },
    /// Delete a folder and every file in it
    Rmdir {
        id: FolderId,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Delete a file
    Rm {
        id: FileId,
        /// Folder holding the file (Home when omitted)
        #[arg(long)]
        folder: Option<FolderId>,
        #[arg(long)]
        yes: bool,
    },
    /// Print a download URL for a file
    Open { id: FileId },
    /// Ask the AI to (re)summarize a file
    Summarize {
        id: FileId,
        /// Folder holding the file (Home when omitted)
        #[arg(long)]
        folder: Option<FolderId>,
        /// Poll until the summary is available
        #[arg(long)]
        wait: bool,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the default config file location
    Path,
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file JSON schema
    Schema,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "docuintel", &mut io::stdout());
        return Ok(());
    }

    let mut config = ClientConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Command::Config { action } => show_config(action, &config),
        Command::Folders => {
            let view = controller(&config, false)?;
            view.refresh_folders().await?;
            print_folders(&view);
            Ok(())
        }
        Command::Ls { folder } => {
            let view = controller(&config, false)?;
            open_view(&view, folder).await?;
            print_files(&view);
            Ok(())
        }
        Command::Upload {
            paths,
            folder,
            strategy,
        } => {
            if let Some(strategy) = strategy {
                config.monitor.strategy = strategy;
            }
            let view = controller(&config, false)?;
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                files.push(LocalFile::read(path).await?);
            }
            let mut batch = UploadBatch::new(files);
            if let Some(folder) = folder {
                batch = batch.into_folder(folder);
            }

            let receipt = view.upload(batch).await?;
            for record in &receipt.outcome.uploaded {
                println!("{}\t{}", record.id, record.file_name);
            }
            if let Some(monitor) = receipt.monitor {
                let report = monitor.await.context("reconciliation task failed")?;
                if let ReconcileOutcome::Attributed { folder, .. } = &report.outcome {
                    tracing::info!(folder = folder.id, "upload attributed");
                }
            }
            Ok(())
        }
        Command::Mkdir { name } => {
            let view = controller(&config, false)?;
            let folder = view.create_folder(&name).await?;
            println!("{}\t{}", folder.id, folder.name);
            Ok(())
        }
        Command::Rmdir { id, yes } => {
            let view = controller(&config, yes)?;
            // A failed count still leaves the folder names in place.
            view.refresh_folders().await.ok();
            let name = view
                .snapshot()
                .folders
                .iter()
                .find(|entry| entry.folder.id == id)
                .map(|entry| entry.folder.name.clone())
                .unwrap_or_else(|| format!("#{id}"));
            if !view.delete_folder(id, &name).await? {
                println!("Cancelled.");
            }
            Ok(())
        }
        Command::Rm { id, folder, yes } => {
            let view = controller(&config, yes)?;
            open_view(&view, folder).await?;
            let name = file_name(&view.snapshot().active_files, id);
            if !view.delete_file(id, &name).await? {
                println!("Cancelled.");
            }
            Ok(())
        }
        Command::Open { id } => {
            let view = controller(&config, false)?;
            println!("{}", view.view_url(id).await?);
            Ok(())
        }
        Command::Summarize { id, folder, wait } => {
            let view = controller(&config, false)?;
            open_view(&view, folder).await?;
            view.generate_ai_summary(id).await?;
            if wait {
                let state = view.await_summary(id).await?;
                println!("{state:?}");
            }
            Ok(())
        }
        Command::Completions { .. } => Ok(()),
    }
}

fn controller(config: &ClientConfig, assume_yes: bool) -> Result<Arc<ViewController>> {
    let api = HttpDocumentApi::new(&config.api_base_url, config.request_timeout())
        .context("failed to build HTTP client")?;
    let notices: Arc<dyn NotificationCenter> = Arc::new(ConsoleNotifier::stderr());
    let confirm: Arc<dyn Confirm> = if assume_yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(DialoguerConfirm)
    };
    let view = ViewController::new(Arc::new(api), notices, confirm)
        .with_signal(config.completion_signal())
        .with_max_upload_bytes(config.max_upload_bytes)
        .with_summary_poll(config.summary_policy(), config.summary_poll.max_attempts);
    Ok(Arc::new(view))
}

async fn open_view(view: &ViewController, folder: Option<FolderId>) -> Result<()> {
    let Some(id) = folder else {
        view.select_home().await?;
        return Ok(());
    };
    view.refresh_folders().await.ok();
    let record = view
        .snapshot()
        .folders
        .into_iter()
        .map(|entry| entry.folder)
        .find(|f| f.id == id)
        .with_context(|| format!("no folder with id {id}"))?;
    view.select_folder(&record).await?;
    Ok(())
}

fn file_name(files: &[FileRecord], id: FileId) -> String {
    files
        .iter()
        .find(|f| f.id == id)
        .map(|f| f.file_name.clone())
        .unwrap_or_else(|| format!("file #{id}"))
}

fn print_folders(view: &ViewController) {
    let snapshot = view.snapshot();
    println!("{}", style("ID\tFILES\tNAME").bold());
    for entry in snapshot.folders {
        let count = entry
            .file_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".into());
        println!("{}\t{}\t{}", entry.folder.id, count, entry.folder.name);
    }
}

fn print_files(view: &ViewController) {
    let snapshot = view.snapshot();
    println!("{}", style(snapshot.selection.title()).bold().underlined());
    if snapshot.active_files.is_empty() {
        println!("No files found in this location.");
        return;
    }
    for file in &snapshot.active_files {
        println!(
            "{}\t{}\n\t{}",
            file.id,
            style(&file.file_name).cyan(),
            display_summary(file)
        );
    }
}

fn show_config(action: ConfigAction, config: &ClientConfig) -> Result<()> {
    match action {
        ConfigAction::Path => match ClientConfig::default_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("(no config directory on this platform)"),
        },
        ConfigAction::Show => {
            println!(
                "{}",
                toml::to_string_pretty(config).context("failed to render config")?
            );
        }
        ConfigAction::Schema => {
            println!(
                "{}",
                serde_json::to_string_pretty(&ClientConfig::json_schema())
                    .context("failed to render schema")?
            );
        }
    }
    Ok(())
}
