use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xerplan::config::ReadOptions;
use xerplan::outline::OutlineRenderer;
use xerplan::reader::read_file;

/// Read a Primavera XER export and print its rolled-up outline.
#[derive(Parser, Debug)]
#[command(name = "xerplan", version)]
struct Cli {
    /// Input .xer file
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with read options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project id to read from a multi-project export
    #[arg(short, long)]
    project: Option<i32>,

    /// Input encoding label (default: windows-1252)
    #[arg(short, long)]
    encoding: Option<String>,

    /// Fail on the first unreadable value
    #[arg(long)]
    strict: bool,

    /// Keep WBS codes as entered instead of prefixing parent codes
    #[arg(long)]
    short_wbs: bool,
}

impl Cli {
    fn options(&self) -> xerplan::error::Result<ReadOptions> {
        let mut options = match &self.config {
            Some(path) => ReadOptions::load(path)?,
            None => ReadOptions::default(),
        };
        if self.project.is_some() {
            options.project_id = self.project;
        }
        if self.encoding.is_some() {
            options.encoding = self.encoding.clone();
        }
        if self.strict {
            options.ignore_errors = false;
        }
        if self.short_wbs {
            options.wbs_is_full_path = false;
        }
        Ok(options)
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xerplan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let options = match cli.options() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let schedule = match read_file(&cli.input, &options) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to read {}: {}", cli.input.display(), e);
            process::exit(1);
        }
    };

    for error in &schedule.ignored_errors {
        tracing::debug!("Ignored: {}", error);
    }

    let outline = OutlineRenderer::default().render(&schedule);

    match cli.output {
        Some(path) => {
            if let Err(e) = fs::write(&path, &outline) {
                eprintln!("Failed to write {}: {}", path.display(), e);
                process::exit(1);
            }
        }
        None => print!("{}", outline),
    }
}
