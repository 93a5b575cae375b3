//! # imgsheet CLI
//!
//! Usage:
//!   imgsheet export --page l --width 35 --gap 2 photos/*.jpg
//!   imgsheet preview --border --border-color pink -o preview.png a.png b.jpg
//!   imgsheet layout --config job.json

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use imgsheet::export::ExportJob;
use imgsheet::layout::LayoutInfo;
use imgsheet::model::{BorderColor, PageSize};
use imgsheet::preview::{PreviewOutcome, Previewer, RasterSurface};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the computed layout as JSON
    Layout(JobArgs),
    /// Render the first page to a PNG
    Preview {
        #[command(flatten)]
        job: JobArgs,
        /// Output PNG path
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
        /// Preview resolution in pixels per millimetre
        #[arg(long, default_value_t = 4.0)]
        scale: f64,
    },
    /// Write all pages to images_<timestamp>.pdf
    Export {
        #[command(flatten)]
        job: JobArgs,
        /// Directory the timestamped PDF is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Exact output path; overrides --out-dir and the generated name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options shared by every command. Flags override values from `--config`.
#[derive(Args, Debug)]
struct JobArgs {
    /// Image files (JPEG or PNG), in display order
    images: Vec<PathBuf>,
    /// JSON job file providing defaults for every option
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Page size: a4 or l
    #[arg(long)]
    page: Option<PageSize>,
    /// Image width in millimetres
    #[arg(long, allow_negative_numbers = true)]
    width: Option<f64>,
    /// Gap between images in millimetres
    #[arg(long, allow_negative_numbers = true)]
    gap: Option<f64>,
    /// Stroke a border around every image
    #[arg(long)]
    border: bool,
    /// Border color: gray, black, pink or blue
    #[arg(long)]
    border_color: Option<BorderColor>,
    /// Document title
    #[arg(long)]
    title: Option<String>,
}

impl JobArgs {
    fn into_job(self) -> Result<ExportJob> {
        let mut job = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                ExportJob::from_json(&json)
                    .with_context(|| format!("Failed to load {}", path.display()))?
            }
            None => ExportJob::default(),
        };

        if !self.images.is_empty() {
            job.images = self
                .images
                .iter()
                .map(|path| image_source(path))
                .collect::<Result<_>>()?;
        }
        if let Some(page) = self.page {
            job.page_size = page;
        }
        if let Some(width) = self.width {
            job.target_width = width;
        }
        if let Some(gap) = self.gap {
            job.gap = gap;
        }
        if self.border {
            job.border.enabled = true;
        }
        if let Some(color) = self.border_color {
            job.border.color = color;
        }
        if self.title.is_some() {
            job.metadata.title = self.title;
        }
        Ok(job)
    }
}

/// Job sources are strings that may also hold base64 data. Anchor relative
/// paths at `./` so a missing file reports as missing, not as bad base64.
fn image_source(path: &Path) -> Result<String> {
    let path = if path.is_relative() {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    };
    path.to_str()
        .map(str::to_owned)
        .with_context(|| format!("Image path is not valid UTF-8: {}", path.display()))
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}=info", env!("CARGO_CRATE_NAME")))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = try_main() {
        eprintln!("✗ {e:#}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Layout(args) => {
            let job = args.into_job()?;
            job.validate()?;
            let images = job.load_images()?;
            let layout = imgsheet::layout(&job.layout_request(&images))?;
            let info = LayoutInfo::new(&layout, &job.page_config());
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Preview { job, output, scale } => {
            let job = job.into_job()?;
            let images = if job.images.is_empty() {
                Vec::new()
            } else {
                job.validate()?;
                job.load_images()?
            };
            let mut surface = RasterSurface::new(&job.page_config(), scale);
            let outcome = Previewer::new().render(
                &job.layout_request(&images),
                &images,
                &job.border,
                &mut surface,
            )?;
            surface
                .save_png(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            match outcome {
                PreviewOutcome::Empty { message } => eprintln!("{message}"),
                PreviewOutcome::Rendered { page_count, drawn } => {
                    info!(drawn, "preview rendered");
                    eprintln!(
                        "✓ Preview of page 1 written to {} ({} page{} total)",
                        output.display(),
                        page_count,
                        if page_count == 1 { "" } else { "s" }
                    );
                }
            }
        }

        Commands::Export {
            job,
            out_dir,
            output,
        } => {
            let job = job.into_job()?;
            let (path, document) = match output {
                Some(path) => {
                    let document = job.export_to(&path)?;
                    (path, document)
                }
                None => job.export_to_dir(&out_dir)?,
            };
            eprintln!(
                "✓ Written {} pages ({} bytes) to {}",
                document.layout.page_count,
                document.bytes.len(),
                path.display()
            );
        }
    }

    Ok(())
}
