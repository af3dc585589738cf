//! pdfsift CLI - multi-modal PDF extraction tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfsift::pipeline::{commit_rotations, read_rotations, OutputLayout, RotationLedger};
use pdfsift::render::{to_json, to_markdown};
use pdfsift::tables::RegionStrategyKind;
use pdfsift::{
    DocumentPipeline, JsonFormat, PageSelection, PipelineConfig, RenderOptions, Stage, TextMode,
};

#[derive(Parser)]
#[command(name = "pdfsift")]
#[command(version)]
#[command(about = "Extract text, tables and images from scanned or digital PDFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extraction pipeline
    Process {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output root; artifacts go to <OUTPUT>/<file stem>/
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Pipeline configuration (JSON); flags override it
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Summarization model
        #[arg(long, env = "PDFSIFT_MODEL")]
        model: Option<String>,

        /// Ollama server URL
        #[arg(long, env = "OLLAMA_HOST")]
        ollama_host: Option<String>,

        /// Summary request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Tesseract language list (e.g., "chi_tra+eng")
        #[arg(long)]
        lang: Option<String>,

        /// Rendering resolution
        #[arg(long)]
        dpi: Option<u32>,

        /// Table region strategy
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Table detector command; the full-page raster PNG path is appended
        #[arg(long, value_name = "CMD")]
        detector_cmd: Option<String>,

        /// Minimum detection score (0.0 - 1.0)
        #[arg(long)]
        confidence: Option<f32>,

        /// Garbage glyph count that forces OCR
        #[arg(long)]
        cid_threshold: Option<usize>,

        /// Report the model summary only for OCR'd pages
        #[arg(long)]
        summary_only: bool,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Do not write corrected rotations back to the PDF
        #[arg(long)]
        no_rotate: bool,

        /// Also write result.md
        #[arg(long)]
        markdown: bool,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show what each page would go through, without rendering
    Inspect {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Garbage glyph count that forces OCR
        #[arg(long)]
        cid_threshold: Option<usize>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,

        /// Print the scan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rotate pages 90 degrees clockwise in place
    Rotate {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Pages to rotate (e.g., "2,5-7")
        #[arg(long)]
        pages: String,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Tables found from the text layer
    Structural,
    /// Tables found by an external detection model
    Model,
}

impl From<StrategyArg> for RegionStrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Structural => RegionStrategyKind::Structural,
            StrategyArg::Model => RegionStrategyKind::Model,
        }
    }
}

/// Flags of the `process` command that map onto [`PipelineConfig`].
struct ProcessArgs {
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    model: Option<String>,
    ollama_host: Option<String>,
    timeout: Option<u64>,
    lang: Option<String>,
    dpi: Option<u32>,
    strategy: Option<StrategyArg>,
    detector_cmd: Option<String>,
    confidence: Option<f32>,
    cid_threshold: Option<usize>,
    summary_only: bool,
    pages: Option<String>,
    no_rotate: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Process {
            input,
            output,
            config,
            model,
            ollama_host,
            timeout,
            lang,
            dpi,
            strategy,
            detector_cmd,
            confidence,
            cid_threshold,
            summary_only,
            pages,
            no_rotate,
            markdown,
            compact,
        }) => {
            let args = ProcessArgs {
                output,
                config,
                model,
                ollama_host,
                timeout,
                lang,
                dpi,
                strategy,
                detector_cmd,
                confidence,
                cid_threshold,
                summary_only,
                pages,
                no_rotate,
            };
            cmd_process(&input, args, markdown, compact)
        }
        Some(Commands::Inspect {
            input,
            cid_threshold,
            pages,
            json,
        }) => cmd_inspect(&input, cid_threshold, pages.as_deref(), json),
        Some(Commands::Rotate { input, pages }) => cmd_rotate(&input, &pages),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: pdfsift process <FILE> [-o DIR]".yellow());
            println!("       pdfsift --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn parse_pages(pages: Option<&str>) -> Result<PageSelection, Box<dyn std::error::Error>> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?),
        None => Ok(PageSelection::All),
    }
}

fn build_config(args: ProcessArgs) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(output) = args.output {
        config = config.with_output_root(output);
    }
    if let Some(model) = args.model {
        config = config.with_model(model);
    }
    if let Some(host) = args.ollama_host {
        config = config.with_ollama_host(host);
    }
    if let Some(secs) = args.timeout {
        config.summary_timeout_secs = secs;
    }
    if let Some(lang) = args.lang {
        config = config.with_ocr_languages(lang);
    }
    if let Some(dpi) = args.dpi {
        config = config.with_dpi(dpi);
    }
    if let Some(cmd) = args.detector_cmd {
        let parts: Vec<String> = cmd.split_whitespace().map(String::from).collect();
        config = config
            .with_detector_command(parts)
            .with_strategy(RegionStrategyKind::Model);
    }
    if let Some(strategy) = args.strategy {
        config = config.with_strategy(strategy.into());
    }
    if let Some(floor) = args.confidence {
        let region = config.region.with_confidence_floor(floor);
        config = config.with_region(region);
    }
    if let Some(threshold) = args.cid_threshold {
        config = config.with_cid_threshold(threshold);
    }
    if args.summary_only {
        config = config.with_text_mode(TextMode::SummaryOnly);
    }
    if args.pages.is_some() {
        config = config.with_pages(parse_pages(args.pages.as_deref())?);
    }
    if args.no_rotate {
        config = config.with_commit_rotations(false);
    }

    config.validate()?;
    log::debug!("Pipeline config: {:?}", config);
    Ok(config)
}

fn cmd_process(
    input: &Path,
    args: ProcessArgs,
    markdown: bool,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(args)?;
    let layout = OutputLayout::for_document(&config.output_root, input)?;

    let pb = ProgressBar::new(1);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let bar = pb.clone();
    let pipeline = DocumentPipeline::from_config(config)?.with_progress(move |p| {
        bar.set_length(p.total.max(1) as u64);
        bar.set_position(p.done as u64);
        match p.page {
            Some(page) => bar.set_message(format!("{} (page {})", p.stage, page)),
            None => bar.set_message(p.stage.to_string()),
        }
        if p.stage == Stage::Done {
            bar.set_position(bar.length().unwrap_or(1));
        }
    });

    let result = pipeline.process(input)?;
    pb.finish_with_message("Done!");

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    fs::write(layout.result_path(), to_json(&result, format)?)?;

    if markdown {
        let options = RenderOptions::new().with_frontmatter(true);
        fs::write(layout.dir().join("result.md"), to_markdown(&result, &options))?;
    }

    println!("\n{}", "Extracted:".green().bold());
    println!("  {} {} text entries", "├─".dimmed(), result.text.len());
    println!("  {} {} tables", "├─".dimmed(), result.table.len());
    println!("  {} {} images", "├─".dimmed(), result.image.len());
    if result.rotated_pages.is_empty() {
        println!("  {} no rotated pages", "└─".dimmed());
    } else {
        println!(
            "  {} rotated pages {:?}",
            "└─".dimmed(),
            result.rotated_pages
        );
    }
    println!("{} {}", "Saved to".green(), layout.dir().display());

    Ok(())
}

fn cmd_inspect(
    input: &Path,
    cid_threshold: Option<usize>,
    pages: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::default().with_pages(parse_pages(pages)?);
    if let Some(threshold) = cid_threshold {
        config = config.with_cid_threshold(threshold);
    }
    let header = pdfsift::sniff_path(input)?;
    let scans = pdfsift::scan_file(input, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scans)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), header);
    println!("{}: {}", "Pages scanned".bold(), scans.len());

    println!();
    println!(
        "{}",
        format!(
            "{:>5}  {:>6}  {:>8}  {:>4}  {:>6}  {:>6}",
            "page", "rotate", "garbage", "ocr", "tables", "images"
        )
        .cyan()
        .bold()
    );
    println!("{}", "─".repeat(48).dimmed());
    for scan in &scans {
        let ocr = if scan.needs_ocr {
            "yes".yellow()
        } else {
            "no".normal()
        };
        println!(
            "{:>5}  {:>6}  {:>8}  {:>4}  {:>6}  {:>6}",
            scan.number,
            scan.rotation,
            scan.garbage_count,
            ocr,
            scan.table_regions.len(),
            scan.embedded_images
        );
    }

    let ocr_pages = scans.iter().filter(|s| s.needs_ocr).count();
    let table_pages = scans.iter().filter(|s| s.has_tables()).count();
    println!();
    println!(
        "{} {} OCR, {} with tables",
        "Summary:".green().bold(),
        ocr_pages,
        table_pages
    );

    Ok(())
}

fn cmd_rotate(input: &Path, pages: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ledger: RotationLedger = match PageSelection::parse(pages) {
        Ok(PageSelection::Pages(list)) => list.into_iter().collect(),
        Ok(PageSelection::Range(range)) => range.collect(),
        Ok(PageSelection::All) => return Err("Rotate needs explicit pages".into()),
        Err(e) => return Err(format!("Invalid page range: {}", e).into()),
    };

    commit_rotations(input, &ledger)?;

    let rotations = read_rotations(input)?;
    for page in ledger.pages() {
        let angle = rotations.get(&page).copied().unwrap_or(0);
        println!("{} page {} -> {}°", "Rotated".green(), page, angle);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfsift".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Multi-modal PDF extraction tool");
    println!();
    println!("External tools: pdftoppm (poppler), tesseract, ollama");
    println!("License: MIT");
}
