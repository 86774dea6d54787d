//! paperseg CLI - exam paper question extraction tool

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use paperseg::{
    DirectoryBlobStore, ExtractOptions, ImagePlacement, JsonFormat, MemoryPaperStore,
    PageSelection, PaperMetadata, PaperStore, ParsedPaper, Paperseg, Question,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "paperseg")]
#[command(version)]
#[command(about = "Split exam paper PDFs into questions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment one or more papers into questions
    #[command(alias = "q")]
    Questions {
        /// Input PDF files
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (stdout for a single file if not specified)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Extract page text without segmentation
    Text {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Dump the extracted document (pages, runs, images) as JSON
    Json {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Extract images from a PDF
    Images {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Segment a paper, upload its images and store the records
    Ingest {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Directory for images and stored paper records
        #[arg(long, value_name = "DIR", env = "PAPERSEG_STORE_DIR")]
        store: PathBuf,

        /// Public URL prefix for stored images
        #[arg(long, env = "PAPERSEG_BASE_URL")]
        base_url: Option<String>,

        #[command(flatten)]
        metadata: MetadataArgs,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

/// Extraction and segmentation flags shared by the segmenting commands.
#[derive(Args, Clone)]
struct PipelineArgs {
    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Fail on unreadable page content instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Skip image extraction
    #[arg(long)]
    text_only: bool,

    /// Smallest font size (pt) that can open a question
    #[arg(long, value_name = "PT", env = "PAPERSEG_MIN_LABEL_SIZE")]
    min_label_size: Option<f32>,

    /// How images are attached to questions
    #[arg(long, value_enum, default_value = "page-end", env = "PAPERSEG_IMAGE_PLACEMENT")]
    images: PlacementMode,
}

#[derive(Args, Clone)]
struct MetadataArgs {
    /// Paper metadata as a JSON file
    #[arg(long, value_name = "FILE", conflicts_with_all = ["exam_board", "year", "session", "paper_number"])]
    metadata: Option<PathBuf>,

    /// Exam board (e.g., AQA, Edexcel, OCR)
    #[arg(long, required_unless_present = "metadata")]
    exam_board: Option<String>,

    #[arg(long, required_unless_present = "metadata")]
    year: Option<i32>,

    /// Exam session (e.g., June, November)
    #[arg(long, required_unless_present = "metadata")]
    session: Option<String>,

    #[arg(long, required_unless_present = "metadata")]
    paper_number: Option<u32>,

    #[arg(long)]
    subject: Option<String>,

    #[arg(long)]
    level: Option<String>,

    #[arg(long)]
    total_marks: Option<u32>,

    #[arg(long)]
    title: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PlacementMode {
    /// After each page's text
    PageEnd,
    /// Interleaved by vertical position
    Position,
}

impl From<PlacementMode> for ImagePlacement {
    fn from(mode: PlacementMode) -> Self {
        match mode {
            PlacementMode::PageEnd => ImagePlacement::PageEnd,
            PlacementMode::Position => ImagePlacement::ByPosition,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Questions {
            inputs,
            output,
            format,
            compact,
            pipeline,
        } => cmd_questions(&inputs, output.as_deref(), format, compact, &pipeline),
        Commands::Text {
            input,
            output,
            pages,
        } => cmd_text(&input, output.as_deref(), pages.as_deref()),
        Commands::Json {
            input,
            output,
            compact,
            pages,
        } => cmd_json(&input, output.as_deref(), compact, pages.as_deref()),
        Commands::Info { input } => cmd_info(&input),
        Commands::Images {
            input,
            output,
            pages,
        } => cmd_images(&input, output.as_deref(), pages.as_deref()),
        Commands::Ingest {
            input,
            store,
            base_url,
            metadata,
            pipeline,
        } => cmd_ingest(&input, &store, base_url, &metadata, &pipeline),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn page_selection(pages: Option<&str>) -> CliResult<PageSelection> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?),
        None => Ok(PageSelection::All),
    }
}

fn extract_options(pages: Option<&str>) -> CliResult<ExtractOptions> {
    Ok(ExtractOptions::new().with_pages(page_selection(pages)?))
}

impl PipelineArgs {
    fn builder(&self) -> CliResult<Paperseg> {
        let mut builder = Paperseg::new()
            .with_pages(page_selection(self.pages.as_deref())?)
            .with_image_placement(self.images.into());
        if self.strict {
            builder = builder.strict();
        }
        if self.text_only {
            builder = builder.text_only();
        }
        if let Some(size) = self.min_label_size {
            builder = builder.with_min_label_font_size(size);
        }
        Ok(builder)
    }
}

impl MetadataArgs {
    fn to_metadata(&self) -> CliResult<PaperMetadata> {
        if let Some(path) = &self.metadata {
            return Ok(PaperMetadata::from_json(&fs::read_to_string(path)?)?);
        }

        let (Some(board), Some(year), Some(session), Some(number)) = (
            self.exam_board.as_deref(),
            self.year,
            self.session.as_deref(),
            self.paper_number,
        ) else {
            return Err("--exam-board, --year, --session and --paper-number are required".into());
        };

        let mut metadata = PaperMetadata::new(board, year, session, number);
        if let Some(subject) = &self.subject {
            metadata.subject = subject.clone();
        }
        if let Some(level) = &self.level {
            metadata.level = level.clone();
        }
        if let Some(marks) = self.total_marks {
            metadata = metadata.with_total_marks(marks);
        }
        if let Some(title) = &self.title {
            metadata = metadata.with_title(title);
        }
        metadata.validate()?;
        Ok(metadata)
    }
}

fn render_questions(
    questions: &[Question<'_>],
    format: OutputFormat,
    compact: bool,
) -> paperseg::Result<String> {
    match format {
        OutputFormat::Json => paperseg::render::to_json(
            questions,
            if compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            },
        ),
        OutputFormat::Text => Ok(paperseg::render::questions_to_text(questions)),
    }
}

fn report_warnings(input: &Path, paper: &ParsedPaper) {
    for warning in paper.warnings() {
        eprintln!(
            "{} {}: {}",
            "Warning:".yellow().bold(),
            input.display(),
            warning
        );
    }
}

fn cmd_questions(
    inputs: &[PathBuf],
    output: Option<&Path>,
    format: OutputFormat,
    compact: bool,
    pipeline: &PipelineArgs,
) -> CliResult<()> {
    let builder = pipeline.builder()?;

    let output_dir = match (output, inputs) {
        (None, [input]) => {
            let paper = builder.parse(input)?;
            report_warnings(input, &paper);
            println!("{}", render_questions(&paper.questions(), format, compact)?);
            return Ok(());
        }
        (None, _) => return Err("--output is required for more than one input".into()),
        (Some(dir), _) => dir,
    };

    fs::create_dir_all(output_dir)?;

    let progress = ProgressBar::new(inputs.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("template is compile-time constant")
            .progress_chars("#>-"),
    );

    let results: Vec<(&PathBuf, Result<usize, String>)> = inputs
        .par_iter()
        .map(|input| {
            let result = segment_to_file(&builder, input, output_dir, format, compact);
            progress.inc(1);
            (input, result)
        })
        .collect();

    progress.finish_and_clear();

    let mut failed = 0;
    for (input, result) in &results {
        match result {
            Ok(count) => println!(
                "{} {} ({} questions)",
                "Segmented".green(),
                input.display(),
                count
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {}", "Failed".red().bold(), input.display(), e);
            }
        }
    }

    println!(
        "\n{} {} of {} papers written to {}",
        "Done!".green().bold(),
        results.len() - failed,
        results.len(),
        output_dir.display()
    );

    if failed > 0 {
        return Err(format!("{} papers failed", failed).into());
    }
    Ok(())
}

/// Segment one paper and write `{stem}.questions.{ext}` into `dir`.
fn segment_to_file(
    builder: &Paperseg,
    input: &Path,
    dir: &Path,
    format: OutputFormat,
    compact: bool,
) -> Result<usize, String> {
    let paper = builder.clone().parse(input).map_err(|e| e.to_string())?;
    report_warnings(input, &paper);
    let questions = paper.questions();
    let rendered = render_questions(&questions, format, compact).map_err(|e| e.to_string())?;

    let extension = match format {
        OutputFormat::Json => "json",
        OutputFormat::Text => "txt",
    };
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let path = dir.join(format!("{}.questions.{}", stem, extension));
    fs::write(&path, rendered).map_err(|e| e.to_string())?;

    Ok(questions.len())
}

fn cmd_text(input: &Path, output: Option<&Path>, pages: Option<&str>) -> CliResult<()> {
    let doc = paperseg::PdfExtractor::open_with_options(input, extract_options(pages)?.text_only())?
        .extract()?;
    let text = paperseg::render::to_text(&doc);

    if let Some(path) = output {
        fs::write(path, &text)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", text);
    }

    Ok(())
}

fn cmd_json(input: &Path, output: Option<&Path>, compact: bool, pages: Option<&str>) -> CliResult<()> {
    let doc = paperseg::PdfExtractor::open_with_options(input, extract_options(pages)?)?.extract()?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = paperseg::render::to_json(&doc, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> CliResult<()> {
    let paper = Paperseg::new().parse(input)?;
    let doc = paper.document();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), doc.metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), doc.metadata.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if doc.metadata.encrypted { "Yes" } else { "No" }
    );

    for (name, value) in [
        ("Title", &doc.metadata.title),
        ("Author", &doc.metadata.author),
        ("Creator", &doc.metadata.creator),
        ("Producer", &doc.metadata.producer),
    ] {
        if !value.is_empty() {
            println!("{}: {}", name.bold(), value);
        }
    }
    if let Some(created) = doc.metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(modified) = doc.metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    let questions = paper.questions();
    let marks: u32 = questions.iter().filter_map(|q| q.marks).sum();

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: {}",
        "Text runs".bold(),
        doc.pages.iter().map(|p| p.text_runs.len()).sum::<usize>()
    );
    println!("{}: {}", "Images".bold(), doc.image_count());
    println!("{}: {}", "Questions".bold(), questions.len());
    println!("{}: {}", "Marks found".bold(), marks);
    println!("{}: {}", "Warnings".bold(), doc.warnings.len());

    Ok(())
}

fn cmd_images(input: &Path, output: Option<&Path>, pages: Option<&str>) -> CliResult<()> {
    let doc = paperseg::PdfExtractor::open_with_options(input, extract_options(pages)?)?.extract()?;

    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;

    let mut count = 0;
    for image in doc.pages.iter().flat_map(|page| &page.image_runs) {
        let filename = format!("page{}_img{}.{}", image.page, image.index, image.format);
        fs::write(output_dir.join(&filename), &image.data)?;
        println!(
            "{} {} ({}x{})",
            "Extracted".green(),
            filename,
            image.width,
            image.height
        );
        count += 1;
    }

    for warning in &doc.warnings {
        eprintln!("{} {}", "Warning:".yellow().bold(), warning);
    }

    println!("\n{} {} images extracted", "Done!".green().bold(), count);

    Ok(())
}

fn cmd_ingest(
    input: &Path,
    store: &Path,
    base_url: Option<String>,
    metadata: &MetadataArgs,
    pipeline: &PipelineArgs,
) -> CliResult<()> {
    let metadata = metadata.to_metadata()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("template is compile-time constant"),
    );
    spinner.set_message("Segmenting paper...");

    let paper = pipeline.builder()?.parse(input)?;
    report_warnings(input, &paper);

    spinner.set_message("Publishing...");
    let mut blobs = DirectoryBlobStore::new(store.join("images"))?;
    if let Some(url) = base_url {
        blobs = blobs.with_base_url(url);
    }
    let papers = MemoryPaperStore::new();
    let report = paper.publish(&metadata, &blobs, &papers)?;

    let record = papers
        .get_paper(&report.paper_id)?
        .ok_or("stored paper disappeared")?;
    let papers_dir = store.join("papers");
    fs::create_dir_all(&papers_dir)?;
    let record_path = papers_dir.join(format!("{}.json", report.paper_id));
    fs::write(&record_path, paperseg::render::to_json(&record, JsonFormat::Pretty)?)?;

    spinner.finish_and_clear();

    println!("{} {}", "Ingested".green().bold(), report.title);
    println!("  {} paper id: {}", "├─".dimmed(), report.paper_id);
    println!("  {} questions: {}", "├─".dimmed(), report.questions);
    println!("  {} text items: {}", "├─".dimmed(), report.text_items);
    println!("  {} images: {}", "├─".dimmed(), report.images);
    println!("  {} record: {}", "└─".dimmed(), record_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperseg::{ContentItem, TextRun};

    fn metadata_args() -> MetadataArgs {
        MetadataArgs {
            metadata: None,
            exam_board: Some("AQA".to_string()),
            year: Some(2023),
            session: Some("June".to_string()),
            paper_number: Some(1),
            subject: None,
            level: None,
            total_marks: Some(80),
            title: None,
        }
    }

    #[test]
    fn test_metadata_from_flags() {
        let metadata = metadata_args().to_metadata().unwrap();
        assert_eq!(metadata.exam_board, "AQA");
        assert_eq!(metadata.subject, "Economics");
        assert_eq!(metadata.total_marks, Some(80));
    }

    #[test]
    fn test_metadata_flags_validated() {
        let mut args = metadata_args();
        args.paper_number = Some(7);
        assert!(args.to_metadata().is_err());
    }

    #[test]
    fn test_metadata_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        fs::write(
            &path,
            r#"{"examBoard":"OCR","year":2022,"session":"November","paperNumber":2}"#,
        )
        .unwrap();

        let mut args = metadata_args();
        args.metadata = Some(path);
        let metadata = args.to_metadata().unwrap();
        assert_eq!(metadata.exam_board, "OCR");
        assert_eq!(metadata.paper_number, 2);
    }

    #[test]
    fn test_page_selection_flag() {
        assert_eq!(page_selection(None).unwrap(), PageSelection::All);
        assert_eq!(
            page_selection(Some("2-3")).unwrap(),
            PageSelection::Range(2..=3)
        );
        assert!(page_selection(Some("0")).is_err());
    }

    #[test]
    fn test_cli_parses_ingest() {
        let cli = Cli::try_parse_from([
            "paperseg",
            "ingest",
            "paper.pdf",
            "--store",
            "out",
            "--exam-board",
            "Edexcel",
            "--year",
            "2024",
            "--session",
            "June",
            "--paper-number",
            "3",
            "--images",
            "position",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest { pipeline, .. } => {
                assert!(pipeline.images == PlacementMode::Position)
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_render_questions_formats() {
        let stem = TextRun::new("1 Define GDP. [2 marks]", 11.0);
        let mut question = Question::new("1", 0, Some(2), 1);
        question.content.push(ContentItem::Text(&stem));
        let questions = vec![question];

        let text = render_questions(&questions, OutputFormat::Text, false).unwrap();
        assert!(text.starts_with("Question 1 (page 1) [2 marks]"));

        let json = render_questions(&questions, OutputFormat::Json, true).unwrap();
        assert!(json.starts_with("[{"));
        assert!(json.contains("\"label\":\"1\""));
        assert!(!json.contains('\n'));
    }
}
