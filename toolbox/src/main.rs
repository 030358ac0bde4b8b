use clap::{ArgAction, Parser, Subcommand};
use console::style;
use image::Rgba;
use shared_utils::logging::{
    init_logging, log_operation_end, log_operation_start, LogConfig, FILE_ONLY_TARGET,
};
use shared_utils::{resolve_from_cwd, Result};
use std::path::PathBuf;
use toolbox::compress::{clamp_quality, nonzero_dimension, CompressSummary, DEFAULT_QUALITY};
use toolbox::grid9::{DEFAULT_CELL_SIZE, MAX_CELL_SIZE};
use toolbox::qr_code::{
    parse_hex_color, BLACK, DEFAULT_MARGIN, DEFAULT_OUTPUT, DEFAULT_SIZE, MAX_MARGIN, MAX_SIZE, WHITE,
};
use toolbox::{
    build_grids, compress_path, convert_video, extract_word_images, generate_qrcode,
    CompressOptions, ConvertOptions, GridOptions, ImageOutputFormat, Preset, QrErrorCorrection,
    QrOptions,
};
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "toolbox")]
#[command(version, about = "Small media utilities: compress, convert, grid9, qrcode, word-images", long_about = None)]
struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log directory (default: $TOOLBOX_LOG_DIR or the system temp dir)
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress one image or every image in a directory
    #[command(disable_help_flag = true)]
    Compress {
        /// Image file or directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (single) or directory (batch)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Quality 1-100, out-of-range values are clamped [default: 80]
        #[arg(short, long, allow_negative_numbers = true)]
        quality: Option<i64>,

        /// Max width (keeps aspect ratio, never enlarges)
        #[arg(short, long)]
        width: Option<u32>,

        /// Max height (keeps aspect ratio, never enlarges)
        #[arg(short = 'h', long)]
        height: Option<u32>,

        /// Output format (default: same as input)
        #[arg(short, long, value_enum)]
        format: Option<ImageOutputFormat>,

        /// Print help
        #[arg(long, action = ArgAction::Help)]
        help: Option<bool>,
    },

    /// Convert a video (e.g. .mov) to H.264/AAC .mp4 via ffmpeg
    Convert {
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (default: <input dir>/<stem>.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// x264 preset
        #[arg(short, long, value_enum, default_value_t = Preset::Medium)]
        preset: Preset,

        /// ffmpeg binary (overrides FFMPEG_PATH and PATH)
        #[arg(short = 'F', long)]
        ffmpeg: Option<PathBuf>,
    },

    /// Build a 3x3 collage from random images in a directory
    Grid9 {
        #[arg(short, long)]
        dir: PathBuf,

        /// Output file (default: <dir>/grid9.jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Cell edge in pixels
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_CELL_SIZE,
            value_parser = clap::value_parser!(u32).range(1..=MAX_CELL_SIZE as i64)
        )]
        size: u32,

        /// One collage per full group of 9 images
        #[arg(short, long)]
        multi: bool,

        /// Shuffle seed for reproducible picks
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Render text or a URL as a QR-code PNG
    Qrcode {
        #[arg(short, long)]
        text: String,

        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Image edge in pixels
        #[arg(
            short,
            long,
            default_value_t = DEFAULT_SIZE,
            value_parser = clap::value_parser!(u32).range(..=MAX_SIZE as i64)
        )]
        size: u32,

        /// Quiet zone in modules
        #[arg(
            long,
            default_value_t = DEFAULT_MARGIN,
            value_parser = clap::value_parser!(u32).range(..=MAX_MARGIN as i64)
        )]
        margin: u32,

        /// Error correction level
        #[arg(long, value_enum, ignore_case = true, default_value_t = QrErrorCorrection::Medium)]
        ecc: QrErrorCorrection,

        /// Dark module color (#rgb, #rrggbb, #rrggbbaa)
        #[arg(long, value_parser = parse_hex_color)]
        dark: Option<Rgba<u8>>,

        /// Light module color
        #[arg(long, value_parser = parse_hex_color)]
        light: Option<Rgba<u8>>,
    },

    /// Export every image embedded in a .docx
    #[command(name = "word-images")]
    WordImages {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Compress { .. } => "compress",
            Commands::Convert { .. } => "convert",
            Commands::Grid9 { .. } => "grid9",
            Commands::Qrcode { .. } => "qrcode",
            Commands::WordImages { .. } => "word-images",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default().verbose(cli.verbose);
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(resolve_from_cwd(dir));
    }
    if let Err(e) = init_logging("toolbox", log_config) {
        eprintln!("⚠️  Logging disabled: {:#}", e);
    }

    let operation = cli.command.name();
    let start = log_operation_start(operation);
    let result = run(cli.command);
    log_operation_end(operation, start.elapsed(), result.is_ok());

    if let Err(e) = result {
        error!(target: FILE_ONLY_TARGET, command = operation, error = %e, "Command failed");
        eprintln!("{}", style(e.user_message()).red());
        std::process::exit(e.exit_code());
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Compress {
            input,
            output,
            quality,
            width,
            height,
            format,
            help: _,
        } => {
            let opts = CompressOptions {
                input: resolve_from_cwd(&input),
                output: output.as_deref().map(resolve_from_cwd),
                quality: quality.map_or(DEFAULT_QUALITY, clamp_quality),
                quality_explicit: quality.is_some(),
                width: nonzero_dimension(width),
                height: nonzero_dimension(height),
                format,
            };
            debug!(?opts, "compress");
            match compress_path(&opts)? {
                CompressSummary::Single(report) => {
                    debug!(output = %report.output_path.display(), ratio = report.ratio(), "single file done")
                }
                CompressSummary::Batch(totals) => {
                    debug!(files = totals.files.len(), ratio = totals.ratio(), "batch done")
                }
            }
        }

        Commands::Convert {
            input,
            output,
            preset,
            ffmpeg,
        } => {
            let opts = ConvertOptions {
                input: resolve_from_cwd(&input),
                output: output.as_deref().map(resolve_from_cwd),
                preset,
                ffmpeg,
            };
            convert_video(&opts)?;
        }

        Commands::Grid9 {
            dir,
            output,
            size,
            multi,
            seed,
        } => {
            let opts = GridOptions {
                dir: resolve_from_cwd(&dir),
                output: output.as_deref().map(resolve_from_cwd),
                cell_size: size,
                multi,
                seed,
            };
            build_grids(&opts)?;
        }

        Commands::Qrcode {
            text,
            output,
            size,
            margin,
            ecc,
            dark,
            light,
        } => {
            let opts = QrOptions {
                text,
                output: resolve_from_cwd(&output),
                size,
                margin,
                error_correction: ecc,
                dark: dark.unwrap_or(BLACK),
                light: light.unwrap_or(WHITE),
            };
            generate_qrcode(&opts)?;
        }

        Commands::WordImages { input, output } => {
            extract_word_images(&resolve_from_cwd(&input), &resolve_from_cwd(&output))?;
        }
    }
    Ok(())
}
