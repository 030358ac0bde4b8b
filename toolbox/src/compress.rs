//! `compress` - re-encode images at a given quality, optionally shrinking them.
//!
//! Works on a single file or on every supported image directly inside a folder.
//! The encoder is picked from the OUTPUT extension, so `-f` and `-o` both steer it.

use clap::ValueEnum;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use shared_utils::common_utils::{dotted_extension, file_stem_lossy};
use shared_utils::{
    collect_files, compression_ratio, ensure_dir_exists, ensure_parent_dir_exists, file_size,
    format_kb, format_mb, get_extension_lowercase, has_extension, AppError, Result,
    COMPRESS_EXTENSIONS,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_QUALITY: u8 = 80;

/// Name of the folder created inside the input directory in batch mode.
pub const BATCH_OUTPUT_DIR: &str = "compressed";

/// Suffix added to the file stem in single-file mode.
pub const SINGLE_OUTPUT_SUFFIX: &str = "-compressed";

// ravif speed: 1 (slowest) ..= 10 (fastest)
const AVIF_SPEED: u8 = 6;

/// `-f` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageOutputFormat {
    Jpg,
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl ImageOutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageOutputFormat::Jpg => "jpg",
            ImageOutputFormat::Jpeg => "jpeg",
            ImageOutputFormat::Png => "png",
            ImageOutputFormat::Webp => "webp",
            ImageOutputFormat::Avif => "avif",
        }
    }
}

/// Encoder actually used for a given output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl Encoding {
    /// Anything that is not png/webp/avif (tif included) is written as JPEG.
    pub fn for_output(path: &Path) -> Self {
        match get_extension_lowercase(path).as_str() {
            "png" => Encoding::Png,
            "webp" => Encoding::Webp,
            "avif" => Encoding::Avif,
            _ => Encoding::Jpeg,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// File or directory, already resolved against the CWD.
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub quality: u8,
    /// `-q` was given on the command line (not the default).
    pub quality_explicit: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<ImageOutputFormat>,
}

impl CompressOptions {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            output: None,
            quality: DEFAULT_QUALITY,
            quality_explicit: false,
            width: None,
            height: None,
            format: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

impl FileReport {
    pub fn ratio(&self) -> f64 {
        compression_ratio(self.input_bytes, self.output_bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchTotals {
    pub output_dir: PathBuf,
    pub files: Vec<FileReport>,
}

impl BatchTotals {
    pub fn input_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.input_bytes).sum()
    }

    pub fn output_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.output_bytes).sum()
    }

    pub fn ratio(&self) -> f64 {
        compression_ratio(self.input_bytes(), self.output_bytes())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompressSummary {
    Single(FileReport),
    Batch(BatchTotals),
}

/// Quality is clamped, never rejected.
pub fn clamp_quality(raw: i64) -> u8 {
    raw.clamp(1, 100) as u8
}

/// `0` means "not given", like an omitted flag.
pub fn nonzero_dimension(raw: Option<u32>) -> Option<u32> {
    raw.filter(|v| *v > 0)
}

/// Target size for a "fit inside, never enlarge" resize, or `None` when the
/// image is already within the box (or no box was given).
pub fn fit_inside(
    src_width: u32,
    src_height: u32,
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    if src_width == 0 || src_height == 0 {
        return None;
    }

    let scale_w = width.map(|w| w as f64 / src_width as f64);
    let scale_h = height.map(|h| h as f64 / src_height as f64);
    let scale = match (scale_w, scale_h) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => return None,
    };

    if scale >= 1.0 {
        return None;
    }

    let w = ((src_width as f64 * scale).round() as u32).max(1);
    let h = ((src_height as f64 * scale).round() as u32).max(1);
    Some((w, h))
}

/// Single-file output: `-o` as given, else `<dir>/<stem>-compressed<ext>`.
pub fn single_output_path(
    input: &Path,
    output: Option<&Path>,
    format: Option<ImageOutputFormat>,
) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    let ext = output_extension(input, format);
    parent.join(format!(
        "{}{}{}",
        file_stem_lossy(input),
        SINGLE_OUTPUT_SUFFIX,
        ext
    ))
}

/// Batch output directory: `-o` as given, else `<input>/compressed`.
pub fn batch_output_dir(input_dir: &Path, output: Option<&Path>) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input_dir.join(BATCH_OUTPUT_DIR))
}

/// Batch output file: `<outdir>/<stem><ext>`.
pub fn batch_output_file(
    output_dir: &Path,
    input_file: &Path,
    format: Option<ImageOutputFormat>,
) -> PathBuf {
    output_dir.join(format!(
        "{}{}",
        file_stem_lossy(input_file),
        output_extension(input_file, format)
    ))
}

fn output_extension(input: &Path, format: Option<ImageOutputFormat>) -> String {
    match format {
        Some(f) => format!(".{}", f.extension()),
        None => dotted_extension(input),
    }
}

/// Decodes `input`, optionally shrinks it, and encodes it to `output`.
pub fn compress_image(
    input: &Path,
    output: &Path,
    quality: u8,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<()> {
    let img = ImageReader::open(input)
        .map_err(|e| AppError::io(input, e))?
        .with_guessed_format()
        .map_err(|e| AppError::io(input, e))?
        .decode()?;

    let (src_w, src_h) = img.dimensions();
    let img = match fit_inside(src_w, src_h, width, height) {
        Some((w, h)) => {
            debug!(src_w, src_h, w, h, "Resizing");
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        None => img,
    };

    ensure_parent_dir_exists(output)?;
    let encoding = Encoding::for_output(output);
    let file = File::create(output).map_err(|e| AppError::io(output, e))?;
    let mut writer = BufWriter::new(file);

    encode(&img, encoding, quality, &mut writer)?;
    writer.flush().map_err(|e| AppError::io(output, e))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        ?encoding,
        quality,
        "Image encoded"
    );
    Ok(())
}

fn encode<W: Write>(img: &DynamicImage, encoding: Encoding, quality: u8, writer: &mut W) -> Result<()> {
    match encoding {
        Encoding::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, quality))?;
        }
        Encoding::Png => {
            img.write_with_encoder(PngEncoder::new_with_quality(
                writer,
                CompressionType::Best,
                PngFilter::Adaptive,
            ))?;
        }
        Encoding::Webp => {
            // lossless only; quality does not apply
            let pixels = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            pixels.write_with_encoder(WebPEncoder::new_lossless(writer))?;
        }
        Encoding::Avif => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(AvifEncoder::new_with_speed_quality(
                writer, AVIF_SPEED, quality,
            ))?;
        }
    }
    Ok(())
}

/// True when an explicit `-q` cannot take effect because the output is WebP
/// (lossless only).
pub fn quality_ignored(opts: &CompressOptions) -> bool {
    if !opts.quality_explicit {
        return false;
    }
    if opts.input.is_dir() {
        // batch: only `-f` can force WebP for every file
        return opts.format == Some(ImageOutputFormat::Webp);
    }
    let target = single_output_path(&opts.input, opts.output.as_deref(), opts.format);
    Encoding::for_output(&target) == Encoding::Webp
}

/// Entry point for the command: dispatches on file vs directory.
pub fn compress_path(opts: &CompressOptions) -> Result<CompressSummary> {
    let input = &opts.input;
    let meta = std::fs::metadata(input).map_err(|_| AppError::InputNotFound {
        path: input.clone(),
    })?;

    if quality_ignored(opts) {
        warn!(quality = opts.quality, "WebP output is lossless, -q has no effect");
    }

    if meta.is_dir() {
        compress_directory(opts).map(CompressSummary::Batch)
    } else {
        compress_single(opts).map(CompressSummary::Single)
    }
}

fn compress_single(opts: &CompressOptions) -> Result<FileReport> {
    let input = &opts.input;
    if !has_extension(input, COMPRESS_EXTENSIONS) {
        return Err(AppError::UnsupportedImage {
            path: input.clone(),
            supported: COMPRESS_EXTENSIONS,
        });
    }

    let output = single_output_path(input, opts.output.as_deref(), opts.format);
    println!(
        "🗜️  Compressing: {}",
        input.file_name().unwrap_or_default().to_string_lossy()
    );

    let input_bytes = file_size(input)?;
    compress_image(input, &output, opts.quality, opts.width, opts.height)?;
    let output_bytes = file_size(&output)?;

    let report = FileReport {
        input_path: input.clone(),
        output_path: output,
        input_bytes,
        output_bytes,
    };

    println!("✅ Done: {}", report.output_path.display());
    println!("   Original:   {}", format_kb(report.input_bytes));
    println!("   Compressed: {}", format_kb(report.output_bytes));
    println!("   Saved:      {:.1}%", report.ratio());

    Ok(report)
}

fn compress_directory(opts: &CompressOptions) -> Result<BatchTotals> {
    let input_dir = &opts.input;
    let files = collect_files(input_dir, COMPRESS_EXTENSIONS);
    if files.is_empty() {
        return Err(AppError::NoImagesFound {
            dir: input_dir.clone(),
        });
    }

    let output_dir = batch_output_dir(input_dir, opts.output.as_deref());
    ensure_dir_exists(&output_dir)?;

    println!("📂 Found {} images, compressing...", files.len());
    let total = files.len();
    let mut reports = Vec::with_capacity(total);

    for (i, file) in files.iter().enumerate() {
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        let output = batch_output_file(&output_dir, file, opts.format);

        print!("[{}/{}] {}... ", i + 1, total, name);
        let _ = std::io::stdout().flush();

        let input_bytes = file_size(file)?;
        compress_image(file, &output, opts.quality, opts.width, opts.height)?;
        let output_bytes = file_size(&output)?;

        let report = FileReport {
            input_path: file.clone(),
            output_path: output,
            input_bytes,
            output_bytes,
        };
        println!("done ({:.1}% smaller)", report.ratio());
        reports.push(report);
    }

    let totals = BatchTotals {
        output_dir,
        files: reports,
    };

    println!("\n✅ Batch compression finished: {} images", totals.files.len());
    println!("   Output dir:       {}", totals.output_dir.display());
    println!("   Total original:   {}", format_mb(totals.input_bytes()));
    println!("   Total compressed: {}", format_mb(totals.output_bytes()));
    println!("   Total saved:      {:.1}%", totals.ratio());

    Ok(totals)
}
