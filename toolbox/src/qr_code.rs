//! `qrcode` - render text or a URL into a QR-code PNG.
//!
//! Module layout comes from the `qrcode` crate; pixels are drawn here so the
//! quiet zone (margin) and the exact output width are under our control.

use clap::ValueEnum;
use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use shared_utils::{ensure_parent_dir_exists, AppError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_OUTPUT: &str = "qrcode.png";
pub const DEFAULT_SIZE: u32 = 512;
pub const DEFAULT_MARGIN: u32 = 2;
/// Pixels per module when the requested size cannot hold the symbol.
pub const FALLBACK_SCALE: u32 = 4;
/// Upper bound for `--size` and for the rendered edge.
pub const MAX_SIZE: u32 = 8192;
/// Upper bound for `--margin`, in modules.
pub const MAX_MARGIN: u32 = 256;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum QrErrorCorrection {
    #[value(name = "L")]
    Low,
    #[default]
    #[value(name = "M")]
    Medium,
    #[value(name = "Q")]
    Quartile,
    #[value(name = "H")]
    High,
}

impl From<QrErrorCorrection> for EcLevel {
    fn from(level: QrErrorCorrection) -> Self {
        match level {
            QrErrorCorrection::Low => EcLevel::L,
            QrErrorCorrection::Medium => EcLevel::M,
            QrErrorCorrection::Quartile => EcLevel::Q,
            QrErrorCorrection::High => EcLevel::H,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QrOptions {
    pub text: String,
    pub output: PathBuf,
    pub size: u32,
    pub margin: u32,
    pub error_correction: QrErrorCorrection,
    pub dark: Rgba<u8>,
    pub light: Rgba<u8>,
}

impl QrOptions {
    pub fn new(text: impl Into<String>, output: PathBuf) -> Self {
        Self {
            text: text.into(),
            output,
            size: DEFAULT_SIZE,
            margin: DEFAULT_MARGIN,
            error_correction: QrErrorCorrection::default(),
            dark: BLACK,
            light: WHITE,
        }
    }
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (the `#` is optional).
pub fn parse_hex_color(s: &str) -> std::result::Result<Rgba<u8>, String> {
    let hex = s.trim().trim_start_matches('#');
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>() + "ff",
        6 => format!("{}ff", hex),
        8 => hex.to_string(),
        _ => return Err(format!("invalid color '{}', expected #rgb, #rrggbb or #rrggbbaa", s)),
    };

    let mut channels = [0u8; 4];
    for (i, channel) in channels.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16)
            .map_err(|_| format!("invalid color '{}': not hexadecimal", s))?;
    }
    Ok(Rgba(channels))
}

/// Draws a `width × width` module matrix (row-major, `true` = dark).
///
/// With T = width + 2·margin modules, a `size` ≥ T gives an exact
/// `size × size` image where pixel p maps to module ⌊p·T/size⌋; a smaller
/// `size` falls back to [`FALLBACK_SCALE`] pixels per module. Edges above
/// [`MAX_SIZE`] are rejected.
pub fn render_modules(
    modules: &[bool],
    width: u32,
    margin: u32,
    size: u32,
    dark: Rgba<u8>,
    light: Rgba<u8>,
) -> Result<RgbaImage> {
    let too_large = || {
        AppError::InvalidArgument(format!(
            "QR image would exceed {MAX_SIZE}×{MAX_SIZE} pixels (size {size}, margin {margin})"
        ))
    };
    let total = margin
        .checked_mul(2)
        .and_then(|m| m.checked_add(width))
        .ok_or_else(too_large)?;
    let side = if size >= total {
        size
    } else {
        total.checked_mul(FALLBACK_SCALE).ok_or_else(too_large)?
    };
    if side > MAX_SIZE {
        return Err(too_large());
    }

    Ok(ImageBuffer::from_fn(side, side, |px, py| {
        let mx = (px as u64 * total as u64 / side as u64) as u32;
        let my = (py as u64 * total as u64 / side as u64) as u32;
        let inside = (margin..margin + width).contains(&mx) && (margin..margin + width).contains(&my);
        if inside && modules[((my - margin) * width + (mx - margin)) as usize] {
            dark
        } else {
            light
        }
    }))
}

/// Encodes and renders without touching the file system.
pub fn render_qrcode(opts: &QrOptions) -> Result<RgbaImage> {
    if opts.text.is_empty() {
        return Err(AppError::InvalidArgument("QR text must not be empty".to_string()));
    }

    let code = QrCode::with_error_correction_level(opts.text.as_bytes(), opts.error_correction.into())
        .map_err(|e| AppError::Qr(e.to_string()))?;

    let width = code.width() as u32;
    let modules: Vec<bool> = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();

    render_modules(&modules, width, opts.margin, opts.size, opts.dark, opts.light)
}

/// Entry point for the command: renders and writes the PNG.
pub fn generate_qrcode(opts: &QrOptions) -> Result<PathBuf> {
    let img = render_qrcode(opts)?;
    write_png(&img, &opts.output)?;

    info!(
        output = %opts.output.display(),
        size = img.width(),
        text_len = opts.text.len(),
        "QR code written"
    );
    println!("✅ QR code written: {}", opts.output.display());
    Ok(opts.output.clone())
}

fn write_png(img: &RgbaImage, path: &Path) -> Result<()> {
    ensure_parent_dir_exists(path)?;
    // PNG regardless of the extension the user picked
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
