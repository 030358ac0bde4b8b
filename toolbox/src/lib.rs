//! toolbox - small media utilities behind one CLI
//!
//! Each module is one command: argument normalisation, a call sequence into
//! the library or binary that does the real work, and console reporting.
//!
//! ```rust,ignore
//! use toolbox::qr_code::{generate_qrcode, QrOptions};
//!
//! let opts = QrOptions::new("https://example.com", "qr.png".into());
//! generate_qrcode(&opts)?;
//! ```

pub mod compress;
pub mod convert;
pub mod grid9;
pub mod qr_code;
pub mod word_images;

pub use compress::{compress_path, CompressOptions, ImageOutputFormat};
pub use convert::{convert_video, ConvertOptions, Preset};
pub use grid9::{build_grids, GridOptions};
pub use qr_code::{generate_qrcode, QrErrorCorrection, QrOptions};
pub use word_images::{extract_word_images, ExtractReport};

pub use shared_utils::{AppError, Result};
