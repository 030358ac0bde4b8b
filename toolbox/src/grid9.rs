//! `grid9` - pick 9 random images from a folder and tile them into a 3×3 grid.
//!
//! With `multi`, every full group of 9 (after shuffling) becomes its own grid.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, ImageReader, Rgba, RgbaImage};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared_utils::common_utils::file_stem_lossy;
use shared_utils::{
    collect_files, ensure_parent_dir_exists, get_extension_lowercase, AppError, Result,
    GRID_EXTENSIONS,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const GRID_SIDE: u32 = 3;
pub const GRID_CELLS: usize = (GRID_SIDE * GRID_SIDE) as usize;
pub const DEFAULT_CELL_SIZE: u32 = 512;
/// Largest accepted cell edge; the canvas is 3× that on each side.
pub const MAX_CELL_SIZE: u32 = 4096;

const DEFAULT_NAME: &str = "grid9";
const WRITABLE_EXTENSIONS: &[&str] = &["png", "webp", "bmp", "jpg", "jpeg"];
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone)]
pub struct GridOptions {
    pub dir: PathBuf,
    pub output: Option<PathBuf>,
    /// Edge of one cell in pixels.
    pub cell_size: u32,
    pub multi: bool,
    /// Fixed shuffle seed, for reproducible picks.
    pub seed: Option<u64>,
}

impl GridOptions {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            output: None,
            cell_size: DEFAULT_CELL_SIZE,
            multi: false,
            seed: None,
        }
    }
}

/// Top-left corner of cell `index` (row-major).
pub fn cell_origin(index: usize, cell_size: u32) -> (u32, u32) {
    let index = index as u32;
    ((index % GRID_SIDE) * cell_size, (index / GRID_SIDE) * cell_size)
}

/// Shuffles the candidates and cuts them into groups of 9.
pub fn plan_groups<R>(mut images: Vec<PathBuf>, multi: bool, rng: &mut R) -> Result<Vec<Vec<PathBuf>>>
where
    R: rand::Rng + ?Sized,
{
    if images.len() < GRID_CELLS {
        return Err(AppError::NotEnoughImages {
            found: images.len(),
            required: GRID_CELLS,
        });
    }

    images.shuffle(rng);
    let available = images.len() / GRID_CELLS;
    let groups = if multi { available } else { available.min(1) };

    Ok(images
        .chunks_exact(GRID_CELLS)
        .take(groups)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Output path for group `index` (0-based) out of `groups`.
pub fn grid_output_path(dir: &Path, output: Option<&Path>, index: usize, groups: usize) -> PathBuf {
    let path = match output {
        None if groups > 1 => dir.join(format!("{}-{}.jpg", DEFAULT_NAME, index + 1)),
        None => dir.join(format!("{}.jpg", DEFAULT_NAME)),
        Some(out) if groups > 1 => {
            let parent = out.parent().unwrap_or_else(|| Path::new(""));
            let ext = out
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| ".jpg".to_string());
            parent.join(format!("{}-{}{}", file_stem_lossy(out), index + 1, ext))
        }
        Some(out) => out.to_path_buf(),
    };

    if WRITABLE_EXTENSIONS.contains(&get_extension_lowercase(&path).as_str()) {
        path
    } else {
        let mut s = path.into_os_string();
        s.push(".jpg");
        PathBuf::from(s)
    }
}

/// Canvas edge for `cell_size`, or an error outside `1..=MAX_CELL_SIZE`.
pub fn canvas_side(cell_size: u32) -> Result<u32> {
    cell_size
        .checked_mul(GRID_SIDE)
        .filter(|_| (1..=MAX_CELL_SIZE).contains(&cell_size))
        .ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "cell size must be between 1 and {} pixels, got {}",
                MAX_CELL_SIZE, cell_size
            ))
        })
}

/// Tiles exactly 9 images onto a white `3·cell × 3·cell` canvas.
pub fn compose_grid(images: &[DynamicImage], cell_size: u32) -> Result<RgbaImage> {
    let side = canvas_side(cell_size)?;
    let mut canvas: RgbaImage = ImageBuffer::from_pixel(side, side, BACKGROUND);

    for (i, img) in images.iter().take(GRID_CELLS).enumerate() {
        // cover: fill the cell, crop the overflow around the centre
        let cell = img.resize_to_fill(cell_size, cell_size, FilterType::Lanczos3);
        let (x, y) = cell_origin(i, cell_size);
        imageops::overlay(&mut canvas, &cell.to_rgba8(), x as i64, y as i64);
    }
    Ok(canvas)
}

/// Decodes by content, so a mislabelled extension still loads.
fn open_image(path: &Path) -> Result<DynamicImage> {
    Ok(ImageReader::open(path)
        .map_err(|e| AppError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| AppError::io(path, e))?
        .decode()?)
}

fn save_grid(canvas: RgbaImage, path: &Path) -> Result<()> {
    ensure_parent_dir_exists(path)?;
    match get_extension_lowercase(path).as_str() {
        "png" | "webp" => canvas.save(path)?,
        // jpeg / bmp: drop alpha
        _ => DynamicImage::ImageRgba8(canvas).to_rgb8().save(path)?,
    }
    Ok(())
}

/// Entry point for the command; returns the written files.
pub fn build_grids(opts: &GridOptions) -> Result<Vec<PathBuf>> {
    let dir = &opts.dir;
    if !dir.exists() {
        return Err(AppError::InputNotFound { path: dir.clone() });
    }
    if !dir.is_dir() {
        return Err(AppError::NotADirectory { path: dir.clone() });
    }
    canvas_side(opts.cell_size)?;

    let candidates = collect_files(dir, GRID_EXTENSIONS);
    debug!(count = candidates.len(), dir = %dir.display(), "Grid candidates");

    let groups = match opts.seed {
        Some(seed) => plan_groups(candidates, opts.multi, &mut StdRng::seed_from_u64(seed))?,
        None => plan_groups(candidates, opts.multi, &mut rand::rng())?,
    };

    let total = groups.len();
    let mut written = Vec::with_capacity(total);

    for (g, group) in groups.iter().enumerate() {
        let out_path = grid_output_path(dir, opts.output.as_deref(), g, total);
        println!("🧩 Building grid ({}/{})...", g + 1, total);

        let images = group
            .iter()
            .map(|p| open_image(p))
            .collect::<Result<Vec<_>>>()?;

        let canvas = compose_grid(&images, opts.cell_size)?;
        save_grid(canvas, &out_path)?;

        info!(output = %out_path.display(), sources = ?group, "Grid written");
        println!("✅ Done: {}", out_path.display());
        written.push(out_path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb};
    use tempfile::TempDir;

    fn fill_dir(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let p = dir.join(format!("img{:02}.png", i));
                let shade = (i * 20) as u8;
                ImageBuffer::from_pixel(6, 4, Rgb([shade, 0, 0])).save(&p).unwrap();
                p
            })
            .collect()
    }

    #[test]
    fn test_cell_origin_row_major() {
        assert_eq!(cell_origin(0, 10), (0, 0));
        assert_eq!(cell_origin(2, 10), (20, 0));
        assert_eq!(cell_origin(3, 10), (0, 10));
        assert_eq!(cell_origin(8, 10), (20, 20));
    }

    #[test]
    fn test_plan_groups_requires_nine() {
        let paths: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("{i}.png"))).collect();
        let err = plan_groups(paths, true, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, AppError::NotEnoughImages { found: 8, required: 9 }));
    }

    #[test]
    fn test_plan_groups_counts() {
        let paths: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("{i}.png"))).collect();

        let single = plan_groups(paths.clone(), false, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].len(), 9);

        let multi = plan_groups(paths.clone(), true, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(multi.len(), 2);

        // no image used twice
        let mut used: Vec<_> = multi.iter().flatten().collect();
        used.sort();
        used.dedup();
        assert_eq!(used.len(), 18);
    }

    #[test]
    fn test_plan_groups_seed_is_reproducible() {
        let paths: Vec<PathBuf> = (0..12).map(|i| PathBuf::from(format!("{i}.png"))).collect();
        let a = plan_groups(paths.clone(), false, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = plan_groups(paths, false, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_output_path_defaults() {
        let dir = Path::new("/pics");
        assert_eq!(grid_output_path(dir, None, 0, 1), PathBuf::from("/pics/grid9.jpg"));
        assert_eq!(grid_output_path(dir, None, 1, 3), PathBuf::from("/pics/grid9-2.jpg"));
    }

    #[test]
    fn test_output_path_explicit() {
        let dir = Path::new("/pics");
        let out = Path::new("/out/collage.png");
        assert_eq!(grid_output_path(dir, Some(out), 0, 1), PathBuf::from("/out/collage.png"));
        assert_eq!(
            grid_output_path(dir, Some(out), 2, 3),
            PathBuf::from("/out/collage-3.png")
        );
        assert_eq!(
            grid_output_path(dir, Some(Path::new("/out/collage")), 0, 2),
            PathBuf::from("/out/collage-1.jpg")
        );
    }

    #[test]
    fn test_output_path_unwritable_extension_gets_jpg() {
        let dir = Path::new("/pics");
        assert_eq!(
            grid_output_path(dir, Some(Path::new("/out/grid.gif")), 0, 1),
            PathBuf::from("/out/grid.gif.jpg")
        );
        assert_eq!(
            grid_output_path(dir, Some(Path::new("/out/grid")), 0, 1),
            PathBuf::from("/out/grid.jpg")
        );
        assert_eq!(
            grid_output_path(dir, Some(Path::new("/out/grid.PNG")), 0, 1),
            PathBuf::from("/out/grid.PNG")
        );
    }

    #[test]
    fn test_compose_grid_covers_each_cell() {
        let images: Vec<DynamicImage> = (0..9)
            .map(|i| {
                let v = (i * 25) as u8;
                DynamicImage::ImageRgb8(ImageBuffer::from_pixel(30, 10, Rgb([v, v, v])))
            })
            .collect();

        let canvas = compose_grid(&images, 8).unwrap();
        assert_eq!(canvas.dimensions(), (24, 24));

        for i in 0..9 {
            let (x, y) = cell_origin(i, 8);
            let v = (i * 25) as u8;
            // corners and centre of every cell come from its own image, no white bars
            for (dx, dy) in [(0, 0), (7, 0), (0, 7), (7, 7), (4, 4)] {
                let px = canvas.get_pixel(x + dx, y + dy);
                assert_eq!(px.0[..3], [v, v, v], "cell {} at ({}, {})", i, dx, dy);
            }
        }
    }

    #[test]
    fn test_build_single_grid() {
        let dir = TempDir::new().unwrap();
        fill_dir(dir.path(), 10);

        let mut opts = GridOptions::new(dir.path().to_path_buf());
        opts.cell_size = 5;
        opts.seed = Some(3);

        let written = build_grids(&opts).unwrap();
        assert_eq!(written, vec![dir.path().join("grid9.jpg")]);
        let out = image::open(&written[0]).unwrap();
        assert_eq!(out.dimensions(), (15, 15));
    }

    #[test]
    fn test_build_multi_grid_with_output() {
        let dir = TempDir::new().unwrap();
        fill_dir(dir.path(), 19);
        let out_dir = TempDir::new().unwrap();

        let mut opts = GridOptions::new(dir.path().to_path_buf());
        opts.cell_size = 4;
        opts.multi = true;
        opts.output = Some(out_dir.path().join("sets/grid.png"));

        let written = build_grids(&opts).unwrap();
        assert_eq!(
            written,
            vec![
                out_dir.path().join("sets/grid-1.png"),
                out_dir.path().join("sets/grid-2.png"),
            ]
        );
        assert!(written.iter().all(|p| p.is_file()));
    }

    #[test]
    fn test_not_enough_images() {
        let dir = TempDir::new().unwrap();
        fill_dir(dir.path(), 4);
        let err = build_grids(&GridOptions::new(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, AppError::NotEnoughImages { found: 4, .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_dir_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"x").unwrap();

        let err = build_grids(&GridOptions::new(file)).unwrap_err();
        assert!(matches!(err, AppError::NotADirectory { .. }));

        let err = build_grids(&GridOptions::new(dir.path().join("missing"))).unwrap_err();
        assert!(matches!(err, AppError::InputNotFound { .. }));
    }

    #[test]
    fn test_cell_size_bounds() {
        assert_eq!(canvas_side(1).unwrap(), 3);
        assert_eq!(canvas_side(MAX_CELL_SIZE).unwrap(), MAX_CELL_SIZE * 3);
        assert!(matches!(canvas_side(0), Err(AppError::InvalidArgument(_))));
        assert!(matches!(canvas_side(MAX_CELL_SIZE + 1), Err(AppError::InvalidArgument(_))));
        assert!(matches!(
            compose_grid(&[], 2_000_000_000),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_oversized_cell_rejected_before_decoding() {
        let dir = TempDir::new().unwrap();
        fill_dir(dir.path(), 9);
        let mut opts = GridOptions::new(dir.path().to_path_buf());
        opts.cell_size = u32::MAX;

        let err = build_grids(&opts).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(!dir.path().join("grid9.jpg").exists());
    }

    #[test]
    fn test_mislabelled_extension_still_decodes() {
        let dir = TempDir::new().unwrap();
        let paths = fill_dir(dir.path(), 9);
        // PNG bytes behind a .jpg name
        std::fs::rename(&paths[0], dir.path().join("img00.jpg")).unwrap();

        let mut opts = GridOptions::new(dir.path().to_path_buf());
        opts.cell_size = 4;
        opts.seed = Some(11);
        let written = build_grids(&opts).unwrap();
        assert_eq!(written.len(), 1);
    }
}
