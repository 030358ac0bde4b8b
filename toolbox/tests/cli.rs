//! End-to-end runs of the `toolbox` binary: exit codes and files on disk.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn toolbox(log_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_toolbox"))
        .args(args)
        .env("TOOLBOX_LOG_DIR", log_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run toolbox")
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn compress_missing_input_exits_1() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.jpg");
    let out = toolbox(dir.path(), &["compress", "-i", path_str(&missing)]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("nope.jpg"));
    // the user message is the only error text on the console
    assert!(!stderr.contains("ERROR"), "{}", stderr);
    assert!(!stderr.contains("Command failed"), "{}", stderr);
}

#[test]
fn compress_single_png_with_height_short_flag() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("big.png");
    image::RgbImage::from_pixel(80, 40, image::Rgb([10, 120, 200]))
        .save(&input)
        .unwrap();

    let out = toolbox(
        dir.path(),
        &["compress", "-i", path_str(&input), "-h", "20", "-q", "500"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let compressed = image::open(dir.path().join("big-compressed.png")).unwrap();
    assert_eq!((compressed.width(), compressed.height()), (40, 20));
}

#[test]
fn word_images_rejects_non_zip_with_exit_2() {
    let dir = TempDir::new().unwrap();
    let doc = dir.path().join("old.doc");
    std::fs::write(&doc, b"\xd0\xcf\x11\xe0 legacy").unwrap();

    let out = toolbox(
        dir.path(),
        &["word-images", "-i", path_str(&doc), "-o", path_str(&dir.path().join("media"))],
    );
    assert_eq!(out.status.code(), Some(2));
    assert!(!dir.path().join("media").exists());
}

#[test]
fn word_images_exports_media() {
    let dir = TempDir::new().unwrap();
    let docx = dir.path().join("doc.docx");
    {
        let mut zip = ZipWriter::new(std::fs::File::create(&docx).unwrap());
        let options = SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(b"<w:document/>").unwrap();
        zip.start_file("word/media/image1.png", options).unwrap();
        zip.write_all(b"not really a png").unwrap();
        zip.finish().unwrap();
    }

    let media = dir.path().join("media");
    let out = toolbox(
        dir.path(),
        &["word-images", "-i", path_str(&docx), "-o", path_str(&media)],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        std::fs::read(media.join("image1.png")).unwrap(),
        b"not really a png"
    );
    assert!(String::from_utf8_lossy(&out.stdout).contains("Exported: image1.png"));
}

#[test]
fn grid9_with_too_few_images_exits_1() {
    let dir = TempDir::new().unwrap();
    for i in 0..3 {
        image::RgbImage::from_pixel(8, 8, image::Rgb([i * 50, 0, 0]))
            .save(dir.path().join(format!("{}.png", i)))
            .unwrap();
    }
    let out = toolbox(dir.path(), &["grid9", "-d", path_str(dir.path())]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("grid9.jpg").exists());
}

#[test]
fn grid9_zero_size_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let out = toolbox(dir.path(), &["grid9", "-d", path_str(dir.path()), "-s", "0"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn qrcode_margin_above_limit_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let out = toolbox(
        dir.path(),
        &["qrcode", "-t", "x", "-o", path_str(&dir.path().join("q.png")), "--margin", "2147483647"],
    );
    assert_eq!(out.status.code(), Some(2));
    assert!(!dir.path().join("q.png").exists());
}

#[test]
fn qrcode_writes_exact_size_png() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("qr.png");
    let out = toolbox(
        dir.path(),
        &[
            "qrcode", "-t", "https://example.com", "-o", path_str(&output), "-s", "300",
            "--ecc", "q",
        ],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let img = image::open(&output).unwrap();
    assert_eq!((img.width(), img.height()), (300, 300));
}

#[test]
fn convert_with_missing_ffmpeg_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("clip.mov");
    std::fs::write(&input, b"x").unwrap();

    let out = toolbox(
        dir.path(),
        &[
            "convert", "-i", path_str(&input), "-F", path_str(&dir.path().join("no-ffmpeg")),
        ],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("clip.mp4").exists());
}
