use anyhow::{Context, Result};
use padboard_ocr::{collage, Config, Layout, COLS};

fn run() -> Result<()> {
    let path = std::env::args().nth(1).context("Usage: collage SCREENSHOT")?;

    let img = image::open(&path)
        .with_context(|| format!("Failed to open {}", path))?
        .to_rgb8();
    eprintln!("read image from {}", path);
    let layout = Layout::locate(img.width(), img.height(), &Config::default())?;
    let cells = layout.segment(&img)?;

    let collage = collage(&cells, COLS as u32);
    collage.save("collage.png")?;

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:?}", err);
    }
}
