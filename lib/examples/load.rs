use anyhow::{Context, Result};
use image::GenericImageView;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use padboard_ocr::{Config, Layout};

fn run() -> Result<()> {
    let path = std::env::args().nth(1).context("Usage: load SCREENSHOT")?;
    eprintln!("read image from {}", path);
    let mut img = image::open(&path)
        .with_context(|| format!("Failed to open {}", path))?
        .to_rgb8();

    let layout = Layout::locate(img.width(), img.height(), &Config::default())?;
    eprintln!("profile: {}", layout.profile);
    eprintln!("board area: {:?}", layout.board_area);
    eprintln!("cell size: {}", layout.cell_size);

    // draw the cells in the image
    let red = image::Rgb([255, 0, 0]);
    for cell in layout.cells() {
        let rect = Rect::at(cell.x as i32, cell.y as i32).of_size(cell.width, cell.height);
        draw_hollow_rect_mut(&mut img, rect, red);
    }
    img.save("screenshot.png")?;

    let r = layout.board_area;
    img.view(r.x, r.y, r.width, r.height)
        .to_image()
        .save("board.png")?;
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
    }
}
