use crate::board::Board;
use crate::layout::Cell;
use crate::orb::OrbType;
use image::imageops::{resize, FilterType};
use image::{GenericImage, ImageBuffer, RgbImage};
use log::info;
use std::fs;
use std::io;
use std::path::Path;

/// Create a collage of cells, `ncols` cells per row.
///
/// Cells of a different size than the first cell are resized to match it.
pub fn collage(cells: &[Cell], ncols: u32) -> RgbImage {
    if cells.is_empty() || ncols == 0 {
        return RgbImage::new(0, 0);
    }
    let ncols = ncols.min(cells.len() as u32);
    let nrows = (cells.len() as u32 + ncols - 1) / ncols;
    let (w, h) = cells[0].image.dimensions();
    let mut collage: RgbImage = ImageBuffer::new(w * ncols, h * nrows);
    for (i, cell) in cells.iter().enumerate() {
        let (row, col) = (i as u32 / ncols, i as u32 % ncols);
        let mut dest = collage.sub_image(col * w, row * h, w, h);
        let resized;
        let src = if cell.image.dimensions() != (w, h) {
            resized = resize(&cell.image, w, h, FilterType::Lanczos3);
            &resized
        } else {
            &cell.image
        };
        // sizes match, so copy_from can not fail
        let _ = dest.copy_from(src, 0, 0);
    }
    collage
}

/// Save cells as templates, in the template directory layout: one subdirectory per orb type.
///
/// `board` tells the orb type of every cell, typically a corrected recognition result. Unknown cells and
/// existing files are skipped. Files are named `<prefix>_<row><col>.png`. Returns the number of saved templates.
pub fn save_templates<P: AsRef<Path>>(
    savedir: P,
    cells: &[Cell],
    board: &Board,
    prefix: &str,
) -> io::Result<usize> {
    let mut saved = 0;
    for cell in cells {
        let orb = board.get(cell.row, cell.col).unwrap_or(OrbType::Unknown);
        if orb == OrbType::Unknown {
            continue;
        }
        let dir = savedir.as_ref().join(orb.name());
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}_{}{}.png", prefix, cell.row, cell.col));
        if !path.exists() {
            info!("save {}", path.display());
            cell.image
                .save(&path)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            saved += 1;
        }
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{COLS, ROWS};
    use image::Rgb;

    fn cells(size: u32) -> Vec<Cell> {
        (0..ROWS * COLS)
            .map(|i| Cell {
                row: i / COLS,
                col: i % COLS,
                image: RgbImage::from_pixel(size, size, Rgb([i as u8, 0, 0])),
            })
            .collect()
    }

    #[test]
    fn test_collage() {
        let cells = cells(4);
        let img = collage(&cells, COLS as u32);
        assert_eq!(img.dimensions(), (24, 20));
        assert_eq!(img.get_pixel(4, 0).0, [1, 0, 0]);
        assert_eq!(img.get_pixel(0, 4).0, [6, 0, 0]);
        assert_eq!(collage(&[], 6).dimensions(), (0, 0));
    }

    #[test]
    fn test_save_templates() {
        let tmp = tempfile::tempdir().unwrap();
        let mut board = Board::new();
        board.set(0, 1, OrbType::Fire);
        board.set(4, 5, OrbType::Bomb);
        let cells = cells(4);
        assert_eq!(save_templates(tmp.path(), &cells, &board, "shot").unwrap(), 2);
        assert!(tmp.path().join("fire").join("shot_01.png").exists());
        assert!(tmp.path().join("bomb").join("shot_45.png").exists());
        // existing files are kept
        assert_eq!(save_templates(tmp.path(), &cells, &board, "shot").unwrap(), 0);
    }
}
