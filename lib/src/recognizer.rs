use crate::board::{Board, BoardLinks};
use crate::color_table::{ColorTable, Hsv};
use crate::config::Config;
use crate::layout::{center_window, inset, Cell, Layout};
use crate::orb::OrbType;
use crate::templates::TemplateLibrary;
use crate::Error;
use image::imageops::{resize, FilterType};
use image::math::Rect;
use image::{GenericImageView, GrayImage, Rgb, RgbImage};
use imageproc::map::{blue_channel, green_channel, red_channel};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use log::debug;
use std::collections::HashMap;
use std::thread;

/// Results for a single cell of the similarity classifier
#[derive(Debug, Clone, PartialEq)]
pub struct CellStat {
    /// The linear cell index (0.. ROWS * COLS)
    pub index: usize,
    /// The classified orb type
    pub orb: OrbType,
    /// File name of the best matching template, if there are templates
    pub template: Option<String>,
    /// The match error of the best matching template
    pub error: f32,
}

/// A list of [CellStat]. Can be used to analyze the accuracy of template matching.
pub type CellStats = Vec<CellStat>;

/// Holds the result of recognizing a screenshot: the board from both classifiers.
#[derive(Debug, Clone)]
pub struct Recognition {
    /// The board from template matching. This is the authoritative result.
    pub board: Board,
    /// The board from colour lookup, for diagnostics
    pub color_board: Board,
    /// Stats for template matching
    pub stats: CellStats,
    /// Board area bounding rectangle
    pub board_area: Rect,
    /// Name of the screen profile the board was located with
    pub profile: String,
}

impl Recognition {
    /// The authoritative board, encoded for the visualizers.
    pub fn encoded(&self) -> String {
        self.board.encode()
    }

    pub fn links(&self, config: &Config) -> BoardLinks {
        BoardLinks::new(&self.encoded(), config)
    }

    /// Whether both classifiers produced the same board.
    pub fn agrees(&self) -> bool {
        self.board == self.color_board
    }

    /// Cells where the classifiers disagree, as (row, col, similarity, colour).
    pub fn disagreements(&self) -> Vec<(usize, usize, OrbType, OrbType)> {
        self.board.diff(&self.color_board)
    }
}

/// Split an image in its red, green and blue planes.
pub(crate) fn planes(img: &RgbImage) -> [GrayImage; 3] {
    [red_channel(img), green_channel(img), blue_channel(img)]
}

fn full_rect(img: &RgbImage) -> Rect {
    Rect {
        x: 0,
        y: 0,
        width: img.width(),
        height: img.height(),
    }
}

/// Classifies cells by the best matching template.
pub struct SimilarityClassifier<'a> {
    library: &'a TemplateLibrary,
    max_error: f32,
    inset: f32,
}

impl<'a> SimilarityClassifier<'a> {
    pub fn new(library: &'a TemplateLibrary, config: &Config) -> SimilarityClassifier<'a> {
        SimilarityClassifier {
            library,
            max_error: config.max_match_error,
            inset: config.cell_inset,
        }
    }

    pub fn classify(&self, cells: &[Cell]) -> (Board, CellStats) {
        let stats: CellStats = cells.iter().map(|cell| self.classify_cell(cell)).collect();
        let mut board = Board::new();
        for (cell, stat) in cells.iter().zip(stats.iter()) {
            board[cell.row][cell.col] = stat.orb;
        }
        (board, stats)
    }

    /// Match the cell against every template in library order.
    ///
    /// The first template with the lowest error wins. The cell is Unknown if that error is above the
    /// configured maximum.
    pub fn classify_cell(&self, cell: &Cell) -> CellStat {
        let area = inset(full_rect(&cell.image), self.inset);
        let area = cell.image.view(area.x, area.y, area.width, area.height).to_image();
        // cell planes resized to each template size
        let mut resized: HashMap<(u32, u32), [GrayImage; 3]> = HashMap::new();
        let mut best: Option<(&str, OrbType, f32)> = None;
        for template in self.library.iter() {
            let size = template.image().dimensions();
            let cell_planes = resized
                .entry(size)
                .or_insert_with(|| planes(&resize(&area, size.0, size.1, FilterType::Triangle)));
            let error = match_error(cell_planes, template.planes());
            if best.map_or(true, |(_, _, best_error)| error < best_error) {
                best = Some((&template.name, template.orb, error));
            }
        }
        let index = cell.index();
        match best {
            Some((name, nearest, error)) => {
                let orb = if error <= self.max_error {
                    nearest
                } else {
                    OrbType::Unknown
                };
                debug!("cell {} best {} ({}) error {:.4}", index, name, nearest, error);
                CellStat {
                    index,
                    orb,
                    template: Some(String::from(name)),
                    error,
                }
            }
            None => CellStat {
                index,
                orb: OrbType::Unknown,
                template: None,
                error: f32::INFINITY,
            },
        }
    }
}

/// Squared error summed over the three colour planes, normalized by `sqrt(ΣI² · ΣT²)` over all planes.
///
/// A black plane in the template or the cell adds its squared error, but never makes the error unbounded
/// on its own. Two black images are a perfect match, black against a colour never matches.
fn match_error(cell: &[GrayImage; 3], template: &[GrayImage; 3]) -> f32 {
    let method = MatchTemplateMethod::SumOfSquaredErrors;
    let sse: f64 = cell
        .iter()
        .zip(template.iter())
        .map(|(image, template)| find_extremes(&match_template(image, template, method)).min_value as f64)
        .sum();
    let norm = (sum_of_squares(cell) * sum_of_squares(template)).sqrt();
    if norm > 0.0 {
        (sse / norm) as f32
    } else if sse == 0.0 {
        0.0
    } else {
        f32::INFINITY
    }
}

fn sum_of_squares(planes: &[GrayImage; 3]) -> f64 {
    planes
        .iter()
        .flat_map(|plane| plane.pixels())
        .map(|p| {
            let v = p[0] as f64;
            v * v
        })
        .sum()
}

/// Classifies cells by looking up the colour at the cell center in the colour table.
pub struct ColorClassifier<'a> {
    table: Option<&'a ColorTable>,
    window: f32,
}

impl<'a> ColorClassifier<'a> {
    /// Without a table every cell is Unknown.
    pub fn new(table: Option<&'a ColorTable>, config: &Config) -> ColorClassifier<'a> {
        ColorClassifier {
            table,
            window: config.color_sample_window,
        }
    }

    pub fn classify(&self, cells: &[Cell]) -> Board {
        let mut board = Board::new();
        if let Some(table) = self.table {
            for cell in cells {
                let hsv = Hsv::from_rgb(sample(&cell.image, self.window));
                board[cell.row][cell.col] = table.lookup(hsv);
            }
        }
        board
    }
}

/// The mean colour of a centered window with side `window` times the image size.
pub fn sample(img: &RgbImage, window: f32) -> Rgb<u8> {
    let area = center_window(full_rect(img), window);
    let mut sum = [0u64; 3];
    for y in area.y..area.y + area.height {
        for x in area.x..area.x + area.width {
            let p = img.get_pixel(x, y);
            for c in 0..3 {
                sum[c] += p[c] as u64;
            }
        }
    }
    let n = (area.width as u64 * area.height as u64).max(1);
    Rgb([
        ((sum[0] + n / 2) / n) as u8,
        ((sum[1] + n / 2) / n) as u8,
        ((sum[2] + n / 2) / n) as u8,
    ])
}

/// Recognize the board in a screenshot with the given template library and colour table.
///
/// The recognition process consists of these phases:
/// 1. Locate the board from the screenshot dimensions and cut it into cells
/// 2. Classify the cells with template matching, and in parallel with the colour table
///
/// # Errors
/// * [Error::TemplatesUnavailable] if the library is empty
/// * [Error::BoardNotFound] if the screenshot does not have a supported shape
pub fn recognize(
    screenshot: &RgbImage,
    library: &TemplateLibrary,
    table: Option<&ColorTable>,
    config: &Config,
) -> Result<Recognition, Error> {
    if library.is_empty() {
        return Err(Error::TemplatesUnavailable);
    }
    let layout = Layout::locate(screenshot.width(), screenshot.height(), config)?;
    let cells = layout.segment(screenshot)?;

    let (color_board, (board, stats)) = thread::scope(|s| {
        let color = s.spawn(|| ColorClassifier::new(table, config).classify(&cells));
        let similarity = SimilarityClassifier::new(library, config).classify(&cells);
        (
            color
                .join()
                .unwrap_or_else(|e| std::panic::resume_unwind(e)),
            similarity,
        )
    });

    Ok(Recognition {
        board,
        color_board,
        stats,
        board_area: layout.board_area,
        profile: layout.profile,
    })
}
