use crate::config::Config;
use crate::error::Error;
use image::{math::Rect, GenericImageView, RgbImage};
use log::debug;
use serde::{Deserialize, Serialize};

/// Number of board rows
pub const ROWS: usize = 5;
/// Number of board columns
pub const COLS: usize = 6;

/// Where the board sits in a screenshot of a given shape.
///
/// The board spans the screenshot width minus the side margins, its cells are square, and its bottom edge is
/// `bottom` (a fraction of the screenshot height) above the bottom of the screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardProfile {
    pub name: String,
    /// Screenshot height divided by width
    pub aspect: f32,
    /// Left margin as a fraction of the width
    pub left: f32,
    /// Right margin as a fraction of the width
    pub right: f32,
    /// Bottom margin as a fraction of the height
    pub bottom: f32,
}

impl BoardProfile {
    pub fn new(name: &str, aspect: f32, left: f32, right: f32, bottom: f32) -> BoardProfile {
        BoardProfile {
            name: String::from(name),
            aspect,
            left,
            right,
            bottom,
        }
    }

    /// The built-in profiles: a pre-cropped board and the common phone and tablet screens.
    pub fn defaults() -> Vec<BoardProfile> {
        vec![
            BoardProfile::new("board", ROWS as f32 / COLS as f32, 0.0, 0.0, 0.0),
            BoardProfile::new("4:3", 4. / 3., 0.09, 0.09, 0.0),
            BoardProfile::new("16:9", 16. / 9., 0.0, 0.0, 0.0),
            BoardProfile::new("18:9", 2.0, 0.0, 0.0, 0.02),
            BoardProfile::new("19.5:9", 19.5 / 9., 0.0, 0.0, 0.04),
        ]
    }
}

/// A single board cell cut from the screenshot.
#[derive(Debug, Clone)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub image: RgbImage,
}

impl Cell {
    /// The linear cell index (0.. ROWS * COLS)
    pub fn index(&self) -> usize {
        self.row * COLS + self.col
    }
}

/// Represents the located board in a screenshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// The screen area (the entire screenshot)
    pub screen: Rect,
    /// The board area (a 5 x 6 grid)
    pub board_area: Rect,
    /// Width and height of a cell
    pub cell_size: u32,
    /// Name of the matching [BoardProfile]
    pub profile: String,
}

impl Layout {
    /// Locate the board in a `width` x `height` screenshot.
    ///
    /// Picks the profile with the aspect ratio closest to the screenshot, within `config.aspect_tolerance`.
    /// # Errors
    /// [Error::BoardNotFound] if no profile matches or the resulting board does not fit.
    pub fn locate(width: u32, height: u32, config: &Config) -> Result<Layout, Error> {
        let not_found = Error::BoardNotFound { width, height };
        if width == 0 || height == 0 {
            return Err(not_found);
        }
        let aspect = height as f32 / width as f32;
        let profile = config
            .profiles
            .iter()
            .map(|p| (p, (p.aspect - aspect).abs()))
            .filter(|&(_, diff)| diff <= config.aspect_tolerance)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(p, _)| p);
        let profile = match profile {
            Some(profile) => profile,
            None => {
                debug!("no profile for aspect ratio {:.3}", aspect);
                return Err(not_found);
            }
        };

        let left = (profile.left * width as f32).round() as u32;
        let right = (profile.right * width as f32).round() as u32;
        let board_width = width.saturating_sub(left + right);
        let cell_size = board_width / COLS as u32;
        if cell_size < config.min_cell_size.max(1) {
            debug!("cell size {} too small for profile {}", cell_size, profile.name);
            return Err(not_found);
        }
        let board_height = cell_size * ROWS as u32;
        let bottom = height.saturating_sub((profile.bottom * height as f32).round() as u32);
        if board_height > bottom {
            debug!("board does not fit in profile {}", profile.name);
            return Err(not_found);
        }
        let board_area = Rect {
            x: left,
            y: bottom - board_height,
            width: cell_size * COLS as u32,
            height: board_height,
        };
        debug!("profile {} board area {:?}", profile.name, board_area);
        Ok(Layout {
            screen: Rect {
                x: 0,
                y: 0,
                width,
                height,
            },
            board_area,
            cell_size,
            profile: profile.name.clone(),
        })
    }

    /// Create the cell bounding rectangles, row-major starting top-left.
    ///
    /// All cells have the same width and height.
    pub fn cells(&self) -> Vec<Rect> {
        let mut cells = Vec::with_capacity(ROWS * COLS);
        let size = self.cell_size;
        for row in 0..ROWS as u32 {
            for col in 0..COLS as u32 {
                cells.push(Rect {
                    x: self.board_area.x + col * size,
                    y: self.board_area.y + row * size,
                    width: size,
                    height: size,
                });
            }
        }
        cells
    }

    /// Cut the cells out of `img`, which must be the screenshot this layout was located in.
    pub fn segment(&self, img: &RgbImage) -> Result<Vec<Cell>, Error> {
        if img.dimensions() != (self.screen.width, self.screen.height) {
            return Err(Error::BoardNotFound {
                width: img.width(),
                height: img.height(),
            });
        }
        let cells = self
            .cells()
            .into_iter()
            .enumerate()
            .map(|(i, r)| Cell {
                row: i / COLS,
                col: i % COLS,
                image: img.view(r.x, r.y, r.width, r.height).to_image(),
            })
            .collect();
        Ok(cells)
    }
}

/// Shrink `rect` by `fraction` of its size on every side. Never returns an empty rect.
pub fn inset(rect: Rect, fraction: f32) -> Rect {
    let dx = ((rect.width as f32 * fraction).round() as u32).min(rect.width.saturating_sub(1) / 2);
    let dy = ((rect.height as f32 * fraction).round() as u32).min(rect.height.saturating_sub(1) / 2);
    Rect {
        x: rect.x + dx,
        y: rect.y + dy,
        width: rect.width - 2 * dx,
        height: rect.height - 2 * dy,
    }
}

/// A centered square window with side `fraction` of the smaller rect side, at least one pixel.
pub fn center_window(rect: Rect, fraction: f32) -> Rect {
    let side = rect.width.min(rect.height);
    let size = ((side as f32 * fraction).round() as u32).max(1).min(side);
    Rect {
        x: rect.x + (rect.width - size) / 2,
        y: rect.y + (rect.height - size) / 2,
        width: size,
        height: size,
    }
}
