//! Engine configuration.
//!
//! All thresholds and the colour sampling window are tunables with documented defaults. A config can be read
//! from a JSON file where every field is optional.

use crate::layout::BoardProfile;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_DIR: &str = "data/padboard";
pub const ORB_IMAGES_DIR: &str = "orb_images";
pub const PIXEL_FILE: &str = "pixel_data/hsv_pixels_to_orb.json";

pub const DAWNGLARE_BOARD_TEMPLATE: &str = "https://candyninja001.github.io/Puzzled/?patt={}";
pub const MIRUGLARE_BOARD_TEMPLATE: &str =
    "https://storage.googleapis.com/mirubot/websites/padsim/index.html?patt={}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the template library: one subdirectory per orb type
    pub template_dir: PathBuf,
    /// The colour lookup table file
    pub color_table_path: PathBuf,
    /// Write reloaded data to `template_dir` and `color_table_path`
    pub persist_reloads: bool,
    /// A cell whose best template match error is above this value is [Unknown](crate::OrbType::Unknown)
    pub max_match_error: f32,
    /// Fraction of the cell size trimmed from every side before template matching
    pub cell_inset: f32,
    /// Side of the central colour sampling window, as a fraction of the cell size
    pub color_sample_window: f32,
    /// Maximum difference between the screenshot aspect ratio and a profile aspect ratio
    pub aspect_tolerance: f32,
    /// Smallest accepted cell size in pixels
    pub min_cell_size: u32,
    /// Supported screen layouts, tried in order
    pub profiles: Vec<BoardProfile>,
    /// Visualizer link templates, `{}` is replaced by the board string
    pub dawnglare_url: String,
    pub miruglare_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Config::with_data_dir(DATA_DIR)
    }
}

impl Config {
    /// Default configuration with both data paths below `dir`.
    pub fn with_data_dir<P: AsRef<Path>>(dir: P) -> Config {
        let dir = dir.as_ref();
        Config {
            template_dir: dir.join(ORB_IMAGES_DIR),
            color_table_path: dir.join(PIXEL_FILE),
            persist_reloads: true,
            max_match_error: 0.25,
            cell_inset: 0.1,
            color_sample_window: 0.2,
            aspect_tolerance: 0.03,
            min_cell_size: 8,
            profiles: BoardProfile::defaults(),
            dawnglare_url: String::from(DAWNGLARE_BOARD_TEMPLATE),
            miruglare_url: String::from(MIRUGLARE_BOARD_TEMPLATE),
        }
    }

    /// Read a JSON config file. Missing fields take their default value.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
        let path = path.as_ref();
        let config_error = |reason: String| Error::Config {
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| config_error(e.to_string()))
    }
}
