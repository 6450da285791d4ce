//! A library that reads the orb board of a Puzzle & Dragons screenshot
//!
//! The board is located from the shape of the screenshot and cut into 5 x 6 cells. Every cell is classified
//! twice: by template matching against a library of reference orb images, and by looking up the colour at
//! the cell center in a colour table. The template matching board is the authoritative result, it is
//! encoded as a string of orb codes that the Puzzled and padsim board visualizers understand.
//!
//! # Basic usage
//! ```no_run
//! # use padboard_ocr::{Config, Engine, Error};
//! let engine = Engine::new(Config::default());
//! let screenshot = std::fs::read("tests/screenshot.png")?;
//! let result = engine.classify(&screenshot)?;
//! println!("{}", result.links(engine.config()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//! This example would print two links with the same board string, like:
//!
//! ```text
//! https://candyninja001.github.io/Puzzled/?patt=rbgldhrbgldhjxrbgldhrbgldhrbgl
//! https://storage.googleapis.com/mirubot/websites/padsim/index.html?patt=rbgldhrbgldhjxrbgldhrbgldhrbgl
//! ```
//!
//! The template library and colour table can be replaced while the engine is in use, see
//! [Engine::reload_templates] and [Engine::reload_color_table].

mod board;
mod color_table;
mod config;
mod engine;
mod error;
mod layout;
mod orb;
mod recognizer;
mod templates;
mod utils;

pub use board::{Board, BoardLinks};
pub use color_table::{ColorTable, Hsv};
pub use config::Config;
pub use engine::Engine;
pub use error::Error;
pub use layout::{BoardProfile, Cell, Layout, COLS, ROWS};
pub use orb::OrbType;
pub use recognizer::{
    recognize, sample, CellStat, CellStats, ColorClassifier, Recognition, SimilarityClassifier,
};
pub use templates::{persist_bundle, BundleEntry, Template, TemplateLibrary};
pub use utils::{collage, save_templates};
