//! The board recognition engine and its replaceable reference data.
//!
//! The template library and the colour table are immutable snapshots behind two independent atomic pointers.
//! A classification loads each pointer once, so it sees either the old or the new snapshot of a resource,
//! never a mixture. A reload builds and validates a complete new snapshot before it is published, a failed
//! reload leaves the active snapshot untouched.

use crate::color_table::ColorTable;
use crate::config::Config;
use crate::recognizer::{recognize, Recognition};
use crate::templates::{persist_bundle, TemplateLibrary};
use crate::Error;
use arc_swap::{ArcSwap, ArcSwapOption};
use image::RgbImage;
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Puzzle & Dragons board recognizer
pub struct Engine {
    config: Config,
    templates: ArcSwap<TemplateLibrary>,
    color_table: ArcSwapOption<ColorTable>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(Config::default())
    }
}

impl Engine {
    /// Create an engine and load the reference data from the configured paths.
    ///
    /// A resource that fails to load is logged and left empty. Without templates [Engine::classify] fails
    /// until templates are reloaded, without a colour table the colour board is all Unknown.
    pub fn new(config: Config) -> Engine {
        let templates = TemplateLibrary::load_dir(&config.template_dir).unwrap_or_else(|e| {
            warn!("starting without templates: {}", e);
            TemplateLibrary::default()
        });
        let color_table = match ColorTable::load(&config.color_table_path) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("starting without colour table: {}", e);
                None
            }
        };
        Engine::with_data(config, templates, color_table)
    }

    pub fn with_data(
        config: Config,
        templates: TemplateLibrary,
        color_table: Option<ColorTable>,
    ) -> Engine {
        Engine {
            config,
            templates: ArcSwap::from_pointee(templates),
            color_table: ArcSwapOption::from_pointee(color_table),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The active template library snapshot.
    pub fn templates(&self) -> Arc<TemplateLibrary> {
        self.templates.load_full()
    }

    /// The active colour table snapshot, if any.
    pub fn color_table(&self) -> Option<Arc<ColorTable>> {
        self.color_table.load_full()
    }

    /// Recognize the board in an encoded screenshot (png, jpeg or pnm).
    ///
    /// # Errors
    /// * [Error::ImageDecode] if the bytes are not a supported image
    /// * [Error::BoardNotFound] if the screenshot does not have a supported shape
    /// * [Error::TemplatesUnavailable] if no templates are loaded
    pub fn classify(&self, screenshot: &[u8]) -> Result<Recognition, Error> {
        let img = image::load_from_memory(screenshot)
            .map_err(Error::ImageDecode)?
            .to_rgb8();
        self.classify_image(&img)
    }

    pub fn classify_image(&self, screenshot: &RgbImage) -> Result<Recognition, Error> {
        let templates = self.templates.load_full();
        let color_table = self.color_table.load_full();
        recognize(
            screenshot,
            &templates,
            color_table.as_deref(),
            &self.config,
        )
    }

    pub fn classify_file<P: AsRef<Path>>(&self, path: P) -> Result<Recognition, Error> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::Screenshot {
            path: path.to_path_buf(),
            source,
        })?;
        self.classify(&bytes)
    }

    /// Replace the template library with the templates in a zip bundle.
    ///
    /// Returns the number of templates in the new library.
    /// # Errors
    /// * [Error::ReloadValidation] if the bundle is corrupt or has no templates
    /// * [Error::Persist] if the bundle can not be saved to the template directory
    pub fn reload_templates(&self, bundle: &[u8]) -> Result<usize, Error> {
        let (library, entries) = TemplateLibrary::from_bundle(bundle)?;
        if library.is_empty() {
            return Err(Error::ReloadValidation(String::from(
                "bundle contains no templates",
            )));
        }
        if self.config.persist_reloads {
            persist_bundle(&self.config.template_dir, &entries)?;
        }
        Ok(self.publish_templates(library))
    }

    /// Replace the template library with a template directory.
    pub fn reload_templates_from_dir<P: AsRef<Path>>(&self, dir: P) -> Result<usize, Error> {
        let library = TemplateLibrary::load_dir(dir)?;
        if library.is_empty() {
            return Err(Error::ReloadValidation(String::from(
                "directory contains no templates",
            )));
        }
        Ok(self.publish_templates(library))
    }

    fn publish_templates(&self, library: TemplateLibrary) -> usize {
        let count = library.len();
        info!("activating {} templates {:?}", count, library.counts());
        self.templates.store(Arc::new(library));
        count
    }

    /// Replace the colour table with a table file.
    ///
    /// Returns the number of entries in the new table.
    /// # Errors
    /// * [Error::ReloadValidation] if the table is invalid or empty
    /// * [Error::Persist] if the table can not be saved
    pub fn reload_color_table(&self, table: &[u8]) -> Result<usize, Error> {
        let color_table = ColorTable::from_slice(table)?;
        if self.config.persist_reloads {
            write_file(&self.config.color_table_path, table)?;
        }
        Ok(self.publish_color_table(color_table))
    }

    pub fn reload_color_table_from_file<P: AsRef<Path>>(&self, path: P) -> Result<usize, Error> {
        let color_table = ColorTable::load(path)?;
        if color_table.is_empty() {
            return Err(Error::ReloadValidation(String::from(
                "colour table has no entries",
            )));
        }
        Ok(self.publish_color_table(color_table))
    }

    fn publish_color_table(&self, color_table: ColorTable) -> usize {
        let count = color_table.len();
        info!("activating colour table with {} entries", count);
        self.color_table.store(Some(Arc::new(color_table)));
        count
    }

    /// Download a template bundle and reload the templates from it.
    pub async fn download_templates(&self, url: &str) -> Result<usize, Error> {
        let bundle = download(url).await?;
        self.reload_templates(&bundle)
    }

    /// Download a colour table file and reload the colour table from it.
    pub async fn download_color_table(&self, url: &str) -> Result<usize, Error> {
        let table = download(url).await?;
        self.reload_color_table(&table)
    }
}

async fn download(url: &str) -> Result<Vec<u8>, Error> {
    info!("downloading {}", url);
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(Error::DownloadStatus {
            url: String::from(url),
            status: response.status().as_u16(),
        });
    }
    let bytes = response.bytes().await?;
    info!("downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Write `data` to a temporary file next to `path`, then rename it over `path`.
fn write_file(path: &Path, data: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
