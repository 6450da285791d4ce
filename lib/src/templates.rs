use crate::orb::OrbType;
use crate::recognizer::planes;
use crate::Error;
use image::{GrayImage, ImageFormat, RgbImage};
use log::{info, warn};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// Largest template image accepted from a bundle, in bytes.
pub const MAX_TEMPLATE_BYTES: u64 = 8 << 20;

/// A reference image of a single orb type.
#[derive(Debug, Clone)]
pub struct Template {
    pub orb: OrbType,
    /// File name the template was loaded from
    pub name: String,
    image: RgbImage,
    planes: [GrayImage; 3],
}

impl Template {
    pub fn new(orb: OrbType, name: &str, image: RgbImage) -> Template {
        let planes = planes(&image);
        Template {
            orb,
            name: String::from(name),
            image,
            planes,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// The red, green and blue planes of the image
    pub fn planes(&self) -> &[GrayImage; 3] {
        &self.planes
    }
}

/// A raw template file from a bundle, kept so it can be written to disk unchanged.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub orb: OrbType,
    pub name: String,
    pub data: Vec<u8>,
}

/// An immutable snapshot of the template library.
///
/// Templates are ordered by orb type in [OrbType::ALL] order, and by file name within a type.
/// The similarity classifier prefers the earlier template when two match equally well.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    /// Build a library from templates of the same type in their intended order.
    /// Empty templates and templates labelled [OrbType::Unknown] are dropped.
    pub fn from_templates(templates: Vec<Template>) -> TemplateLibrary {
        let mut templates: Vec<Template> = templates
            .into_iter()
            .filter(|t| {
                let (w, h) = t.image.dimensions();
                let usable = t.orb != OrbType::Unknown && w > 0 && h > 0;
                if !usable {
                    warn!("dropping template {} ({}, {}x{})", t.name, t.orb, w, h);
                }
                usable
            })
            .collect();
        // stable: keeps the order within a type
        templates.sort_by_key(|t| t.orb);
        TemplateLibrary { templates }
    }

    /// Load a template directory: one subdirectory per orb type, named after the type.
    ///
    /// Subdirectories that do not name an orb type, loose files and files that are not images are skipped.
    /// # Errors
    /// [Error::Load] if the directory can not be read or an image can not be decoded.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<TemplateLibrary, Error> {
        let dir = dir.as_ref();
        let mut templates = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| Error::load(dir, e))? {
            let path = entry.map_err(|e| Error::load(dir, e))?.path();
            if !path.is_dir() {
                warn!("skipping {}: not a directory", path.display());
                continue;
            }
            let orb = match dir_orb(&path) {
                Some(orb) => orb,
                None => {
                    warn!("skipping {}: not an orb type", path.display());
                    continue;
                }
            };
            let mut files: Vec<PathBuf> = fs::read_dir(&path)
                .map_err(|e| Error::load(&path, e))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_template_file(p))
                .collect();
            files.sort();
            for file in files {
                let data = fs::read(&file).map_err(|e| Error::load(&file, e))?;
                let image = image::load_from_memory(&data)
                    .map_err(|e| Error::load(&file, e))?
                    .to_rgb8();
                templates.push(Template::new(orb, &file_name(&file), image));
            }
        }
        let library = TemplateLibrary::from_templates(templates);
        info!(
            "loaded {} templates from {}",
            library.len(),
            dir.display()
        );
        Ok(library)
    }

    /// Build a library from a zip bundle with `<orb type>/<image>` entries.
    ///
    /// Returns the library and the raw entries it was built from.
    /// # Errors
    /// [Error::ReloadValidation] if the archive is corrupt or an image can not be decoded.
    pub fn from_bundle(bytes: &[u8]) -> Result<(TemplateLibrary, Vec<BundleEntry>), Error> {
        let entries = read_bundle(bytes)?;
        let mut templates = Vec::with_capacity(entries.len());
        for entry in entries.iter() {
            let image = image::load_from_memory(&entry.data)
                .map_err(|e| {
                    Error::ReloadValidation(format!("{}/{}: {}", entry.orb, entry.name, e))
                })?
                .to_rgb8();
            templates.push(Template::new(entry.orb, &entry.name, image));
        }
        Ok((TemplateLibrary::from_templates(templates), entries))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn count(&self, orb: OrbType) -> usize {
        self.templates.iter().filter(|t| t.orb == orb).count()
    }

    /// Number of templates per orb type, for every type that has templates.
    pub fn counts(&self) -> Vec<(OrbType, usize)> {
        OrbType::ALL
            .iter()
            .map(|&orb| (orb, self.count(orb)))
            .filter(|&(_, n)| n > 0)
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn dir_orb(path: &Path) -> Option<OrbType> {
    path.file_name()
        .and_then(OsStr::to_str)
        .and_then(OrbType::from_name)
        .filter(|&orb| orb != OrbType::Unknown)
}

fn is_template_file(path: &Path) -> bool {
    let hidden = file_name(path).starts_with('.');
    let image = ImageFormat::from_path(path).is_ok();
    if !hidden && !image {
        warn!("skipping {}: not an image", path.display());
    }
    !hidden && image
}

fn read_bundle(bytes: &[u8]) -> Result<Vec<BundleEntry>, Error> {
    let invalid = |e: &dyn std::fmt::Display| Error::ReloadValidation(format!("corrupt bundle: {}", e));
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| invalid(&e))?;
    let mut entries: Vec<BundleEntry> = Vec::new();
    let mut seen = HashSet::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| invalid(&e))?;
        if file.is_dir() {
            continue;
        }
        let path = match file.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                warn!("skipping bundle entry {}: unsafe path", file.name());
                continue;
            }
        };
        let macos_metadata = path
            .components()
            .any(|c| c == Component::Normal(OsStr::new("__MACOSX")));
        if macos_metadata || !is_template_file(&path) {
            continue;
        }
        let orb = match path.parent().and_then(dir_orb) {
            Some(orb) => orb,
            None => {
                warn!("skipping bundle entry {}: no orb type directory", path.display());
                continue;
            }
        };
        let name = file_name(&path);
        if !seen.insert((orb, name.clone())) {
            warn!("skipping bundle entry {}: duplicate", path.display());
            continue;
        }
        if file.size() > MAX_TEMPLATE_BYTES {
            return Err(Error::ReloadValidation(format!(
                "{}: declared size {} exceeds {} bytes",
                path.display(),
                file.size(),
                MAX_TEMPLATE_BYTES
            )));
        }
        let mut data = Vec::new();
        let read = file
            .by_ref()
            .take(MAX_TEMPLATE_BYTES + 1)
            .read_to_end(&mut data)
            .map_err(|e| invalid(&e))?;
        if read as u64 > MAX_TEMPLATE_BYTES {
            return Err(Error::ReloadValidation(format!(
                "{}: larger than {} bytes",
                path.display(),
                MAX_TEMPLATE_BYTES
            )));
        }
        entries.push(BundleEntry { orb, name, data });
    }
    Ok(entries)
}

fn sibling(dir: &Path, suffix: &str) -> PathBuf {
    let mut name = dir
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| "templates".into());
    name.push(".");
    name.push(suffix);
    dir.with_file_name(name)
}

/// Replace the template directory `dir` with the bundle entries.
///
/// The entries are written to a staging directory first, which is then renamed into place. Once the new
/// directory is in place the call succeeds, a leftover copy of the previous directory is only logged.
pub fn persist_bundle(dir: &Path, entries: &[BundleEntry]) -> io::Result<()> {
    let staging = sibling(dir, "staging");
    let old = sibling(dir, "old");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    if let Err(e) = write_staging(&staging, entries) {
        if let Err(cleanup) = fs::remove_dir_all(&staging) {
            warn!("could not remove {}: {}", staging.display(), cleanup);
        }
        return Err(e);
    }
    if old.exists() {
        fs::remove_dir_all(&old)?;
    }
    let had_previous = dir.exists();
    if had_previous {
        fs::rename(dir, &old)?;
    }
    if let Err(e) = fs::rename(&staging, dir) {
        if had_previous {
            fs::rename(&old, dir)?;
        }
        return Err(e);
    }
    if had_previous {
        if let Err(e) = fs::remove_dir_all(&old) {
            warn!("could not remove previous templates {}: {}", old.display(), e);
        }
    }
    Ok(())
}

fn write_staging(staging: &Path, entries: &[BundleEntry]) -> io::Result<()> {
    for orb in OrbType::ALL.iter().filter(|&&orb| orb != OrbType::Unknown) {
        fs::create_dir_all(staging.join(orb.name()))?;
    }
    for entry in entries {
        fs::write(staging.join(entry.orb.name()).join(&entry.name), &entry.data)?;
    }
    Ok(())
}
