//! The colour lookup table: quantized hue and saturation of a cell sample mapped to an orb type.
//!
//! The table is stored as JSON:
//! ```text
//! { "hue_step": 2, "saturation_step": 8, "entries": [[0, 31, "r"], [60, 31, "b"]] }
//! ```
//! Each entry is `[hue bucket, saturation bucket, internal orb code]`. Hue uses the 0..180 range, saturation
//! 0..=255, a bucket is the value divided by its step.

use crate::orb::OrbType;
use crate::Error;
use image::Rgb;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A colour in the HSV space with 8 bit channels: hue in 0..180, saturation and value in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
}

impl Hsv {
    pub fn from_rgb(rgb: Rgb<u8>) -> Hsv {
        let [r, g, b] = rgb.0;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let saturation = if max > 0. { 255. * delta / max } else { 0. };
        let mut hue = if delta == 0. {
            0.
        } else if max == r {
            60. * (g - b) / delta
        } else if max == g {
            120. + 60. * (b - r) / delta
        } else {
            240. + 60. * (r - g) / delta
        };
        if hue < 0. {
            hue += 360.;
        }
        Hsv {
            hue: ((hue / 2.).round() as u32 % 180) as u8,
            saturation: saturation.round() as u8,
            value: max as u8,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    hue_step: u8,
    saturation_step: u8,
    entries: Vec<(u8, u8, OrbType)>,
}

/// An immutable snapshot of the colour lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
    hue_step: u8,
    saturation_step: u8,
    entries: HashMap<(u8, u8), OrbType>,
}

impl ColorTable {
    /// An empty table with the given quantization. Steps of zero are treated as one.
    pub fn new(hue_step: u8, saturation_step: u8) -> ColorTable {
        ColorTable {
            hue_step: hue_step.max(1),
            saturation_step: saturation_step.max(1),
            entries: HashMap::new(),
        }
    }

    /// Load a table file.
    /// # Errors
    /// [Error::Load] if the file is missing or not a valid table.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ColorTable, Error> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| Error::load(path, e))?;
        let table = ColorTable::parse(&bytes).map_err(|reason| Error::load(path, reason))?;
        info!(
            "loaded colour table {} with {} entries",
            path.display(),
            table.len()
        );
        Ok(table)
    }

    /// Parse replacement table bytes.
    /// # Errors
    /// [Error::ReloadValidation] if the bytes are not a valid table or the table is empty.
    pub fn from_slice(bytes: &[u8]) -> Result<ColorTable, Error> {
        let table = ColorTable::parse(bytes).map_err(Error::ReloadValidation)?;
        if table.is_empty() {
            return Err(Error::ReloadValidation(String::from("colour table has no entries")));
        }
        Ok(table)
    }

    fn parse(bytes: &[u8]) -> Result<ColorTable, String> {
        let file: TableFile = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        if file.hue_step == 0 || file.saturation_step == 0 {
            return Err(String::from("quantization step must be positive"));
        }
        let mut table = ColorTable::new(file.hue_step, file.saturation_step);
        for (hue, saturation, orb) in file.entries {
            table.entries.insert((hue, saturation), orb);
        }
        Ok(table)
    }

    /// Serialize in the table file format, entries sorted by key.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(&(h, s), &orb)| (h, s, orb))
            .collect();
        entries.sort();
        serde_json::to_string(&TableFile {
            hue_step: self.hue_step,
            saturation_step: self.saturation_step,
            entries,
        })
    }

    /// The quantized key of a colour sample.
    pub fn key(&self, hsv: Hsv) -> (u8, u8) {
        (hsv.hue / self.hue_step, hsv.saturation / self.saturation_step)
    }

    /// Add the bucket of `hsv`, replacing a previous entry.
    pub fn insert(&mut self, hsv: Hsv, orb: OrbType) {
        let key = self.key(hsv);
        self.entries.insert(key, orb);
    }

    /// Samples without an entry are [OrbType::Unknown].
    pub fn lookup(&self, hsv: Hsv) -> OrbType {
        self.entries
            .get(&self.key(hsv))
            .copied()
            .unwrap_or(OrbType::Unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_primaries() {
        let red = Hsv::from_rgb(Rgb([255, 0, 0]));
        assert_eq!((red.hue, red.saturation, red.value), (0, 255, 255));
        let green = Hsv::from_rgb(Rgb([0, 255, 0]));
        assert_eq!(green.hue, 60);
        let blue = Hsv::from_rgb(Rgb([0, 0, 255]));
        assert_eq!(blue.hue, 120);
        let magenta = Hsv::from_rgb(Rgb([255, 0, 255]));
        assert_eq!(magenta.hue, 150);
        let gray = Hsv::from_rgb(Rgb([128, 128, 128]));
        assert_eq!((gray.hue, gray.saturation, gray.value), (0, 0, 128));
        let black = Hsv::from_rgb(Rgb([0, 0, 0]));
        assert_eq!((black.saturation, black.value), (0, 0));
    }

    #[test]
    fn test_quantized_lookup() {
        let mut table = ColorTable::new(4, 32);
        table.insert(Hsv::from_rgb(Rgb([255, 0, 0])), OrbType::Fire);
        assert_eq!(table.key(Hsv::from_rgb(Rgb([255, 0, 0]))), (0, 7));
        // a slightly different red falls in the same bucket
        assert_eq!(table.lookup(Hsv::from_rgb(Rgb([250, 10, 0]))), OrbType::Fire);
        assert_eq!(table.lookup(Hsv::from_rgb(Rgb([0, 0, 255]))), OrbType::Unknown);
    }

    #[test]
    fn test_parse_file_format() {
        let json = br#"{"hue_step": 2, "saturation_step": 8, "entries": [[0, 31, "r"], [60, 31, "b"], [5, 0, "o"]]}"#;
        let table = ColorTable::from_slice(json).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.lookup(Hsv {
                hue: 120,
                saturation: 255,
                value: 255
            }),
            OrbType::Water
        );
        assert_eq!(
            table.lookup(Hsv {
                hue: 11,
                saturation: 7,
                value: 0
            }),
            OrbType::Bomb
        );
        let again = ColorTable::from_slice(table.to_json().unwrap().as_bytes()).unwrap();
        assert_eq!(again, table);
    }

    #[test]
    fn test_reject_invalid_tables() {
        assert!(matches!(
            ColorTable::from_slice(b"not json"),
            Err(Error::ReloadValidation(_))
        ));
        assert!(ColorTable::from_slice(br#"{"hue_step": 0, "saturation_step": 8, "entries": [[0, 0, "r"]]}"#).is_err());
        assert!(ColorTable::from_slice(br#"{"hue_step": 1, "saturation_step": 8, "entries": []}"#).is_err());
        assert!(ColorTable::from_slice(br#"{"hue_step": 1, "saturation_step": 8, "entries": [[0, 0, "z"]]}"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ColorTable::load("/nonexistent/hsv_pixels_to_orb.json").unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
