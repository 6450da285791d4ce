use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// The tile categories that can occupy a board cell.
///
/// Every type has a single character code. The internal code is used for analysis data such as the
/// colour table file, the external code is used in visualizer links. The two only differ for [OrbType::Bomb].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub enum OrbType {
    Fire,
    Water,
    Wood,
    Light,
    Dark,
    Heal,
    Jammer,
    Bomb,
    Unknown,
}

impl Default for OrbType {
    fn default() -> Self {
        OrbType::Unknown
    }
}

impl OrbType {
    /// All orb types in catalog order. Templates are iterated in this order.
    pub const ALL: [OrbType; 9] = [
        OrbType::Fire,
        OrbType::Water,
        OrbType::Wood,
        OrbType::Light,
        OrbType::Dark,
        OrbType::Heal,
        OrbType::Jammer,
        OrbType::Bomb,
        OrbType::Unknown,
    ];

    pub fn internal_code(self) -> char {
        match self {
            OrbType::Fire => 'r',
            OrbType::Water => 'b',
            OrbType::Wood => 'g',
            OrbType::Light => 'l',
            OrbType::Dark => 'd',
            OrbType::Heal => 'h',
            OrbType::Jammer => 'j',
            OrbType::Bomb => 'o',
            OrbType::Unknown => '.',
        }
    }

    /// The code understood by the board visualizers.
    pub fn external_code(self) -> char {
        match self {
            OrbType::Bomb => 'x',
            orb => orb.internal_code(),
        }
    }

    pub fn from_internal_code(code: char) -> Option<OrbType> {
        let code = code.to_ascii_lowercase();
        OrbType::ALL
            .iter()
            .copied()
            .find(|orb| orb.internal_code() == code)
    }

    pub fn from_external_code(code: char) -> Option<OrbType> {
        let code = code.to_ascii_lowercase();
        OrbType::ALL
            .iter()
            .copied()
            .find(|orb| orb.external_code() == code)
    }

    /// Lowercase name, also used as the template directory name.
    pub fn name(self) -> &'static str {
        match self {
            OrbType::Fire => "fire",
            OrbType::Water => "water",
            OrbType::Wood => "wood",
            OrbType::Light => "light",
            OrbType::Dark => "dark",
            OrbType::Heal => "heal",
            OrbType::Jammer => "jammer",
            OrbType::Bomb => "bomb",
            OrbType::Unknown => "unknown",
        }
    }

    /// Parse a directory name: either the name or the internal code, case insensitive.
    pub fn from_name(name: &str) -> Option<OrbType> {
        let name = name.trim().to_ascii_lowercase();
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return OrbType::from_internal_code(c);
        }
        OrbType::ALL.iter().copied().find(|orb| orb.name() == name)
    }
}

impl fmt::Display for OrbType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OrbType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrbType::from_name(s).ok_or_else(|| format!("unknown orb type {:?}", s))
    }
}

impl TryFrom<char> for OrbType {
    type Error = String;

    fn try_from(code: char) -> Result<Self, Self::Error> {
        OrbType::from_internal_code(code).ok_or_else(|| format!("unknown orb code {:?}", code))
    }
}

impl From<OrbType> for char {
    fn from(orb: OrbType) -> char {
        orb.internal_code()
    }
}
