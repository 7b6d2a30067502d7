//! The fixed set of monster parts and how their images are addressed.

use std::fmt;
use std::str::FromStr;

/// Number of selectable variants offered for every category.
pub const OPTIONS_PER_CATEGORY: u8 = 4;

/// Query parameter used to preselect a category.
pub const CATEGORY_QUERY_KEY: &str = "category";

/// A monster anatomy slot. The set is closed; draw order follows declaration order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Body,
    Eyes,
    Mouth,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    Nose,
    Accessory,
}

impl Category {
    pub const ALL: [Self; 9] = [
        Self::Body,
        Self::Eyes,
        Self::Mouth,
        Self::LeftArm,
        Self::RightArm,
        Self::LeftLeg,
        Self::RightLeg,
        Self::Nose,
        Self::Accessory,
    ];

    /// Storage key and asset directory name.
    pub fn key(self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Eyes => "eyes",
            Self::Mouth => "mouth",
            Self::LeftArm => "leftarm",
            Self::RightArm => "rightarm",
            Self::LeftLeg => "leftleg",
            Self::RightLeg => "rightleg",
            Self::Nose => "nose",
            Self::Accessory => "accessory",
        }
    }

    /// Human readable label for buttons and headings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Body => "Body",
            Self::Eyes => "Eyes",
            Self::Mouth => "Mouth",
            Self::LeftArm => "Left arm",
            Self::RightArm => "Right arm",
            Self::LeftLeg => "Left leg",
            Self::RightLeg => "Right leg",
            Self::Nose => "Nose",
            Self::Accessory => "Accessory",
        }
    }

    /// Image source for option `n` (1-based), e.g. `images/eyes/eyes2.png`.
    ///
    /// Returns `None` when `n` is outside `1..=OPTIONS_PER_CATEGORY`.
    pub fn image_source(self, n: u8) -> Option<String> {
        (1..=OPTIONS_PER_CATEGORY)
            .contains(&n)
            .then(|| format!("images/{0}/{0}{n}.png", self.key()))
    }

    /// All option sources of this category, in button order.
    pub fn options(self) -> impl Iterator<Item = (u8, String)> {
        (1..=OPTIONS_PER_CATEGORY)
            .map(move |n| (n, format!("images/{0}/{0}{n}.png", self.key())))
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::ALL[0]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(wanted.to_owned()))
    }
}

/// Pick the initial category from a query string such as `?category=eyes&x=1`.
///
/// Unrecognised or missing values fall back to the first category.
pub fn category_from_query(search: &str) -> Category {
    query_param(search, CATEGORY_QUERY_KEY)
        .and_then(|value| match value.parse() {
            Ok(category) => Some(category),
            Err(err) => {
                log::warn!("Ignoring {err} from query");
                None
            }
        })
        .unwrap_or_default()
}

fn query_param<'a>(search: &'a str, key: &str) -> Option<&'a str> {
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find_map(|(k, v)| (k == key).then_some(v))
}
