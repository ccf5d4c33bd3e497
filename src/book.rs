//! Coloring book request/result types, presets and download naming.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_PAGES: u32 = 1;
pub const MAX_PAGES: u32 = 10;

pub const DEFAULT_THEME: &str = "Space Dinosaurs";
pub const DEFAULT_NAME: &str = "Alex";
pub const DEFAULT_PAGES: u32 = 5;

/// Built-in theme presets
pub const THEME_PRESETS: [&str; 20] = [
    "Black Inventors & Their Creations",
    "HBCU Homecoming Celebration",
    "Juneteenth Freedom Day",
    "Harlem Renaissance Jazz Club",
    "Civil Rights Heroes",
    "African Kings and Queens",
    "Black Christmas Joy",
    "Kwanzaa Principles",
    "Soul Food Feast",
    "The Great Migration Journey",
    "Tuskegee Airmen in Flight",
    "Buffalo Soldiers on the Frontier",
    "Divine Nine Greek Life",
    "Afrofuturism in Space",
    "Black Hair Magic",
    "Historic Black Wall Street",
    "Gullah Geechee Culture",
    "Sunday Morning Gospel",
    "Hip Hop Pioneers",
    "Black Cowboys & Cowgirls",
];

/// Look up a preset by 1-based index or case-insensitive name
pub fn find_preset(selector: &str) -> Option<&'static str> {
    let selector = selector.trim();
    if let Ok(index) = selector.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| THEME_PRESETS.get(i))
            .copied();
    }
    THEME_PRESETS
        .iter()
        .find(|p| p.eq_ignore_ascii_case(selector))
        .copied()
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub theme: String,
    pub name: String,
    pub page_count: u32,
}

impl GenerationRequest {
    pub fn new(theme: impl Into<String>, name: impl Into<String>, page_count: u32) -> Self {
        Self {
            theme: theme.into(),
            name: name.into(),
            page_count,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.theme.trim().is_empty() {
            return Err(ValidationError::EmptyTheme);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !(MIN_PAGES..=MAX_PAGES).contains(&self.page_count) {
            return Err(ValidationError::PageCountOutOfRange {
                actual: self.page_count,
                min: MIN_PAGES,
                max: MAX_PAGES,
            });
        }
        Ok(())
    }

    /// Prefix shared by every downloaded file, e.g. `alex-space-dinosaurs`
    /// `{name}-{theme}` slug shared by every output file.
    ///
    /// Always a single path component: separators and dots never survive.
    pub fn file_stem(&self) -> String {
        format!("{}-{}", slug(&self.name), slug(&self.theme))
    }

    pub fn pdf_file_name(&self) -> String {
        format!("{}-coloring-book.pdf", self.file_stem())
    }

    pub fn cover_file_name(&self) -> String {
        format!("{}-cover.jpeg", self.file_stem())
    }

    /// `index` is zero-based; file names count from 1
    pub fn page_file_name(&self, index: usize) -> String {
        format!("{}-page-{}.jpeg", self.file_stem(), index + 1)
    }
}

/// Lowercase `text`, turn each whitespace run into one `-` (leading and
/// trailing runs included) and map anything else that is not a letter,
/// digit, `-` or `_` to `-`.
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if c.is_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else {
            out.push('-');
        }
    }
    out
}

/// Generated images, base64 encoded. Only produced when every call succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub cover_image: String,
    pub pages: Vec<String>,
}
