//! Prompt templates for the image model.

const STYLE: &str = "Style: simple vector art, thick bold black outlines, no color, no shading, clean lines, white background, kid-friendly.";

pub fn cover_prompt(theme: &str, name: &str) -> String {
    format!(
        "A beautiful coloring book cover page. It should say \"{}\" and \"For {}\". {}",
        theme, name, STYLE
    )
}

/// `scene` counts from 1
pub fn page_prompt(theme: &str, scene: usize) -> String {
    format!(
        "Coloring book page for a child. Theme: {}. Scene {}. {}",
        theme, scene, STYLE
    )
}
