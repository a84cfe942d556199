use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::RollType;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| hsl_color((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

fn hsl_color(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Bar colour of the nat tally.
pub fn roll_type_color(roll_type: RollType) -> Color32 {
    match roll_type {
        RollType::Nat1 => hsl_color(0.0, 1.0, 0.7),
        RollType::Nat20 => hsl_color(140.0, 1.0, 0.7),
    }
}

/// Shade of `hue` scaled by `value / max`, darker for larger values.
pub fn intensity(hue: f32, value: f64, max: f64) -> Color32 {
    let t = if max > 0.0 { (value / max).clamp(0.0, 1.0) } else { 0.0 };
    hsl_color(hue, 0.7, 0.85 - 0.5 * t as f32)
}

// ---------------------------------------------------------------------------
// Color mapping: character → Color32
// ---------------------------------------------------------------------------

/// Maps every character of the table to a distinct colour.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map over the given characters.
    pub fn new(characters: &[String]) -> Self {
        let mapping = characters
            .iter()
            .cloned()
            .zip(generate_palette(characters.len()))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a character.
    pub fn color_for(&self, character: &str) -> Color32 {
        self.mapping
            .get(character)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_distinct_colours() {
        let colours = generate_palette(8);
        assert_eq!(colours.len(), 8);
        for (i, a) in colours.iter().enumerate() {
            assert!(colours[i + 1..].iter().all(|b| a != b));
        }
    }

    #[test]
    fn unknown_character_is_grey() {
        let map = ColorMap::new(&["Beau".to_string()]);
        assert_ne!(map.color_for("Beau"), Color32::GRAY);
        assert_eq!(map.color_for("Essek"), Color32::GRAY);
    }

    #[test]
    fn intensity_darkens_with_value() {
        let low = intensity(0.0, 1.0, 10.0);
        let high = intensity(0.0, 10.0, 10.0);
        let brightness = |c: Color32| u32::from(c.r()) + u32::from(c.g()) + u32::from(c.b());
        assert!(brightness(high) < brightness(low));
    }
}
