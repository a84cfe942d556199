use std::f64::consts::{FRAC_PI_2, TAU};

use eframe::egui::{self, Color32, Ui};
use egui_plot::{
    Bar, BarChart, GridMark, Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, Points,
    Polygon, Text,
};

use crate::color::{self, ColorMap};
use crate::data::aggregate::{CharacterTotal, ViewBundle};
use crate::data::model::RollType;
use crate::state::RadarPlayback;

const CHART_HEIGHT: f32 = 320.0;
/// Seconds between radar frames while playing.
const RADAR_STEP: f64 = 1.0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Axis formatter printing `labels[i]` at integer position `i`.
fn label_axis(labels: Vec<String>) -> impl Fn(GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let idx = mark.value.round();
        if (mark.value - idx).abs() > f64::EPSILON || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).cloned().unwrap_or_default()
    }
}

fn no_data(ui: &mut Ui) {
    ui.label(egui::RichText::new("No rolls in this selection.").italics());
}

// ---------------------------------------------------------------------------
// Roll type breakdown
// ---------------------------------------------------------------------------

/// Share of each roll category for the selected character.
pub fn roll_breakdown(ui: &mut Ui, views: &ViewBundle) {
    let who = views.state.selected_character.as_deref().unwrap_or("-");
    ui.heading(format!("Roll Type Breakdown: {who}"));
    if views.roll_breakdown.is_empty() {
        no_data(ui);
        return;
    }

    let total: usize = views.roll_breakdown.iter().map(|c| c.count).sum();
    let palette = color::generate_palette(views.roll_breakdown.len());
    let bars: Vec<Bar> = views
        .roll_breakdown
        .iter()
        .zip(palette)
        .enumerate()
        .map(|(i, (c, fill))| {
            let pct = 100.0 * c.count as f64 / total as f64;
            Bar::new(i as f64, c.count as f64)
                .name(format!("{} ({pct:.1}%)", c.category))
                .fill(fill)
        })
        .collect();
    let labels = views.roll_breakdown.iter().map(|c| c.category.clone()).collect();

    Plot::new("roll_breakdown")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .y_axis_formatter(label_axis(labels))
        .x_axis_label("Rolls")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
        });
}

// ---------------------------------------------------------------------------
// Nat 1s vs Nat 20s
// ---------------------------------------------------------------------------

/// Grouped bars of natural 1s and 20s per main character.
pub fn nat_tally(ui: &mut Ui, views: &ViewBundle) {
    ui.heading("Natural 1s vs 20s");
    if views.nat_tally.is_empty() {
        no_data(ui);
        return;
    }

    let mut characters: Vec<String> = Vec::new();
    for t in &views.nat_tally {
        if !characters.contains(&t.character) {
            characters.push(t.character.clone());
        }
    }

    let chart = |roll_type: RollType, offset: f64| {
        let bars: Vec<Bar> = views
            .nat_tally
            .iter()
            .filter(|t| t.roll_type == roll_type)
            .filter_map(|t| {
                let x = characters.iter().position(|c| *c == t.character)?;
                Some(Bar::new(x as f64 + offset, t.count as f64).width(0.4))
            })
            .collect();
        BarChart::new(bars)
            .name(roll_type.to_string())
            .color(color::roll_type_color(roll_type))
    };
    let nat1 = chart(RollType::Nat1, -0.2);
    let nat20 = chart(RollType::Nat20, 0.2);

    Plot::new("nat_tally")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .legend(Legend::default())
        .x_axis_formatter(label_axis(characters.clone()))
        .y_axis_label("Count")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(nat1);
            plot_ui.bar_chart(nat20);
        });
}

// ---------------------------------------------------------------------------
// Roll frequency
// ---------------------------------------------------------------------------

/// Rolls per episode with the centered trend line.
pub fn roll_frequency(ui: &mut Ui, views: &ViewBundle) {
    ui.heading("Roll Frequency Across Episodes");
    if views.roll_frequency.is_empty() {
        no_data(ui);
        return;
    }

    let counts: Vec<[f64; 2]> = views
        .roll_frequency
        .iter()
        .map(|f| [f.episode as f64, f.rolls as f64])
        .collect();
    let trend: Vec<[f64; 2]> = views
        .roll_frequency
        .iter()
        .filter_map(|f| Some([f.episode as f64, f.rolling_avg?]))
        .collect();

    Plot::new("roll_frequency")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Episode")
        .y_axis_label("Number of Rolls")
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(PlotPoints::from(counts.clone())).name("Roll Count"));
            plot_ui.points(Points::new(PlotPoints::from(counts)).radius(2.5));
            plot_ui.line(
                Line::new(PlotPoints::from(trend))
                    .name("Episode Trend")
                    .color(Color32::from_rgb(178, 34, 34))
                    .style(LineStyle::dashed_loose()),
            );
        });
}

// ---------------------------------------------------------------------------
// Radar: roll category profile by episode
// ---------------------------------------------------------------------------

/// Polar profile of roll categories, one frame per episode.
pub fn category_radar(ui: &mut Ui, views: &ViewBundle, playback: &mut RadarPlayback) {
    ui.heading("Roll Type Distribution by Episode");
    let dist = &views.category_distribution;
    if dist.episodes.is_empty() || dist.categories.is_empty() {
        no_data(ui);
        return;
    }

    let frames = dist.episodes.len();
    let now = ui.input(|i| i.time);
    playback.tick(now, RADAR_STEP, frames);
    if playback.playing {
        ui.ctx()
            .request_repaint_after(std::time::Duration::from_secs_f64(RADAR_STEP));
    }
    let frame = playback.frame.min(frames - 1);
    let profile = &dist.episodes[frame];

    ui.horizontal(|ui| {
        let label = if playback.playing { "Pause" } else { "Play" };
        if ui.button(label).clicked() {
            playback.playing = !playback.playing;
            playback.last_step = now;
        }
        let mut selected = frame;
        let slider = egui::Slider::new(&mut selected, 0..=frames - 1)
            .show_value(false)
            .text(format!("Episode: {}", profile.episode));
        if ui.add(slider).changed() {
            playback.frame = selected;
        }
    });

    // Fixed radial scale across frames so episodes compare visually.
    let max_count = dist
        .episodes
        .iter()
        .flat_map(|p| p.counts.iter())
        .copied()
        .max()
        .unwrap_or(1)
        .max(1) as f64;
    let n = dist.categories.len();
    let angle = |j: usize| FRAC_PI_2 - TAU * j as f64 / n as f64;
    let at = |j: usize, r: f64| [r * angle(j).cos(), r * angle(j).sin()];

    let outline: Vec<[f64; 2]> = profile
        .counts
        .iter()
        .enumerate()
        .map(|(j, &c)| at(j, c as f64 / max_count))
        .collect();

    Plot::new("category_radar")
        .height(CHART_HEIGHT + 80.0)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for ring in [0.25, 0.5, 0.75, 1.0] {
                let circle: PlotPoints = (0..=64)
                    .map(|k| {
                        let a = TAU * k as f64 / 64.0;
                        [ring * a.cos(), ring * a.sin()]
                    })
                    .collect();
                plot_ui.line(Line::new(circle).color(Color32::from_gray(90)).width(0.5));
            }
            for (j, category) in dist.categories.iter().enumerate() {
                let spoke = vec![[0.0, 0.0], at(j, 1.0)];
                plot_ui.line(
                    Line::new(PlotPoints::from(spoke))
                        .color(Color32::from_gray(90))
                        .width(0.5),
                );
                let [x, y] = at(j, 1.12);
                plot_ui.text(Text::new(PlotPoint::new(x, y), category.clone()));
            }
            plot_ui.polygon(
                Polygon::new(PlotPoints::from(outline))
                    .name(format!("Episode {}", profile.episode))
                    .fill_color(Color32::from_rgba_unmultiplied(147, 112, 219, 80))
                    .stroke(egui::Stroke::new(3.0, Color32::from_rgb(147, 112, 219))),
            );
        });
    ui.label(format!("Outer ring: {max_count} rolls"));
}

// ---------------------------------------------------------------------------
// Damage / kills
// ---------------------------------------------------------------------------

/// Descending bars of one per-character total, shaded by magnitude.
pub fn character_totals(
    ui: &mut Ui,
    id: &str,
    title: &str,
    totals: &[CharacterTotal],
    hue: f32,
    colors: Option<&ColorMap>,
) {
    ui.heading(title);
    if totals.is_empty() {
        no_data(ui);
        return;
    }

    let max = totals.iter().map(|t| t.total).fold(0.0, f64::max);
    let bars: Vec<Bar> = totals
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let bar = Bar::new(i as f64, t.total)
                .name(&t.character)
                .fill(color::intensity(hue, t.total, max));
            match colors {
                Some(map) => bar.stroke(egui::Stroke::new(1.5, map.color_for(&t.character))),
                None => bar,
            }
        })
        .collect();
    let labels = totals.iter().map(|t| t.character.clone()).collect();

    Plot::new(id)
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_formatter(label_axis(labels))
        .y_axis_label(title)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(title));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_axis_only_labels_integer_marks() {
        let fmt = label_axis(vec!["Beau".into(), "Fjord".into()]);
        let mark = |value| GridMark { value, step_size: 1.0 };
        assert_eq!(fmt(mark(1.0), &(0.0..=2.0)), "Fjord");
        assert_eq!(fmt(mark(0.5), &(0.0..=2.0)), "");
        assert_eq!(fmt(mark(7.0), &(0.0..=2.0)), "");
        assert_eq!(fmt(mark(-1.0), &(0.0..=2.0)), "");
    }
}
