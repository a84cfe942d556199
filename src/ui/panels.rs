use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – dashboard controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    // ---- Logo (centered, optional) ----
    if let Some(logo) = &state.config.logo {
        let uri = format!("file://{}", logo.display());
        let width = ui.available_width() * 0.8;
        ui.vertical_centered(|ui: &mut Ui| {
            ui.add(egui::Image::from_uri(uri).max_width(width).max_height(120.0));
        });
        ui.add_space(4.0);
    }

    ui.heading("Dashboard Controls");
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("No dataset loaded.");
        return;
    };
    let Some((first_ep, last_ep)) = dataset.episode_bounds() else {
        ui.label("The dataset has no rolls.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Episode range ----
            ui.strong("Select Episode Range");
            let (old_lo, old_hi) = state.controls.episode_range;
            let (mut lo, mut hi) = (old_lo, old_hi);
            ui.add(egui::Slider::new(&mut lo, first_ep..=last_ep).text("from"));
            ui.add(egui::Slider::new(&mut hi, first_ep..=last_ep).text("to"));
            if (lo, hi) != (old_lo, old_hi) {
                // Drag one handle past the other and it pushes the other along.
                if lo != old_lo {
                    hi = hi.max(lo);
                } else {
                    lo = lo.min(hi);
                }
                state.set_episode_range(lo, hi);
            }
            ui.separator();

            // ---- Character for the roll breakdown ----
            ui.strong("Select a Character (for Roll Breakdown)");
            let current = state.controls.selected_character.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("selected_character")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for name in dataset.characters() {
                        if ui.selectable_label(current == *name, name).clicked() {
                            state.set_selected_character(name.clone());
                        }
                    }
                });
            ui.separator();

            // ---- Guests ----
            let mut include = state.controls.include_guests;
            if ui.checkbox(&mut include, "Include Guests & NPCs").changed() {
                state.set_include_guests(include);
            }

            if !dataset.nat_conflicts().is_empty() {
                ui.separator();
                ui.label(
                    RichText::new(format!(
                        "{} rolls are flagged as both Nat 1 and Nat 20; they count in both tallies.",
                        dataset.nat_conflicts().len()
                    ))
                    .color(Color32::YELLOW),
                );
            }
        });

    // Recompute views after any control change.
    state.refresh();
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.views.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export views…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(ds), Some(views)) = (&state.dataset, &state.views) {
            ui.label(format!(
                "{} rolls loaded, {} in view",
                ds.len(),
                views.filtered_rolls
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open roll table")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        // Failures are logged by the cache and shown in the top bar.
        let _ = state.open(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export views")
        .set_file_name("views.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        match state.export(&path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::error!("Export failed: {e}");
                state.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}
