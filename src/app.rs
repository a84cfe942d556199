use eframe::egui::{self, ScrollArea, Ui};

use crate::state::AppState;
use crate::ui::{charts, panels, summary};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
}

impl DashboardApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: controls ----
        egui::SidePanel::left("control_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            dashboard(ui, &mut self.state);
        });
    }
}

fn dashboard(ui: &mut Ui, state: &mut AppState) {
    let AppState {
        views,
        radar,
        color_map,
        ..
    } = state;
    let Some(views) = views.as_ref() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a roll table to start  (File → Open…)");
        });
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Mighty Nein Dice Analysis");
            let (lo, hi) = views.state.episode_range;
            ui.label(format!(
                "Currently viewing episodes {lo} to {hi}. All charts except the summary reflect this range."
            ));
            ui.separator();

            ui.columns(2, |cols| {
                charts::roll_breakdown(&mut cols[0], views);
                charts::nat_tally(&mut cols[1], views);
            });
            ui.separator();

            charts::roll_frequency(ui, views);
            ui.separator();

            charts::category_radar(ui, views, radar);
            ui.separator();

            ui.columns(2, |cols| {
                charts::character_totals(
                    &mut cols[0],
                    "damage_by_character",
                    "Total Damage by Character",
                    &views.damage_by_character,
                    0.0,
                    color_map.as_ref(),
                );
                charts::character_totals(
                    &mut cols[1],
                    "kills_by_character",
                    "Total Kills by Character",
                    &views.kills_by_character,
                    270.0,
                    color_map.as_ref(),
                );
            });
            ui.separator();

            summary::character_table(ui, &views.character_summary);
            ui.separator();
            summary::metrics_row(ui, &views.metrics);
        });
}
