use eframe::egui::{RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::{CharacterSummary, Metrics};

const HEADERS: [&str; 7] = [
    "Character",
    "Total Rolls",
    "Avg Roll",
    "Nat 1s",
    "Nat 20s",
    "Total Damage",
    "Kills",
];

/// Text for a value that may be undefined.
pub fn or_no_data(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{v:.decimals$}"),
        None => "no data".to_string(),
    }
}

/// One table row as display strings, in [`HEADERS`] order.
fn summary_cells(row: &CharacterSummary) -> [String; 7] {
    [
        row.character.clone(),
        row.total_rolls.to_string(),
        or_no_data(row.avg_roll, 2),
        row.nat1s.to_string(),
        row.nat20s.to_string(),
        format!("{}", row.total_damage),
        format!("{}", row.kills),
    ]
}

/// Campaign-wide summary of the main cast.
pub fn character_table(ui: &mut Ui, rows: &[CharacterSummary]) {
    ui.heading("Character Summary Table");
    ui.label(RichText::new("Whole campaign, independent of the sidebar filters.").weak());

    TableBuilder::new(ui)
        .id_salt("character_summary")
        .striped(true)
        .column(Column::auto().at_least(90.0))
        .columns(Column::auto().at_least(70.0), HEADERS.len() - 1)
        .header(22.0, |mut header| {
            for title in HEADERS {
                header.col(|ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for row in rows {
                body.row(20.0, |mut table_row| {
                    for cell in summary_cells(row) {
                        table_row.col(|ui| {
                            ui.label(cell);
                        });
                    }
                });
            }
        });
}

/// The three headline numbers.
pub fn metrics_row(ui: &mut Ui, metrics: &Metrics) {
    let entries = [
        ("Total Rolls", metrics.total_rolls.to_string()),
        ("Total Damage", metrics.total_damage.to_string()),
        (
            "Top Killer",
            metrics.top_killer.clone().unwrap_or_else(|| "no data".into()),
        ),
    ];
    ui.columns(entries.len(), |cols| {
        for (col, (label, value)) in cols.iter_mut().zip(entries) {
            col.vertical_centered(|ui| {
                ui.label(RichText::new(label).weak());
                ui.label(RichText::new(value).size(28.0).strong());
            });
        }
    });
    ui.add_space(4.0);
    ui.separator();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_mean_reads_no_data() {
        assert_eq!(or_no_data(None, 2), "no data");
        assert_eq!(or_no_data(Some(12.346), 2), "12.35");
    }

    #[test]
    fn cells_follow_header_order() {
        let row = CharacterSummary {
            character: "Fjord".into(),
            total_rolls: 12,
            avg_roll: None,
            nat1s: 1,
            nat20s: 2,
            total_damage: 88.0,
            kills: 3.0,
        };
        assert_eq!(
            summary_cells(&row),
            ["Fjord", "12", "no data", "1", "2", "88", "3"]
        );
    }
}
