use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::dataset::DatasetStatus;
use crate::engine::recommender::{RecommendSummary, RecommendationEntry};
use crate::engine::{Band, Classification};
use crate::programme::ProgrammeRecord;

fn band_cell(band: Band) -> Cell {
    let cell = Cell::new(format!("{} {}", band.as_i8(), band.label()));
    match band {
        Band::Error | Band::MissionImpossible => cell.fg(Color::Red),
        Band::Dangerous | Band::VeryRisky | Band::Risky => cell.fg(Color::Yellow),
        _ => cell.fg(Color::Green),
    }
}

pub fn render_classification_table(
    programme: &ProgrammeRecord,
    result: &Classification,
) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Code", "Institution", "Band", "Composite Score"]);
    table.add_row(Row::from(vec![
        Cell::new(&programme.code),
        Cell::new(&programme.institution),
        band_cell(result.band),
        Cell::new(if result.band.is_rankable() {
            format!("{:.2}", result.score)
        } else {
            "-".to_string()
        }),
    ]));
    table.to_string()
}

pub fn render_recommendations_table(
    entries: &[RecommendationEntry],
    summary: &RecommendSummary,
) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Rank", "Code", "Institution", "Band", "Score"]);

    for (idx, entry) in entries.iter().enumerate() {
        table.add_row(Row::from(vec![
            Cell::new((idx + 1).to_string()),
            Cell::new(&entry.programme.code),
            Cell::new(&entry.programme.institution),
            band_cell(entry.band),
            Cell::new(format!("{:.2}", entry.score)),
        ]));
    }

    let mut out = table.to_string();
    out.push_str(&format!(
        "\nScanned {} of {} available programmes, {} classifiable",
        summary.programmes_scanned, summary.programmes_available, summary.programmes_found
    ));
    out
}

pub fn render_dataset_status_table(status: &DatasetStatus) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Path".to_string(), status.path.display().to_string()]);
    table.add_row(vec!["Loaded".to_string(), status.loaded.to_string()]);
    table.add_row(vec!["Generation".to_string(), status.generation.to_string()]);
    table.add_row(vec![
        "Loaded at".to_string(),
        status
            .loaded_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Programmes".to_string(),
        status.coverage.total.to_string(),
    ]);
    table.add_row(vec!["Active".to_string(), status.coverage.active.to_string()]);
    table.add_row(vec![
        "With upper quartile".to_string(),
        status.coverage.with_upper_quartile.to_string(),
    ]);
    table.add_row(vec![
        "With median".to_string(),
        status.coverage.with_median.to_string(),
    ]);
    table.add_row(vec![
        "With lower quartile".to_string(),
        status.coverage.with_lower_quartile.to_string(),
    ]);
    table.to_string()
}
