use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use super::styling::Tone;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn color_coded_status_cell(status: &str) -> Cell {
    let cell = Cell::new(status);
    match Tone::of_status(status) {
        Tone::Good => cell.fg(TableColor::Green),
        Tone::Pending => cell.fg(TableColor::Yellow),
        Tone::Bad => cell.fg(TableColor::Red),
        Tone::Neutral => cell.fg(TableColor::DarkGrey),
    }
}
