//! Table output for lump directories and brush listings

use prettytable::format::{Alignment, consts::FORMAT_NO_LINESEP_WITH_TITLE};
use prettytable::{Cell, Row, Table};

/// Table with bold titles and no separators between rows
pub fn create_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(Row::new(
        headers.iter().map(|h| Cell::new(h).style_spec("b")).collect(),
    ));
    table
}

/// Append a row, right-aligning cells that hold a plain number
pub fn add_table_row(table: &mut Table, cells: Vec<String>) {
    table.add_row(Row::new(cells.iter().map(|text| numeric_cell(text)).collect()));
}

fn numeric_cell(text: &str) -> Cell {
    if text.parse::<f64>().is_ok() {
        Cell::new_align(text, Alignment::RIGHT)
    } else {
        Cell::new(text)
    }
}
