//! Gap-based table detection over extracted page text.
//!
//! A line is a table row when splitting it on column gaps (a tab or a run
//! of two or more spaces) yields at least two cells. Two or more
//! consecutive rows form a table; any other line ends the current one.

use super::Table;
use crate::patterns::COLUMN_GAP;

/// Minimum cells for a line to count as a row.
const MIN_CELLS: usize = 2;

/// Minimum consecutive rows for a block to count as a table.
const MIN_ROWS: usize = 2;

/// Split a line into cells at column gaps. Empty cells become `None`.
pub fn split_cells(line: &str) -> Vec<Option<String>> {
    COLUMN_GAP
        .split(line.trim())
        .map(|cell| {
            let cell = cell.trim();
            (!cell.is_empty()).then(|| cell.to_string())
        })
        .collect()
}

/// Find tables in page text, in order of appearance.
pub fn detect_tables(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<Option<String>>> = Vec::new();

    for line in text.lines() {
        let cells = split_cells(line);
        if cells.len() >= MIN_CELLS {
            current.push(cells);
        } else {
            flush(&mut current, &mut tables);
        }
    }
    flush(&mut current, &mut tables);

    tables
}

fn flush(current: &mut Vec<Vec<Option<String>>>, tables: &mut Vec<Table>) {
    if current.len() >= MIN_ROWS {
        tables.push(Table::new(std::mem::take(current)));
    } else {
        current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| (!v.is_empty()).then(|| v.to_string()))
            .collect()
    }

    #[test]
    fn test_split_cells() {
        assert_eq!(split_cells("  SALARIO   30,00    5.000,00  "), cells(&["SALARIO", "30,00", "5.000,00"]));
        assert_eq!(split_cells("INSS\t\t550,00"), cells(&["INSS", "", "550,00"]));
        assert_eq!(split_cells("Nome: Jose da Silva"), cells(&["Nome: Jose da Silva"]));
    }

    #[test]
    fn test_detects_consecutive_rows() {
        let text = "HOLERITE\n\
                    Cod  Descricao   Ref     Valor\n\
                    001  SALARIO     30,00   5.000,00\n\
                    Total liquido: 4.450,00\n\
                    A  B\n\
                    \n\
                    X  Y\n\
                    Z  W\n";
        let tables = detect_tables(text);

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[1], cells(&["001", "SALARIO", "30,00", "5.000,00"]));
        assert_eq!(tables[1].lines(), vec!["X | Y", "Z | W"]);
    }

    #[test]
    fn test_single_row_is_not_a_table() {
        assert!(detect_tables("Titulo\nA  B\nRodape").is_empty());
        assert!(detect_tables("").is_empty());
    }
}
