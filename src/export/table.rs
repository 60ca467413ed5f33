/// How a column aligns its contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableColumn {
    pub header: String,
    pub min_width: usize,
    pub max_width: Option<usize>,
    pub alignment: Alignment,
}

impl TableColumn {
    pub fn left(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            min_width: 0,
            max_width: None,
            alignment: Alignment::Left,
        }
    }

    pub fn right(header: impl Into<String>) -> Self {
        Self {
            alignment: Alignment::Right,
            ..Self::left(header)
        }
    }

    pub fn max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }
}

/// Fixed-width text table for terminal output.
#[derive(Clone, Debug, Default)]
pub struct Table {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<String>>,
    pub padding: usize,
}

impl Table {
    pub fn new(columns: Vec<TableColumn>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            padding: 1,
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Content width of each column, bounded by the column's min/max.
    pub fn compute_widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let widest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .fold(column.header.chars().count(), usize::max);
                let width = widest.max(column.min_width);
                column.max_width.map_or(width, |max| width.min(max))
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let widths = self.compute_widths();
        let header: Vec<String> = self.columns.iter().map(|c| c.header.clone()).collect();
        let mut lines = vec![self.render_row(&header, &widths)];
        let rule_width: usize = widths.iter().map(|w| w + self.padding * 2).sum::<usize>()
            + widths.len().saturating_sub(1);
        lines.push("-".repeat(rule_width));
        for row in &self.rows {
            lines.push(self.render_row(row, &widths));
        }
        lines.join("\n")
    }

    fn render_row(&self, row: &[String], widths: &[usize]) -> String {
        let cells: Vec<String> = self
            .columns
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(idx, (column, width))| {
                let text = row.get(idx).map(String::as_str).unwrap_or("");
                render_cell(text, *width, column.alignment, self.padding)
            })
            .collect();
        cells.join(" ").trim_end().to_string()
    }
}

fn render_cell(text: &str, width: usize, alignment: Alignment, padding: usize) -> String {
    let fitted = truncate(text, width);
    let gap = width.saturating_sub(fitted.chars().count());
    let pad = " ".repeat(padding);
    match alignment {
        Alignment::Left => format!("{pad}{fitted}{}{pad}", " ".repeat(gap)),
        Alignment::Right => format!("{pad}{}{fitted}{pad}", " ".repeat(gap)),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = text.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_aligned_numbers_line_up() {
        let mut table = Table::new(vec![TableColumn::left("Month"), TableColumn::right("Due")]);
        table.push_row(vec!["Jan".into(), "1.00".into()]);
        table.push_row(vec!["February".into(), "100.00".into()]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].ends_with("  1.00"));
        assert!(lines[3].ends_with("100.00"));
        assert_eq!(lines[2].len(), lines[3].len());
    }

    #[test]
    fn long_cells_are_truncated() {
        let mut table = Table::new(vec![TableColumn::left("Name").max_width(5)]);
        table.push_row(vec!["Excavation".into()]);
        assert!(table.render().contains("Exca…"));
    }
}
