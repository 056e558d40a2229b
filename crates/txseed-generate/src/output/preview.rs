use txseed_core::Frame;

const MAX_CELL_WIDTH: usize = 20;

/// Render the first `limit` rows as a boxed, right-aligned text table.
///
/// Cells longer than 20 characters are cut to 17 and suffixed with `...`.
/// A footer names the limit when the frame holds more rows.
pub fn render_preview(frame: &Frame, limit: usize) -> String {
    let header: Vec<String> = frame
        .column_names()
        .into_iter()
        .map(|name| truncate(name.to_string()))
        .collect();
    let cells: Vec<Vec<String>> = frame
        .head(limit)
        .iter()
        .map(|row| row.iter().map(|value| truncate(value.to_text())).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|name| name.chars().count().max(3)).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = widths.iter().fold(String::from("+"), |mut line, width| {
        line.push_str(&"-".repeat(*width));
        line.push('+');
        line
    });

    let mut out = String::new();
    out.push_str(&separator);
    out.push('\n');
    push_line(&mut out, &header, &widths);
    out.push_str(&separator);
    out.push('\n');
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    out.push_str(&separator);
    out.push('\n');

    if frame.len() > limit {
        let noun = if limit == 1 { "row" } else { "rows" };
        out.push_str(&format!("only showing top {limit} {noun}\n"));
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    out.push('|');
    for (cell, &width) in cells.iter().zip(widths) {
        out.push_str(&format!("{cell:>width$}|"));
    }
    out.push('\n');
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use txseed_core::{DataType, FrameColumn, Value};

    use super::*;

    fn frame(rows: i64) -> Frame {
        let mut frame = Frame::new(vec![
            FrameColumn::new("id", DataType::Long, false),
            FrameColumn::new("location", DataType::String, true),
        ])
        .expect("frame");
        for id in 0..rows {
            let location = if id == 0 {
                Value::String("-12.345678901234, 100.5".to_string())
            } else {
                Value::Null
            };
            frame.push_row(vec![Value::Long(id), location]).expect("row");
        }
        frame
    }

    #[test]
    fn renders_boxed_table_with_truncated_cells() {
        let expected = "\
+---+--------------------+
| id|            location|
+---+--------------------+
|  0|-12.345678901234,...|
|  1|                NULL|
+---+--------------------+
";
        assert_eq!(render_preview(&frame(2), 5), expected);
    }

    #[test]
    fn footer_appears_when_rows_are_hidden() {
        let rendered = render_preview(&frame(7), 5);
        assert!(rendered.ends_with("only showing top 5 rows\n"));
        assert_eq!(rendered.lines().filter(|line| line.starts_with('|')).count(), 6);
    }
}
