use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use txseed_core::Frame;

/// Write a frame as CSV: a header row, then one record per row in frame
/// order. Returns the number of bytes written.
///
/// Nulls are empty cells; arrays and structs are JSON text.
pub fn write_frame_csv(path: &Path, frame: &Frame) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(frame.column_names())?;

    for row in frame.rows() {
        let record: Vec<String> = row.iter().map(|value| value.to_csv_field()).collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

/// Header and record count of a CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvSummary {
    pub headers: Vec<String>,
    pub rows: u64,
}

/// Read back a CSV file written by [`write_frame_csv`].
pub fn read_csv_summary(path: &Path) -> Result<CsvSummary, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = 0u64;
    for record in reader.records() {
        record?;
        rows += 1;
    }
    Ok(CsvSummary { headers, rows })
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use txseed_core::{DataType, FrameColumn, StructField, Value};

    use super::*;

    #[test]
    fn writes_header_nulls_and_json_cells() {
        let mut frame = Frame::new(vec![
            FrameColumn::new("id", DataType::Long, false),
            FrameColumn::new("note", DataType::String, true),
            FrameColumn::new(
                "address",
                DataType::Struct(vec![StructField::new("city", DataType::String)]),
                true,
            ),
        ])
        .expect("frame");
        frame
            .push_row(vec![
                Value::Long(0),
                Value::String("a, b".to_string()),
                Value::Struct(vec![("city".to_string(), Value::String("Phoenix".to_string()))]),
            ])
            .expect("row");
        frame
            .push_row(vec![Value::Long(1), Value::Null, Value::Null])
            .expect("row");

        let path = std::env::temp_dir().join(format!("txseed_csv_{}.csv", uuid::Uuid::new_v4()));
        let bytes = write_frame_csv(&path, &frame).expect("write csv");
        let contents = fs::read_to_string(&path).expect("read csv");

        assert_eq!(bytes, contents.len() as u64);
        assert_eq!(
            contents,
            "id,note,address\n0,\"a, b\",\"{\"\"city\"\":\"\"Phoenix\"\"}\"\n1,,\n"
        );

        let summary = read_csv_summary(&path).expect("summary");
        assert_eq!(summary.headers, vec!["id", "note", "address"]);
        assert_eq!(summary.rows, 2);
        let _ = fs::remove_file(path);
    }
}
