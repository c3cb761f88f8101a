//! Ingestion — turns a CSV, Excel or JSON file, or the built-in sample
//! generator, into the untyped [`RawTable`] the attribution engine validates.

use calamine::{Data, Range, Reader, Xlsx};
use mix_attribution::SampleGenerator;
use mix_core::config::{MixConfig, SchemaConfig};
use mix_core::error::{MixError, MixResult};
use mix_core::types::{Cell, RawRecord, RawTable};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::info;

/// Where an analysis run reads its records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Synthetic data from [`SampleGenerator`].
    Sample,
    /// A `.csv`, `.xlsx` or `.json` file.
    File(PathBuf),
}

impl DataSource {
    pub fn describe(&self) -> String {
        match self {
            DataSource::Sample => "Sample Data".to_string(),
            DataSource::File(path) => path.display().to_string(),
        }
    }

    pub fn load(&self, config: &MixConfig) -> MixResult<RawTable> {
        let table = match self {
            DataSource::Sample => {
                let records = SampleGenerator::new(config.sample.clone()).generate();
                records_to_table(&records, &config.schema)
            }
            DataSource::File(path) => load_file(path)?,
        };
        info!(
            source = %self.describe(),
            rows = table.len(),
            columns = table.columns.len(),
            "Input loaded"
        );
        Ok(table)
    }
}

/// Load a table, choosing the format from the file extension.
pub fn load_file(path: &Path) -> MixResult<RawTable> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("csv") => read_csv(File::open(path)?),
        Some("xlsx") => read_xlsx(BufReader::new(File::open(path)?)),
        Some("json") => read_json(File::open(path)?),
        other => Err(MixError::Ingest(format!(
            "unsupported input format {:?} for {} (expected .csv, .xlsx or .json)",
            other.unwrap_or(""),
            path.display()
        ))),
    }
}

/// Read CSV with a header row. Every cell arrives as text; the validator
/// does the typing.
pub fn read_csv(reader: impl Read) -> MixResult<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = csv_reader
        .headers()
        .map_err(|e| MixError::Ingest(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut table = RawTable::new(columns);

    for record in csv_reader.records() {
        let record = record.map_err(|e| MixError::Ingest(e.to_string()))?;
        table.push_row(record.iter().map(Cell::from).collect());
    }
    Ok(table)
}

/// Read the first worksheet of an Excel workbook. The first row is the
/// header.
pub fn read_xlsx(reader: impl Read + Seek) -> MixResult<RawTable> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(reader).map_err(|e| MixError::Ingest(format!("opening workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| MixError::Ingest("workbook has no worksheets".to_string()))?
        .map_err(|e| MixError::Ingest(format!("reading first worksheet: {e}")))?;
    Ok(range_to_table(&range))
}

/// Lay a worksheet range out as a table, header row first.
pub fn range_to_table(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();
    let columns = rows
        .next()
        .map(|header| header.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();

    let mut table = RawTable::new(columns);
    for row in rows {
        table.push_row(row.iter().map(excel_cell).collect());
    }
    table
}

fn excel_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::String(s) | Data::DateTimeIso(s) => Cell::from(s.as_str()),
        // Periods are days; the time of day is dropped.
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Cell::Text(datetime.date().format("%Y-%m-%d").to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        other => Cell::Text(other.to_string()),
    }
}

/// Read a JSON array of flat objects. The header is the union of keys in
/// first-seen order; keys absent from an object become empty cells.
pub fn read_json(reader: impl Read) -> MixResult<RawTable> {
    let value: serde_json::Value = serde_json::from_reader(reader)?;
    let objects = value
        .as_array()
        .ok_or_else(|| MixError::Ingest("expected a JSON array of records".to_string()))?;

    let mut columns: Vec<String> = Vec::new();
    for object in objects {
        let object = object
            .as_object()
            .ok_or_else(|| MixError::Ingest("every JSON record must be an object".to_string()))?;
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = RawTable::new(columns);
    for object in objects.iter().filter_map(|o| o.as_object()) {
        let row = table
            .columns
            .iter()
            .map(|column| match object.get(column) {
                None | Some(serde_json::Value::Null) => Cell::Empty,
                Some(serde_json::Value::Number(n)) => n.as_f64().map_or(Cell::Empty, Cell::Number),
                Some(serde_json::Value::String(s)) => Cell::from(s.as_str()),
                Some(other) => Cell::Text(other.to_string()),
            })
            .collect();
        table.push_row(row);
    }
    Ok(table)
}

/// Lay typed records out under the configured column names.
pub fn records_to_table(records: &[RawRecord], schema: &SchemaConfig) -> RawTable {
    let mut table = RawTable::new(vec![
        schema.period_column.clone(),
        schema.channel_column.clone(),
        schema.spend_column.clone(),
        schema.sales_column.clone(),
    ]);
    for record in records {
        table.push_row(vec![
            Cell::Text(record.period.to_string()),
            Cell::Text(record.channel.clone()),
            Cell::Number(record.spend),
            Cell::Number(record.sales),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use mix_attribution::validator::validate_table;
    use mix_core::types::Period;

    #[test]
    fn test_read_csv() {
        let data = "Date,Channel,Spend,Sales\n2024-01-01,TV,100,400\n2024-01-01, Search ,50,\n";
        let table = read_csv(data.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["Date", "Channel", "Spend", "Sales"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 1), &Cell::Text("Search".into()));
        assert_eq!(table.cell(1, 3), &Cell::Empty);
    }

    #[test]
    fn test_read_json_unions_keys() {
        let data = r#"[
            {"Date": "2024-01-01", "Channel": "TV", "Spend": 100, "Sales": 400},
            {"Date": "2024-01-08", "Channel": "TV", "Spend": 120, "Sales": 410, "Note": "promo"}
        ]"#;
        let table = read_json(data.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["Date", "Channel", "Spend", "Sales", "Note"]);
        assert_eq!(table.cell(0, 4), &Cell::Empty);
        assert_eq!(table.cell(1, 2), &Cell::Number(120.0));
        assert_eq!(table.cell(1, 4), &Cell::Text("promo".into()));
    }

    #[test]
    fn test_worksheet_range_becomes_table() {
        let mut range = Range::new((0, 0), (2, 3));
        for (col, name) in ["Date", "Channel", "Spend", "Sales"].into_iter().enumerate() {
            range.set_value((0, col as u32), Data::String(name.to_string()));
        }
        range.set_value((1, 0), Data::DateTimeIso("2024-01-01".to_string()));
        range.set_value((1, 1), Data::String("TV".to_string()));
        range.set_value((1, 2), Data::Int(100));
        range.set_value((1, 3), Data::Float(400.5));
        range.set_value((2, 0), Data::Float(2.0));
        range.set_value((2, 1), Data::String("Search".to_string()));
        range.set_value((2, 2), Data::Float(50.0));

        let table = range_to_table(&range);
        assert_eq!(table.columns, vec!["Date", "Channel", "Spend", "Sales"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 2), &Cell::Number(100.0));
        assert_eq!(table.cell(0, 3), &Cell::Number(400.5));
        assert_eq!(table.cell(1, 3), &Cell::Empty);

        match validate_table(&table, &SchemaConfig::default()) {
            Err(MixError::InvalidRecord { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected invalid record, got {other:?}"),
        }
        let mut complete = table.clone();
        complete.rows.truncate(1);
        let records = validate_table(&complete, &SchemaConfig::default()).unwrap();
        assert!(matches!(records[0].period, Period::Date(_)));
        assert!((records[0].sales - 400.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_xlsx_extension_is_read_as_workbook() {
        // Reaches the Excel reader: the file is missing rather than unsupported.
        assert!(matches!(
            load_file(Path::new("/nonexistent/mix-roi/data.xlsx")),
            Err(MixError::Io(_))
        ));
        assert!(matches!(
            read_xlsx(std::io::Cursor::new(b"not a zip archive".to_vec())),
            Err(MixError::Ingest(_))
        ));
    }

    #[test]
    fn test_read_json_rejects_non_array() {
        assert!(matches!(
            read_json(r#"{"Date": 1}"#.as_bytes()),
            Err(MixError::Ingest(_))
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            load_file(Path::new("data.xls")),
            Err(MixError::Ingest(_))
        ));
    }

    #[test]
    fn test_sample_source_round_trips_through_validator() {
        let config = MixConfig::default();
        let table = DataSource::Sample.load(&config).unwrap();
        let records = validate_table(&table, &config.schema).unwrap();
        assert_eq!(records.len(), table.len());
        assert!(matches!(records[0].period, Period::Date(_)));
    }
}
