use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four logical fields every input record must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Period,
    Channel,
    Spend,
    Sales,
}

impl Field {
    /// All required fields, in reporting order.
    pub const REQUIRED: [Field; 4] = [Field::Period, Field::Channel, Field::Spend, Field::Sales];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Period => "period",
            Field::Channel => "channel",
            Field::Spend => "spend",
            Field::Sales => "sales",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation key for a row of the design matrix.
///
/// Dates sort before ordinals, which sort before free-form labels. The order
/// only makes output deterministic; the regression does not depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Period {
    Date(NaiveDate),
    Ordinal(i64),
    Label(String),
}

impl Period {
    /// Parse a period from its textual form: ISO date, then integer ordinal
    /// (`"3"` and `"3.0"` alike), then an opaque label.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Period::Date(date);
        }
        if let Ok(ordinal) = trimmed.parse::<i64>() {
            return Period::Ordinal(ordinal);
        }
        if let Some(ordinal) = trimmed.parse::<f64>().ok().and_then(Period::integral) {
            return Period::Ordinal(ordinal);
        }
        Period::Label(trimmed.to_string())
    }

    /// The ordinal for a whole, finite number; `None` otherwise.
    pub fn integral(value: f64) -> Option<i64> {
        let in_range = value.abs() < i64::MAX as f64;
        (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
    }

    /// A label made only of whitespace stands for a missing period.
    pub fn is_blank(&self) -> bool {
        matches!(self, Period::Label(label) if label.trim().is_empty())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Period::Ordinal(n) => write!(f, "{n}"),
            Period::Label(label) => f.write_str(label),
        }
    }
}

/// A loosely-typed cell as it arrives from an ingestion source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Untyped tabular input: a header row plus data rows.
///
/// Rows shorter than the header are padded with [`Cell::Empty`] on access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Index of the first column whose header matches one of `names`,
    /// ignoring ASCII case and surrounding whitespace.
    pub fn column_index(&self, names: &[&str]) -> Option<usize> {
        self.columns.iter().position(|column| {
            let column = column.trim();
            names.iter().any(|name| column.eq_ignore_ascii_case(name))
        })
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One validated observation. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub period: Period,
    pub channel: String,
    /// Non-negative.
    pub spend: f64,
    /// May be negative (returns).
    pub sales: f64,
}

impl RawRecord {
    pub fn new(period: Period, channel: impl Into<String>, spend: f64, sales: f64) -> Self {
        Self {
            period,
            channel: channel.into(),
            spend,
            sales,
        }
    }
}

/// A numeric result that may be explicitly undefined, e.g. the ROI of a
/// channel with zero spend. Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Value(f64),
    Undefined,
}

impl Metric {
    /// `numerator / denominator`, undefined when the denominator is zero.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Metric::Undefined
        } else {
            Metric::Value(numerator / denominator)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Metric::Undefined)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v:.4}"),
            Metric::Undefined => f.write_str("undefined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse_variants() {
        assert_eq!(
            Period::parse("2024-01-07"),
            Period::Date(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap())
        );
        assert_eq!(Period::parse(" 12 "), Period::Ordinal(12));
        assert_eq!(Period::parse("W01"), Period::Label("W01".to_string()));
    }

    #[test]
    fn test_whole_decimal_text_is_an_ordinal() {
        assert_eq!(Period::parse("1.0"), Period::Ordinal(1));
        assert_eq!(Period::parse("-4.0"), Period::Ordinal(-4));
        assert_eq!(Period::parse("1.5"), Period::Label("1.5".to_string()));
        assert_eq!(Period::parse("NaN"), Period::Label("NaN".to_string()));
        assert_eq!(Period::integral(1.0), Some(1));
        assert_eq!(Period::integral(f64::INFINITY), None);
    }

    #[test]
    fn test_blank_label_period() {
        assert!(Period::Label("  ".into()).is_blank());
        assert!(!Period::Label("W01".into()).is_blank());
        assert!(!Period::Ordinal(0).is_blank());
    }

    #[test]
    fn test_period_ordering_is_total() {
        let mut periods = vec![
            Period::Label("b".into()),
            Period::Ordinal(3),
            Period::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            Period::Ordinal(1),
        ];
        periods.sort();
        assert!(matches!(periods[0], Period::Date(_)));
        assert_eq!(periods[1], Period::Ordinal(1));
        assert_eq!(periods[2], Period::Ordinal(3));
        assert_eq!(periods[3], Period::Label("b".into()));
    }

    #[test]
    fn test_metric_ratio_zero_denominator() {
        assert_eq!(Metric::ratio(5.0, 0.0), Metric::Undefined);
        assert_eq!(Metric::ratio(5.0, 2.0), Metric::Value(2.5));
    }

    #[test]
    fn test_metric_serializes_undefined_as_null() {
        let json = serde_json::to_string(&vec![Metric::Value(1.5), Metric::Undefined]).unwrap();
        assert_eq!(json, "[1.5,null]");
    }

    #[test]
    fn test_column_index_case_insensitive() {
        let table = RawTable::new(vec!["Date".into(), " channel ".into()]);
        assert_eq!(table.column_index(&["date"]), Some(0));
        assert_eq!(table.column_index(&["Channel"]), Some(1));
        assert_eq!(table.column_index(&["spend"]), None);
    }

    #[test]
    fn test_cell_from_blank_text_is_empty() {
        assert_eq!(Cell::from("  "), Cell::Empty);
        assert!(Cell::Text(" ".into()).is_empty());
        assert!(!Cell::Number(0.0).is_empty());
    }
}
