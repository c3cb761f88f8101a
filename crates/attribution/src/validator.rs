//! Data validator — schema check and typed conversion of ingested rows.
//!
//! Validation is all-or-nothing: either every row converts into a
//! [`RawRecord`] or the whole input is rejected.

use mix_core::config::SchemaConfig;
use mix_core::error::{MixError, MixResult};
use mix_core::types::{Cell, Field, Period, RawRecord, RawTable};
use tracing::debug;

/// Column positions of the four required fields within a [`RawTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub period: usize,
    pub channel: usize,
    pub spend: usize,
    pub sales: usize,
}

/// Resolve the required fields against the table header.
///
/// A field matches its configured column name or its canonical lowercase
/// name, ignoring case. Fails with [`MixError::Schema`] naming every field
/// that could not be resolved.
pub fn resolve_columns(table: &RawTable, schema: &SchemaConfig) -> MixResult<ColumnMap> {
    let lookup = |field: Field| {
        let configured = match field {
            Field::Period => schema.period_column.as_str(),
            Field::Channel => schema.channel_column.as_str(),
            Field::Spend => schema.spend_column.as_str(),
            Field::Sales => schema.sales_column.as_str(),
        };
        table.column_index(&[configured, field.as_str()])
    };

    let resolved = Field::REQUIRED.map(lookup);

    let missing: Vec<Field> = Field::REQUIRED
        .iter()
        .zip(&resolved)
        .filter(|(_, index)| index.is_none())
        .map(|(field, _)| *field)
        .collect();

    match resolved {
        [Some(period), Some(channel), Some(spend), Some(sales)] => Ok(ColumnMap {
            period,
            channel,
            spend,
            sales,
        }),
        _ => Err(MixError::Schema { missing }),
    }
}

/// Validate a raw table and convert every row to a [`RawRecord`].
pub fn validate_table(table: &RawTable, schema: &SchemaConfig) -> MixResult<Vec<RawRecord>> {
    let columns = resolve_columns(table, schema)?;

    let records = (0..table.len())
        .map(|row| {
            // 1-based data rows for error reporting.
            let line = row + 1;
            Ok(RawRecord {
                period: parse_period(table.cell(row, columns.period), line)?,
                channel: parse_channel(table.cell(row, columns.channel), line)?,
                spend: parse_spend(table.cell(row, columns.spend), line)?,
                sales: parse_number(table.cell(row, columns.sales), line, Field::Sales)?,
            })
        })
        .collect::<MixResult<Vec<_>>>()?;

    debug!(rows = records.len(), "Raw table validated");
    Ok(records)
}

/// Check invariants on records that were constructed directly rather than
/// ingested through a [`RawTable`].
pub fn validate_records(records: &[RawRecord]) -> MixResult<()> {
    for (row, record) in records.iter().enumerate() {
        let line = row + 1;
        if record.period.is_blank() {
            return Err(invalid(line, Field::Period, "is empty"));
        }
        if record.channel.trim().is_empty() {
            return Err(invalid(line, Field::Channel, "is empty"));
        }
        check_spend(record.spend, line)?;
        if !record.sales.is_finite() {
            return Err(invalid(line, Field::Sales, "is not a finite number"));
        }
    }
    Ok(())
}

fn parse_period(cell: &Cell, line: usize) -> MixResult<Period> {
    match cell {
        _ if cell.is_empty() => Err(invalid(line, Field::Period, "is empty")),
        Cell::Number(n) => Period::integral(*n).map(Period::Ordinal).ok_or_else(|| {
            invalid(line, Field::Period, &format!("is not an ordinal or date: {n}"))
        }),
        Cell::Text(text) => Ok(Period::parse(text)),
        Cell::Empty => Err(invalid(line, Field::Period, "is empty")),
    }
}

fn parse_channel(cell: &Cell, line: usize) -> MixResult<String> {
    match cell {
        _ if cell.is_empty() => Err(invalid(line, Field::Channel, "is empty")),
        Cell::Text(text) => Ok(text.trim().to_string()),
        Cell::Number(n) => Ok(n.to_string()),
        Cell::Empty => Err(invalid(line, Field::Channel, "is empty")),
    }
}

fn parse_spend(cell: &Cell, line: usize) -> MixResult<f64> {
    let spend = parse_number(cell, line, Field::Spend)?;
    check_spend(spend, line)?;
    Ok(spend)
}

fn parse_number(cell: &Cell, line: usize, field: Field) -> MixResult<f64> {
    let value = match cell {
        _ if cell.is_empty() => return Err(invalid(line, field, "is empty")),
        Cell::Number(n) => *n,
        Cell::Text(text) => text.trim().parse::<f64>().map_err(|_| {
            invalid(line, field, &format!("is not numeric: {:?}", text.trim()))
        })?,
        Cell::Empty => return Err(invalid(line, field, "is empty")),
    };
    if !value.is_finite() {
        return Err(invalid(line, field, "is not a finite number"));
    }
    Ok(value)
}

fn check_spend(spend: f64, line: usize) -> MixResult<()> {
    if !spend.is_finite() {
        return Err(invalid(line, Field::Spend, "is not a finite number"));
    }
    if spend < 0.0 {
        return Err(invalid(
            line,
            Field::Spend,
            &format!("must be non-negative, got {spend}"),
        ));
    }
    Ok(())
}

fn invalid(row: usize, field: Field, reason: &str) -> MixError {
    MixError::InvalidRecord {
        row,
        field,
        reason: reason.to_string(),
    }
}
