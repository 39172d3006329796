use std::fmt;

use serde_json::Value;

#[derive(Debug)]
pub enum ExportError {
    Csv(csv::Error),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Csv(err) => write!(f, "failed to write csv: {err}"),
            ExportError::Io(err) => write!(f, "failed to flush csv: {err}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Csv(err) => Some(err),
            ExportError::Io(err) => Some(err),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Renders rows as CSV. The header is the first row's keys in sorted order; strings are written as
/// is, nulls and missing keys as empty cells, and anything else as compact JSON.
pub fn export_csv(rows: &[Value]) -> Result<String, ExportError> {
    let Some(Value::Object(first)) = rows.first() else {
        return Ok(String::new());
    };
    let mut headers: Vec<&str> = first.keys().map(String::as_str).collect();
    headers.sort_unstable();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|header| cell(row.get(*header))))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
