use chrono::NaiveDate;
use serde_json::Value;

/// Datasets offered by the export endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Environmental,
    Projects,
    Notifications,
}

impl ExportKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "environmental" => Some(Self::Environmental),
            "projects" => Some(Self::Projects),
            "notifications" => Some(Self::Notifications),
            _ => None,
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Environmental => "environmental_data",
            Self::Projects => "restoration_projects",
            Self::Notifications => "notifications",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    /// Anything other than `csv` is served as JSON.
    pub fn parse(raw: &str) -> Self {
        if raw == "csv" { Self::Csv } else { Self::Json }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}

pub fn export_filename(kind: ExportKind, format: ExportFormat, day: NaiveDate) -> String {
    format!(
        "{}_{}.{}",
        kind.file_stem(),
        day.format("%Y-%m-%d"),
        format.extension()
    )
}

/// CSV with the first row's keys as header; empty input gives an empty document.
pub fn rows_to_csv(rows: &[Value]) -> String {
    let Some(headers) = rows
        .first()
        .and_then(Value::as_object)
        .map(|obj| obj.keys().cloned().collect::<Vec<_>>())
    else {
        return String::new();
    };

    let body = rows.iter().map(|row| {
        headers
            .iter()
            .map(|h| row.get(h).cloned().unwrap_or(Value::Null))
            .collect::<Vec<_>>()
    });
    write_csv(&headers, body)
}

/// Header plus rows joined by `\n`, no trailing newline.
pub fn write_csv<I>(headers: &[String], rows: I) -> String
where
    I: IntoIterator<Item = Vec<Value>>,
{
    let mut lines = vec![headers.join(",")];
    lines.extend(rows.into_iter().map(|row| {
        row.iter()
            .map(csv_cell)
            .collect::<Vec<_>>()
            .join(",")
    }));
    lines.join("\n")
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        nested => quote(&nested.to_string()),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
