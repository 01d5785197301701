//! Snapshot exporters
//!
//! Renders a store [`Snapshot`] as structured JSON or as a boxed text dump.
//! Rendering works on the copy only and takes no locks.

use crate::db::Snapshot;
use crate::types::{Category, TableValues};
use anyhow::{Context, Result};
use std::{
    fmt::Write as _,
    fs::File,
    io::{self, Write},
    path::PathBuf,
};

/// Heading of the text dump
pub const TEXT_HEADING: &str = "-+= DB =+-";

/// Width of the value column in the text dump
const VALUE_WIDTH: usize = 8;

/// Trait for snapshot exporters
pub trait SnapshotExporter {
    /// Render the snapshot
    fn render(&self, snapshot: &Snapshot) -> Result<String>;

    /// Where the rendering is written, stdout when `None`
    fn output_path(&self) -> Option<&PathBuf>;

    /// Render and write the snapshot
    ///
    /// # Arguments
    ///
    /// * `snapshot` - Consistent copy of the store
    ///
    /// # Returns
    ///
    /// Result indicating success or failure
    fn export(&self, snapshot: &Snapshot) -> Result<()> {
        let rendered = self.render(snapshot)?;

        match self.output_path() {
            Some(path) => {
                let mut file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {:?}", path))?;
                file.write_all(rendered.as_bytes())
                    .with_context(|| format!("Failed to write to output file: {:?}", path))?;
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(rendered.as_bytes())
                    .context("Failed to write to stdout")?;
                stdout.flush().context("Failed to flush stdout")?;
            }
        }

        Ok(())
    }
}

/// Export format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterType {
    /// JSON array of connections
    Json,
    /// Boxed tables per connection
    Text,
}

/// JSON exporter
pub struct JsonExporter {
    output_path: Option<PathBuf>,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file, stdout if `None`
    /// * `pretty` - Enable pretty-printing
    pub fn new(output_path: Option<PathBuf>, pretty: bool) -> Self {
        Self {
            output_path,
            pretty,
        }
    }

    fn to_json(snapshot: &Snapshot, pretty: bool) -> Result<String> {
        let connections = snapshot.to_export();
        let json = if pretty {
            serde_json::to_string_pretty(&connections)?
        } else {
            serde_json::to_string(&connections)?
        };
        Ok(json)
    }
}

impl SnapshotExporter for JsonExporter {
    fn render(&self, snapshot: &Snapshot) -> Result<String> {
        let mut json = Self::to_json(snapshot, self.pretty)?;
        json.push('\n');
        Ok(json)
    }

    fn output_path(&self) -> Option<&PathBuf> {
        self.output_path.as_ref()
    }
}

/// Human-readable table exporter
pub struct TextExporter {
    output_path: Option<PathBuf>,
}

impl TextExporter {
    /// Create a new text exporter
    ///
    /// # Arguments
    ///
    /// * `output_path` - Path to output file, stdout if `None`
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    /// Render every connection of the snapshot
    fn to_text(snapshot: &Snapshot) -> String {
        let mut output = String::new();
        output.push_str(TEXT_HEADING);
        output.push('\n');

        for (key, tables) in &snapshot.connections {
            output.push_str(&key.to_string());
            output.push('\n');

            for category in Category::ALL {
                let _ = writeln!(output, "..- {} -..", category.name());
                output.push_str(&table_to_text(tables.get(category)));
                output.push('\n');
            }

            output.push('\n');
        }

        output
    }
}

impl SnapshotExporter for TextExporter {
    fn render(&self, snapshot: &Snapshot) -> Result<String> {
        Ok(Self::to_text(snapshot))
    }

    fn output_path(&self) -> Option<&PathBuf> {
        self.output_path.as_ref()
    }
}

/// Render one table as a two-column box
///
/// Names are right-aligned to the longest name in the table and rows are
/// sorted by name. The closing border carries no trailing newline.
pub fn table_to_text(values: &TableValues) -> String {
    let key_len = values.keys().map(String::len).max().unwrap_or(0);
    let border = format!(
        "+{}+{}+",
        "-".repeat(key_len + 2),
        "-".repeat(VALUE_WIDTH + 2)
    );

    let mut output = String::new();
    output.push_str(&border);
    output.push('\n');

    // BTreeMap iterates in name order
    for (name, value) in values {
        let _ = writeln!(
            output,
            "| {:>key_len$} | {:>value_width$} |",
            name,
            value,
            key_len = key_len,
            value_width = VALUE_WIDTH
        );
    }

    output.push_str(&border);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::NATIVE;
    use crate::types::{ConnectionKey, TablesExport};
    use chrono::Utc;
    use std::net::Ipv4Addr;

    fn create_test_snapshot() -> Snapshot {
        let key = ConnectionKey {
            pid_tgid: 12345,
            saddr: NATIVE.pack_ipv4(Ipv4Addr::new(127, 0, 0, 1)),
            daddr: NATIVE.pack_ipv4(Ipv4Addr::new(10, 0, 0, 2)),
            sport: 8080,
            dport: 443,
        };

        let mut tables = TablesExport::default();
        tables.perf.insert("PERF_TABLE_SEGSOUT".to_string(), 15);
        tables.perf.insert("PERF_TABLE_DATASEGSOUT".to_string(), 9);
        tables.extras.insert("EXTRAS_TABLE_PRIORITY".to_string(), 42);

        Snapshot {
            taken_at: Utc::now(),
            connections: vec![(key, tables)],
        }
    }

    #[test]
    fn test_table_format() {
        let mut values = TableValues::new();
        values.insert("EXTRAS_TABLE_PRIORITY".to_string(), 42);

        let want = "+-----------------------+----------+\n\
                    | EXTRAS_TABLE_PRIORITY |       42 |\n\
                    +-----------------------+----------+";

        assert_eq!(table_to_text(&values), want);
    }

    #[test]
    fn test_table_rows_sorted_and_right_aligned() {
        let mut values = TableValues::new();
        values.insert("PERF_TABLE_SEGSOUT".to_string(), 15);
        values.insert("PERF_TABLE_DATASEGSOUT".to_string(), 9);

        let text = table_to_text(&values);
        let rows: Vec<&str> = text.lines().collect();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], "| PERF_TABLE_DATASEGSOUT |        9 |");
        assert_eq!(rows[2], "|     PERF_TABLE_SEGSOUT |       15 |");
    }

    #[test]
    fn test_empty_table_format() {
        assert_eq!(
            table_to_text(&TableValues::new()),
            "+--+----------+\n+--+----------+"
        );
    }

    #[test]
    fn test_text_format() {
        let text = TextExporter::to_text(&create_test_snapshot());

        assert!(text.starts_with("-+= DB =+-\n[P: 12345, S: 127.0.0.1:8080, D: 10.0.0.2:443]\n..- global -..\n"));
        assert!(text.contains("..- extras -..\n+-----------------------+----------+\n"));
        assert!(text.ends_with("+-----------------------+----------+\n\n"));

        let banners: Vec<&str> = text.lines().filter(|l| l.starts_with("..-")).collect();
        assert_eq!(
            banners,
            vec![
                "..- global -..",
                "..- connection -..",
                "..- perf -..",
                "..- path -..",
                "..- stack -..",
                "..- app -..",
                "..- extras -..",
            ]
        );
    }

    #[test]
    fn test_text_export_is_deterministic() {
        let snapshot = create_test_snapshot();

        assert_eq!(
            TextExporter::to_text(&snapshot),
            TextExporter::to_text(&snapshot)
        );
    }

    #[test]
    fn test_json_format() {
        let json = JsonExporter::to_json(&create_test_snapshot(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["saddr"], "127.0.0.1:8080");
        assert_eq!(value[0]["daddr"], "10.0.0.2:443");
        assert_eq!(value[0]["tables"]["perf"]["PERF_TABLE_SEGSOUT"], 15);
        assert_eq!(value[0]["tables"]["extras"]["EXTRAS_TABLE_PRIORITY"], 42);
        assert!(value[0]["tables"]["stack"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_json_empty_snapshot() {
        let snapshot = Snapshot {
            taken_at: Utc::now(),
            connections: Vec::new(),
        };

        assert_eq!(JsonExporter::to_json(&snapshot, false).unwrap(), "[]");
    }
}
