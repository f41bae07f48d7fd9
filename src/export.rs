use crate::Entry;
use crate::graph::Graph;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(
    value: &T,
    path: P,
) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value).map_err(std::io::Error::other)
}

pub fn write_csv<T: Serialize>(writer: impl Write, records: &[T]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(Into::into)
}

pub fn save_entries_csv<P: AsRef<Path>>(path: P, entries: &[Entry]) -> csv::Result<()> {
    write_csv(std::fs::File::create(path)?, entries)
}

pub fn save_entries_json<P: AsRef<Path>>(path: P, entries: &[Entry]) -> std::io::Result<()> {
    write_json(entries, path)
}

/// Write the graph as an SVG document.
pub fn save_graph_svg<P: AsRef<Path>>(path: P, graph: &Graph) -> std::io::Result<()> {
    std::fs::write(path, crate::svg::render(graph).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate, TimeZone};

    fn sample_entries() -> Vec<Entry> {
        vec![
            Entry::new(80.0, Local.with_ymd_and_hms(2024, 1, 2, 7, 30, 0).unwrap()),
            Entry::new(79.25, Local.with_ymd_and_hms(2024, 1, 9, 7, 45, 0).unwrap()),
        ]
    }

    #[test]
    fn csv_has_header_and_rows() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &sample_entries()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("weight,timestamp"));
        assert!(lines.next().unwrap().starts_with("80.0,2024-01-02T07:30:00"));
        assert!(lines.next().unwrap().starts_with("79.25,2024-01-09T07:45:00"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn json_export_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries.json");
        save_entries_json(&path, &sample_entries()).unwrap();
        let loaded: Vec<Entry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, sample_entries());
    }

    #[test]
    fn svg_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.svg");
        let month = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let graph = crate::graph::build_graph(&sample_entries(), month);
        save_graph_svg(&path, &graph).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("<svg"));
    }
}
