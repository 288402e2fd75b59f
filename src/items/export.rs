use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::items::record::{ItemRecord, COLUMNS};

const FILE_PREFIX: &str = "qbo_items";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Writes the batch as CSV with a fixed header row, even when empty.
pub fn write_csv<W: Write>(writer: W, records: &[ItemRecord]) -> Result<(), AppError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(mut writer: W, records: &[ItemRecord]) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes `qbo_items_<timestamp>.csv` and `.json` into `dir`. The timestamp
/// is taken here so repeated runs never overwrite earlier exports.
pub fn export_batch(dir: &Path, records: &[ItemRecord]) -> Result<ExportPaths, AppError> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    export_batch_with_timestamp(dir, records, &timestamp)
}

pub fn export_batch_with_timestamp(
    dir: &Path,
    records: &[ItemRecord],
    timestamp: &str,
) -> Result<ExportPaths, AppError> {
    std::fs::create_dir_all(dir)?;
    let paths = ExportPaths {
        csv: dir.join(format!("{FILE_PREFIX}_{timestamp}.csv")),
        json: dir.join(format!("{FILE_PREFIX}_{timestamp}.json")),
    };

    write_csv(BufWriter::new(File::create(&paths.csv)?), records)?;
    write_json(BufWriter::new(File::create(&paths.json)?), records)?;
    log::debug!("Wrote {} items to {:?} and {:?}", records.len(), paths.csv, paths.json);

    Ok(paths)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    /// Count per item type, sorted by type name.
    pub by_type: BTreeMap<String, usize>,
}

impl ExportSummary {
    pub fn from_records(records: &[ItemRecord]) -> Self {
        let active = records.iter().filter(|r| r.active).count();
        let mut by_type = BTreeMap::new();
        for record in records {
            *by_type.entry(record.item_type.clone()).or_insert(0) += 1;
        }
        Self {
            total: records.len(),
            active,
            inactive: records.len() - active,
            by_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::record::{QtyOnHand, RawItem};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn sample() -> Vec<ItemRecord> {
        let raw: Vec<RawItem> = serde_json::from_value(json!([
            { "Id": "1", "Name": "Rock Fountain", "Type": "Inventory", "UnitPrice": 275, "QtyOnHand": 2,
              "MetaData": { "LastUpdatedTime": "2024-03-05T10:12:00-08:00" } },
            { "Id": "2", "Name": "Design, \"premium\"", "Type": "Service", "Active": false, "Description": "Über hours" },
            { "Id": "3", "Name": "Pump", "Type": "Inventory", "Sku": "P-1" }
        ]))
        .unwrap();
        crate::items::record::normalize(raw)
    }

    fn csv_value_of(json: &Value) -> String {
        match json {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    #[test]
    fn csv_and_json_hold_the_same_records() {
        let dir = tempdir().unwrap();
        let records = sample();
        let paths = export_batch_with_timestamp(dir.path(), &records, "20240101_120000").unwrap();

        assert_eq!(paths.csv, dir.path().join("qbo_items_20240101_120000.csv"));
        assert_eq!(paths.json, dir.path().join("qbo_items_20240101_120000.json"));

        let json_rows: Vec<serde_json::Map<String, Value>> =
            serde_json::from_reader(File::open(&paths.json).unwrap()).unwrap();

        let mut reader = csv::Reader::from_path(&paths.csv).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, COLUMNS.to_vec());

        let csv_rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(csv_rows.len(), records.len());
        assert_eq!(json_rows.len(), records.len());

        for (csv_row, json_row) in csv_rows.iter().zip(&json_rows) {
            let json_keys: Vec<&str> = json_row.keys().map(String::as_str).collect();
            assert_eq!(json_keys.len(), COLUMNS.len());
            for (idx, column) in COLUMNS.iter().enumerate() {
                assert_eq!(csv_row.get(idx).unwrap(), csv_value_of(&json_row[*column]), "{column}");
            }
        }
    }

    #[test]
    fn json_keeps_type_information() {
        let mut buf = Vec::new();
        write_json(&mut buf, &sample()).unwrap();
        let rows: Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(rows[0]["Qty_On_Hand"], json!(2));
        assert_eq!(rows[0]["Unit_Price"], json!(275));
        assert_eq!(rows[1]["Qty_On_Hand"], json!("N/A"));
        assert_eq!(rows[1]["Active"], json!(false));
        assert_eq!(rows[2]["Qty_On_Hand"], json!(""));
        assert!(String::from_utf8(buf).unwrap().contains("Über hours"));
    }

    #[test]
    fn empty_batch_still_gets_header() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "QBO_ID,Name,Type,Active,Description,Unit_Price,SKU,Qty_On_Hand,Full_Name,Last_Modified\n"
        );
    }

    #[test]
    fn summary_counts_by_sorted_type() {
        let summary = ExportSummary::from_records(&sample());

        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.inactive, 1);
        assert_eq!(
            summary.by_type.into_iter().collect::<Vec<_>>(),
            vec![("Inventory".to_string(), 2), ("Service".to_string(), 1)]
        );
    }

    #[test]
    fn csv_keeps_integer_amounts() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &sample()[..1]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with(
            "1,Rock Fountain,Inventory,true,,275,,2,Rock Fountain,2024-03-05T10:12:00-08:00\n"
        ));
    }

    #[test]
    fn unknown_quantity_is_empty_in_csv() {
        let mut buf = Vec::new();
        let records = sample();
        assert_eq!(records[2].qty_on_hand, QtyOnHand::Unknown);
        write_csv(&mut buf, &records[2..]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("3,Pump,Inventory,true,,,P-1,,Pump,\n"));
    }
}
