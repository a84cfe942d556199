use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{RollRecord, RollTable};
use crate::error::{DashboardError, DashboardResult};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a roll table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – the cleaned table as written by pandas `to_csv`
/// * `.json`    – `[{ "Episode_Num": 1, "Character": "Beau", ... }, ...]`
/// * `.parquet` – one column per field, any of the usual pandas dtypes
pub fn load_file(path: &Path) -> Result<RollTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    if !table.nat_conflicts().is_empty() {
        log::warn!(
            "{} rows in {} are flagged as both Nat 1 and Nat 20 (first at row {})",
            table.nat_conflicts().len(),
            path.display(),
            table.nat_conflicts()[0]
        );
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Memoized loading
// ---------------------------------------------------------------------------

/// Loads each dataset location at most once per process.
///
/// The first successful load is kept for the lifetime of the cache; later
/// calls hand out the same `Arc` without touching storage. Failures are not
/// cached, so a fixed file can be retried.
#[derive(Debug, Default)]
pub struct DatasetCache {
    tables: Mutex<HashMap<PathBuf, Arc<RollTable>>>,
}

impl DatasetCache {
    /// The process-wide cache used by the dashboard.
    pub fn global() -> &'static DatasetCache {
        static CACHE: OnceLock<DatasetCache> = OnceLock::new();
        CACHE.get_or_init(DatasetCache::default)
    }

    pub fn get_or_load(&self, path: &Path) -> DashboardResult<Arc<RollTable>> {
        let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(table) = tables.get(&key) {
            log::debug!("Using cached table for {}", key.display());
            return Ok(Arc::clone(table));
        }

        let table = load_file(path).map_err(|e| {
            log::error!("Failed to load {}: {e:#}", path.display());
            DashboardError::data_unavailable(path, &e)
        })?;
        log::info!(
            "Loaded {} rolls ({} characters, {} roll categories) from {}",
            table.len(),
            table.characters().len(),
            table.categories().len(),
            path.display()
        );

        let table = Arc::new(table);
        tables.insert(key, Arc::clone(&table));
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Column layout shared by every format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Episode,
    Character,
    Category,
    TotalValue,
    Nat1,
    Nat20,
    Damage,
    Kills,
}

impl Column {
    const ALL: [Column; 8] = [
        Column::Episode,
        Column::Character,
        Column::Category,
        Column::TotalValue,
        Column::Nat1,
        Column::Nat20,
        Column::Damage,
        Column::Kills,
    ];

    fn header(self) -> &'static str {
        match self {
            Column::Episode => "Episode_Num",
            Column::Character => "Character",
            Column::Category => "Roll Category",
            Column::TotalValue => "Total Value",
            Column::Nat1 => "Is_Nat1",
            Column::Nat20 => "Is_Nat20",
            Column::Damage => "Damage",
            Column::Kills => "Kills",
        }
    }

    /// Identity columns keep their cell text exactly as written.
    fn is_text(self) -> bool {
        matches!(self, Column::Character | Column::Category)
    }

    /// Index of the column in [`Column::ALL`].
    fn slot(self) -> usize {
        self as usize
    }
}

/// Position of every required column in a source with the given headers.
fn locate_columns(headers: &[&str]) -> Result<[usize; 8]> {
    let mut slots = [0usize; 8];
    for col in Column::ALL {
        slots[col.slot()] = headers
            .iter()
            .position(|h| h.trim() == col.header())
            .with_context(|| format!("missing '{}' column", col.header()))?;
    }
    Ok(slots)
}

// ---------------------------------------------------------------------------
// Cell – one loosely typed source value
// ---------------------------------------------------------------------------

/// A source cell before it is coerced into a typed record field.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// A text cell; only an empty string counts as missing.
    fn text(s: &str) -> Cell {
        if s.is_empty() {
            Cell::Null
        } else {
            Cell::Text(s.to_string())
        }
    }

    /// Parse a raw string for `col`: verbatim for identity columns, type
    /// guessed for everything else.
    fn parse(col: Column, s: &str) -> Cell {
        if col.is_text() {
            Cell::text(s)
        } else {
            Cell::guess(s)
        }
    }

    fn guess(s: &str) -> Cell {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("nan") {
            return Cell::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Cell::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Cell::Float(f);
        }
        if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
            return Cell::Bool(s.eq_ignore_ascii_case("true"));
        }
        Cell::Text(s.to_string())
    }

    fn from_json(col: Column, val: &JsonValue) -> Cell {
        match val {
            JsonValue::Null => Cell::Null,
            JsonValue::Bool(b) => Cell::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Cell::Integer(i)
                } else {
                    n.as_f64().map_or(Cell::Null, Cell::Float)
                }
            }
            JsonValue::String(s) => Cell::parse(col, s),
            other => Cell::Text(other.to_string()),
        }
    }

    fn into_episode(self) -> Result<i64> {
        match self {
            Cell::Integer(i) => Ok(i),
            Cell::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
            other => bail!("episode must be an integer, got {other:?}"),
        }
    }

    fn into_text(self) -> Result<String> {
        match self {
            Cell::Text(s) => Ok(s),
            Cell::Integer(i) => Ok(i.to_string()),
            Cell::Float(f) => Ok(f.to_string()),
            Cell::Bool(b) => Ok(b.to_string()),
            Cell::Null => bail!("value is missing"),
        }
    }

    fn into_flag(self) -> Result<bool> {
        match self {
            Cell::Null => Ok(false),
            Cell::Bool(b) => Ok(b),
            Cell::Integer(i) => Ok(i != 0),
            Cell::Float(f) => Ok(f != 0.0 && !f.is_nan()),
            Cell::Text(s) => bail!("'{s}' is not a boolean flag"),
        }
    }

    fn into_value(self) -> Result<Option<f64>> {
        match self {
            Cell::Null => Ok(None),
            Cell::Integer(i) => Ok(Some(i as f64)),
            Cell::Float(f) if f.is_nan() => Ok(None),
            Cell::Float(f) => Ok(Some(f)),
            Cell::Bool(b) => Ok(Some(if b { 1.0 } else { 0.0 })),
            Cell::Text(s) => bail!("'{s}' is not a number"),
        }
    }
}

/// Coerce one row of cells (in [`Column::ALL`] order) into a record.
fn record_from_cells(mut cells: [Cell; 8]) -> Result<RollRecord> {
    let mut take = |col: Column| std::mem::replace(&mut cells[col.slot()], Cell::Null);
    let field = |col: Column| format!("'{}'", col.header());

    Ok(RollRecord {
        episode_num: take(Column::Episode)
            .into_episode()
            .with_context(|| field(Column::Episode))?,
        character: take(Column::Character)
            .into_text()
            .with_context(|| field(Column::Character))?,
        roll_category: take(Column::Category)
            .into_text()
            .with_context(|| field(Column::Category))?,
        total_value: take(Column::TotalValue)
            .into_value()
            .with_context(|| field(Column::TotalValue))?,
        is_nat1: take(Column::Nat1)
            .into_flag()
            .with_context(|| field(Column::Nat1))?,
        is_nat20: take(Column::Nat20)
            .into_flag()
            .with_context(|| field(Column::Nat20))?,
        damage: take(Column::Damage)
            .into_value()
            .with_context(|| field(Column::Damage))?
            .unwrap_or(0.0),
        kills: take(Column::Kills)
            .into_value()
            .with_context(|| field(Column::Kills))?
            .unwrap_or(0.0),
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with the column names above, one roll per line.
/// Unknown columns (such as a pandas index column) are ignored.
fn load_csv(path: &Path) -> Result<RollTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    let names: Vec<&str> = headers.iter().collect();
    let slots = locate_columns(&names).context("CSV header")?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut cells = Column::ALL.map(|_| Cell::Null);
        for (col, idx) in Column::ALL.into_iter().zip(slots) {
            cells[col.slot()] = Cell::parse(col, row.get(idx).unwrap_or(""));
        }
        records.push(record_from_cells(cells).with_context(|| format!("CSV row {row_no}"))?);
    }

    Ok(RollTable::from_records(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Episode_Num": 1, "Character": "Beau", "Roll Category": "Attack",
///     "Total Value": 17, "Is_Nat1": false, "Is_Nat20": false,
///     "Damage": 8, "Kills": 0 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RollTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut cells = Column::ALL.map(|_| Cell::Null);
        for col in Column::ALL {
            let val = obj
                .get(col.header())
                .with_context(|| format!("Row {i}: missing '{}'", col.header()))?;
            cells[col.slot()] = Cell::from_json(col, val);
        }
        records.push(record_from_cells(cells).with_context(|| format!("Row {i}"))?);
    }

    Ok(RollTable::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding the roll table.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`): integer, float, boolean and string
/// columns are all accepted and coerced per field.
fn load_parquet(path: &Path) -> Result<RollTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        let slots = locate_columns(&names).context("parquet schema")?;
        let columns = slots.map(|idx| batch.column(idx));

        for row in 0..batch.num_rows() {
            let row_no = records.len();
            let mut cells = Column::ALL.map(|_| Cell::Null);
            for (col, array) in Column::ALL.into_iter().zip(columns.iter()) {
                cells[col.slot()] = arrow_cell(col, array, row)
                    .with_context(|| format!("Row {row_no}: '{}'", col.header()))?;
            }
            records.push(record_from_cells(cells).with_context(|| format!("Row {row_no}"))?);
        }
    }

    Ok(RollTable::from_records(records))
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(column: Column, array: &ArrayRef, row: usize) -> Result<Cell> {
    if array.is_null(row) {
        return Ok(Cell::Null);
    }
    let cell = match array.data_type() {
        DataType::Utf8 => Cell::parse(column, array.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => Cell::parse(column, array.as_string::<i64>().value(row)),
        DataType::Int32 => Cell::Integer(array.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Cell::Integer(array.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Cell::Float(array.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Cell::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Cell::Bool(array.as_boolean().value(row)),
        DataType::Null => Cell::Null,
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    const HEADER: &str = ",Episode_Num,Character,Roll Category,Total Value,Is_Nat1,Is_Nat20,Damage,Kills";

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_accepts_pandas_output() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{HEADER}\n\
             0,1,Beau,Attack,17,False,False,8.0,1.0\n\
             1,1,Jester,Skill Check,,True,False,,\n\
             2,2,DM,Attack,24.0,0,1,3,0\n"
        );
        let path = write_file(&dir, "rolls.csv", &body);

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 3);
        let recs = table.records();
        assert_eq!(recs[0].total_value, Some(17.0));
        assert_eq!(recs[0].damage, 8.0);
        assert_eq!(recs[0].kills, 1.0);
        assert_eq!(recs[1].total_value, None);
        assert!(recs[1].is_nat1);
        assert_eq!(recs[1].damage, 0.0);
        assert!(recs[2].is_nat20);
        assert_eq!(table.episode_bounds(), Some((1, 2)));
    }

    #[test]
    fn csv_missing_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "rolls.csv", "Episode_Num,Character\n1,Beau\n");
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Roll Category"));
    }

    #[test]
    fn csv_non_numeric_damage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{HEADER}\n0,1,Beau,Attack,17,False,False,lots,0\n");
        let path = write_file(&dir, "rolls.csv", &body);
        let err = load_file(&path).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("CSV row 0"), "{msg}");
        assert!(msg.contains("'Damage'"), "{msg}");
    }

    #[test]
    fn json_records_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"[
            {"Episode_Num": 4, "Character": "Caleb", "Roll Category": "Spell Attack",
             "Total Value": 19, "Is_Nat1": false, "Is_Nat20": true, "Damage": 12.5, "Kills": 2},
            {"Episode_Num": 5, "Character": "Yasha", "Roll Category": "Attack",
             "Total Value": null, "Is_Nat1": 0, "Is_Nat20": 0, "Damage": null, "Kills": null}
        ]"#;
        let path = write_file(&dir, "rolls.json", body);

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.records()[0].is_nat20);
        assert_eq!(table.records()[0].damage, 12.5);
        assert_eq!(table.records()[1].total_value, None);
        assert_eq!(table.records()[1].kills, 0.0);
    }

    #[test]
    fn csv_names_and_categories_are_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{HEADER}\n\
             0,1,007,1.50,12,False,False,0,0\n\
             1,1,True,nan,9,False,False,0,0\n\
             2,2, Pike ,Inf,3,False,False,0,0\n"
        );
        let path = write_file(&dir, "rolls.csv", &body);

        let table = load_file(&path).unwrap();
        let recs = table.records();
        assert_eq!(recs[0].character, "007");
        assert_eq!(recs[0].roll_category, "1.50");
        assert_eq!(recs[1].character, "True");
        assert_eq!(recs[1].roll_category, "nan");
        assert_eq!(recs[2].character, " Pike ");
        assert_eq!(recs[2].roll_category, "Inf");
    }

    #[test]
    fn json_string_names_are_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"[
            {"Episode_Num": 1, "Character": "007", "Roll Category": "1.50",
             "Total Value": "12", "Is_Nat1": "False", "Is_Nat20": false, "Damage": 0, "Kills": 0},
            {"Episode_Num": 2, "Character": "True", "Roll Category": "NaN",
             "Total Value": null, "Is_Nat1": false, "Is_Nat20": false, "Damage": 0, "Kills": 0}
        ]"#;
        let path = write_file(&dir, "rolls.json", body);

        let table = load_file(&path).unwrap();
        let recs = table.records();
        assert_eq!(recs[0].character, "007");
        assert_eq!(recs[0].roll_category, "1.50");
        assert_eq!(recs[0].total_value, Some(12.0));
        assert!(!recs[0].is_nat1);
        assert_eq!(recs[1].character, "True");
        assert_eq!(recs[1].roll_category, "NaN");
    }

    #[test]
    fn empty_character_is_still_missing() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{HEADER}\n0,1,,Attack,12,False,False,0,0\n");
        let path = write_file(&dir, "rolls.csv", &body);
        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("'Character'"));
    }

    #[test]
    fn parquet_columns_are_coerced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rolls.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("Episode_Num", DataType::Int64, false),
            Field::new("Character", DataType::Utf8, false),
            Field::new("Roll Category", DataType::Utf8, false),
            Field::new("Total Value", DataType::Float64, true),
            Field::new("Is_Nat1", DataType::Boolean, false),
            Field::new("Is_Nat20", DataType::Boolean, false),
            Field::new("Damage", DataType::Float64, true),
            Field::new("Kills", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec!["Fjord", "Molly"])),
                Arc::new(StringArray::from(vec!["Attack", "Save"])),
                Arc::new(Float64Array::from(vec![Some(11.0), None])),
                Arc::new(BooleanArray::from(vec![true, false])),
                Arc::new(BooleanArray::from(vec![false, false])),
                Arc::new(Float64Array::from(vec![Some(6.0), None])),
                Arc::new(Int64Array::from(vec![1, 0])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.characters(), ["Fjord", "Molly"]);
        assert!(table.records()[0].is_nat1);
        assert_eq!(table.records()[0].kills, 1.0);
        assert_eq!(table.records()[1].total_value, None);
        assert_eq!(table.records()[1].damage, 0.0);
    }

    #[test]
    fn unsupported_extension_fails() {
        let err = load_file(Path::new("rolls.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn cache_reads_storage_once() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{HEADER}\n0,1,Beau,Attack,17,False,False,8,1\n");
        let path = write_file(&dir, "rolls.csv", &body);

        let cache = DatasetCache::default();
        let first = cache.get_or_load(&path).unwrap();
        // The second call must not touch the file again.
        std::fs::remove_file(&path).unwrap();
        let second = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cache_reports_data_unavailable() {
        let cache = DatasetCache::default();
        let err = cache
            .get_or_load(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, DashboardError::DataUnavailable { .. }));
    }
}
