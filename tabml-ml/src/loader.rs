use std::io::Read;
use std::path::Path;

use tabml_core::{Column, CoreError, Dataset, Result, Scalar};

/// Parse CSV with a header row into a [`Dataset`].
///
/// Cells are parsed with [`Scalar::parse`]: numbers become numeric cells and
/// empty or `NA`-style cells become missing. Rows whose field count differs
/// from the header are rejected.
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CoreError::MalformedDataset("missing header row".to_string()));
    }

    let mut columns: Vec<Vec<Scalar>> = vec![Vec::new(); headers.len()];
    for record in csv_reader.records() {
        let record = record.map_err(malformed)?;
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            column.push(Scalar::parse(cell));
        }
    }

    let dataset = Dataset::new(
        headers
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect(),
    );
    dataset.validate()?;

    tracing::debug!(
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "Parsed CSV dataset"
    );
    Ok(dataset)
}

pub fn read_csv_bytes(bytes: &[u8]) -> Result<Dataset> {
    read_csv(bytes)
}

pub fn read_csv_path(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| CoreError::Io(format!("failed to open {}: {}", path.display(), e)))?;
    read_csv(std::io::BufReader::new(file))
}

fn malformed(err: csv::Error) -> CoreError {
    CoreError::MalformedDataset(err.to_string())
}
