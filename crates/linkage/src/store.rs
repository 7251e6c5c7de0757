use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::LinkageError;
use crate::model::{Party, Record, RecordStore};

/// Open a party file, decompressing when the name ends in `.gz`.
pub fn open_source(label: &str, path: &Path) -> Result<Box<dyn Read>, LinkageError> {
    let file = File::open(path).map_err(|e| LinkageError::SourceUnavailable {
        party: label.into(),
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let gzipped = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if gzipped {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Load one party's file into a record store.
///
/// `width` is the minimum attribute count every record must have (after the id).
pub fn load_party(
    party: Party,
    label: &str,
    path: &Path,
    width: usize,
) -> Result<RecordStore, LinkageError> {
    log::info!("load data file: {}", path.display());
    let reader = open_source(label, path)?;
    let store = load_records(party, label, &path.display().to_string(), reader, width)?;
    log::info!("read {} records of {}", store.len(), label);
    Ok(store)
}

/// Parse comma-separated records with a header line. Fields are trimmed and
/// lower-cased; the first field is the record id.
pub fn load_records<R: Read>(
    party: Party,
    label: &str,
    source_name: &str,
    reader: R,
    width: usize,
) -> Result<RecordStore, LinkageError> {
    let unavailable = |reason: String| LinkageError::SourceUnavailable {
        party: label.into(),
        path: source_name.into(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Forces the header read so an unreadable stream fails here.
    rdr.headers().map_err(|e| unavailable(e.to_string()))?;

    let mut store = RecordStore::new(party, label);
    for result in rdr.records() {
        let row = result.map_err(|e| unavailable(e.to_string()))?;
        let line = row.position().map(|p| p.line() as usize).unwrap_or(0);

        let mut fields = row.iter().map(str::to_lowercase);
        let Some(id) = fields.next() else {
            continue;
        };
        let fields: Vec<String> = fields.collect();

        if fields.len() < width {
            return Err(LinkageError::AttributeIndex {
                party: label.into(),
                record_id: id,
                line,
                position: width - 1,
                field_count: fields.len(),
            });
        }

        store.insert(Record::new(id, fields, line))?;
    }

    Ok(store)
}
