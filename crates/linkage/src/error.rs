use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkageError {
    /// Input file cannot be opened or read (includes malformed CSV / gzip).
    #[error("party '{party}': cannot read {path}: {reason}")]
    SourceUnavailable {
        party: String,
        path: String,
        reason: String,
    },
    /// Same record identifier appears twice within one party.
    #[error("party '{party}', line {line}: record id '{record_id}' not unique (first seen on line {first_line})")]
    DuplicateIdentifier {
        party: String,
        record_id: String,
        line: usize,
        first_line: usize,
    },
    /// Configured attribute position exceeds a record's field count.
    #[error("party '{party}', record '{record_id}' (line {line}): attribute position {position} out of range ({field_count} attribute(s))")]
    AttributeIndex {
        party: String,
        record_id: String,
        line: usize,
        position: usize,
        field_count: usize,
    },
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (unknown attribute, bad thresholds, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Block index or overlap was not built from the record store it is paired with.
    #[error("block index does not match record store: {0}")]
    IndexMismatch(String),
    /// Writing the candidate pair stream failed.
    #[error("output error: {0}")]
    Output(String),
}
