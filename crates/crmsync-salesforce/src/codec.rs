//! Payload encoding for the two write paths
//!
//! The per-record create call takes a JSON object; the bulk ingest job takes
//! a two-column CSV document. Both are derived from [`AccountRecord`].

use crmsync_core::{config::FieldMapping, domain::AccountRecord};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::{Map, Value};

use crate::SalesforceError;

/// Header row of the bulk update document
const BATCH_HEADER: [&str; 2] = ["Id", "Name"];

/// Encoder for Account payloads
#[derive(Debug, Clone, Default)]
pub struct PayloadCodec {
    field_mapping: FieldMapping,
}

impl PayloadCodec {
    /// Creates a codec that emits the mapped optional fields
    pub fn new(field_mapping: FieldMapping) -> Self {
        Self { field_mapping }
    }

    /// Encodes one record as the create-call JSON body
    ///
    /// Always carries `Name`; email and birth date are added only when the
    /// record has them and a target field is mapped.
    pub fn encode_object(&self, record: &AccountRecord) -> Value {
        let mut body = Map::new();
        body.insert("Name".to_string(), Value::String(record.display_name()));

        if let (Some(field), Some(email)) = (&self.field_mapping.email, record.email()) {
            body.insert(field.clone(), Value::String(email.to_string()));
        }
        if let (Some(field), Some(date)) = (&self.field_mapping.birth_date, record.birth_date()) {
            body.insert(
                field.clone(),
                Value::String(date.format("%Y-%m-%d").to_string()),
            );
        }

        Value::Object(body)
    }

    /// Encodes a batch as the bulk update CSV document
    ///
    /// Produces `Id,Name` followed by one `remoteId,displayName` row per
    /// record, every row terminated by `\n`. Fields are quoted only when they
    /// contain a delimiter, quote or line break.
    ///
    /// # Errors
    /// Returns [`SalesforceError::Serialization`] if a record has no remote ID.
    pub fn encode_batch(&self, records: &[AccountRecord]) -> Result<String, SalesforceError> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(BATCH_HEADER).map_err(csv_error)?;

        for record in records {
            let remote_id = record.remote_id().ok_or_else(|| {
                SalesforceError::Serialization(format!(
                    "record {} has no remote ID",
                    record.local_id()
                ))
            })?;
            writer
                .write_record([remote_id.as_str(), record.display_name().as_str()])
                .map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| SalesforceError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| SalesforceError::Serialization(e.to_string()))
    }
}

fn csv_error(err: csv::Error) -> SalesforceError {
    SalesforceError::Serialization(err.to_string())
}
