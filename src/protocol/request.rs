//! Request envelope types
//!
//! JSON envelope parsing and construction for all supported operations.
//! The controller builds envelopes with the per-kind constructors; the worker
//! parses the raw JSON back into the typed [`Request`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::ProtocolError;

/// Typed request, one variant per operation kind
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CreateTable {
        table: String,
        item_type: Option<String>,
    },
    DropTable {
        table: String,
    },
    AddRecord {
        table: String,
        record: Value,
    },
    GetRecords {
        table: String,
        predicate: String,
    },
    ReplaceRecords {
        table: String,
        new_record: Value,
        predicate: String,
    },
    UpdateRecords {
        table: String,
        update_fn: String,
        predicate: String,
    },
    DeleteRecords {
        table: String,
        predicate: String,
    },
    FindRecord {
        table: String,
        predicate: String,
    },
    CountRecords {
        table: String,
        predicate: String,
    },
    GetTopRecords {
        table: String,
        predicate: String,
        start_row: usize,
        max_rows: usize,
        sort_property: String,
        descending: bool,
    },
}

impl Request {
    /// Wire kind string for this request
    pub fn op(&self) -> &'static str {
        match self {
            Request::CreateTable { .. } => "createTable",
            Request::DropTable { .. } => "dropTable",
            Request::AddRecord { .. } => "addRecord",
            Request::GetRecords { .. } => "getRecords",
            Request::ReplaceRecords { .. } => "replaceRecords",
            Request::UpdateRecords { .. } => "updateRecords",
            Request::DeleteRecords { .. } => "deleteRecords",
            Request::FindRecord { .. } => "findRecord",
            Request::CountRecords { .. } => "countRecords",
            Request::GetTopRecords { .. } => "getTopRecords",
        }
    }

    /// Name of the table this request targets
    pub fn table(&self) -> &str {
        match self {
            Request::CreateTable { table, .. }
            | Request::DropTable { table }
            | Request::AddRecord { table, .. }
            | Request::GetRecords { table, .. }
            | Request::ReplaceRecords { table, .. }
            | Request::UpdateRecords { table, .. }
            | Request::DeleteRecords { table, .. }
            | Request::FindRecord { table, .. }
            | Request::CountRecords { table, .. }
            | Request::GetTopRecords { table, .. } => table,
        }
    }
}

/// Full request envelope as exchanged over the channel
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// Correlation token, unique per outstanding request
    pub request_id: Uuid,
    /// One-shot name bindings for this request's logic fragments
    pub closure: Option<Value>,
    /// Declared but not enforced by the worker
    pub closure_timeout: Option<u64>,
    /// The operation to execute
    pub request: Request,
}

/// Raw wire shape for parsing and serialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawRequest {
    op: String,
    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    request_id: Option<Uuid>,
    #[serde(rename = "tableName", default, skip_serializing_if = "Option::is_none")]
    table_name: Option<String>,
    #[serde(rename = "itemType", default, skip_serializing_if = "Option::is_none")]
    item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    record: Option<Value>,
    #[serde(rename = "newRecord", default, skip_serializing_if = "Option::is_none")]
    new_record: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    predicate: Option<String>,
    #[serde(rename = "updateFn", default, skip_serializing_if = "Option::is_none")]
    update_fn: Option<String>,
    #[serde(rename = "startRow", default, skip_serializing_if = "Option::is_none")]
    start_row: Option<usize>,
    #[serde(rename = "maxRows", default, skip_serializing_if = "Option::is_none")]
    max_rows: Option<usize>,
    #[serde(
        rename = "sortProperty",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    sort_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    descending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    closure: Option<Value>,
    #[serde(
        rename = "closureTimeout",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    closure_timeout: Option<u64>,
}

/// Best-effort recovery of a request id from an envelope that failed to parse
fn salvage_request_id(json: &str) -> Option<Uuid> {
    let value: Value = serde_json::from_str(json).ok()?;
    value
        .get("requestId")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

impl RequestEnvelope {
    /// Parse a request envelope from a JSON string
    pub fn parse(json: &str) -> Result<Self, ProtocolError> {
        let raw: RawRequest =
            serde_json::from_str(json).map_err(|e| ProtocolError::InvalidRequest {
                request_id: salvage_request_id(json),
                message: format!("Invalid JSON: {}", e),
            })?;

        let request_id = raw.request_id.ok_or_else(|| ProtocolError::InvalidRequest {
            request_id: None,
            message: "Missing requestId".to_string(),
        })?;

        let missing = |field: &str| ProtocolError::InvalidRequest {
            request_id: Some(request_id),
            message: format!("Missing {}", field),
        };

        // Not unwrapped until the kind is recognized, so an unknown operation
        // is always reported as such, whatever else the envelope is missing
        let table = raw.table_name.ok_or_else(|| missing("tableName"));

        let request = match raw.op.as_str() {
            "createTable" => Request::CreateTable {
                table: table?,
                item_type: raw.item_type,
            },
            "dropTable" => Request::DropTable { table: table? },
            "addRecord" => Request::AddRecord {
                table: table?,
                record: raw.record.ok_or_else(|| missing("record"))?,
            },
            "getRecords" => Request::GetRecords {
                table: table?,
                predicate: raw.predicate.ok_or_else(|| missing("predicate"))?,
            },
            "replaceRecords" => Request::ReplaceRecords {
                table: table?,
                new_record: raw.new_record.ok_or_else(|| missing("newRecord"))?,
                predicate: raw.predicate.ok_or_else(|| missing("predicate"))?,
            },
            "updateRecords" => Request::UpdateRecords {
                table: table?,
                update_fn: raw.update_fn.ok_or_else(|| missing("updateFn"))?,
                predicate: raw.predicate.ok_or_else(|| missing("predicate"))?,
            },
            "deleteRecords" => Request::DeleteRecords {
                table: table?,
                predicate: raw.predicate.ok_or_else(|| missing("predicate"))?,
            },
            "findRecord" => Request::FindRecord {
                table: table?,
                predicate: raw.predicate.ok_or_else(|| missing("predicate"))?,
            },
            "countRecords" => Request::CountRecords {
                table: table?,
                predicate: raw.predicate.ok_or_else(|| missing("predicate"))?,
            },
            "getTopRecords" => Request::GetTopRecords {
                table: table?,
                predicate: raw.predicate.ok_or_else(|| missing("predicate"))?,
                start_row: raw.start_row.ok_or_else(|| missing("startRow"))?,
                max_rows: raw.max_rows.ok_or_else(|| missing("maxRows"))?,
                sort_property: raw.sort_property.ok_or_else(|| missing("sortProperty"))?,
                descending: raw.descending.unwrap_or(false),
            },
            other => {
                return Err(ProtocolError::UnknownOperation {
                    request_id,
                    op: other.to_string(),
                })
            }
        };

        Ok(Self {
            request_id,
            closure: raw.closure,
            closure_timeout: raw.closure_timeout,
            request,
        })
    }

    /// Serialize to the JSON wire shape
    pub fn to_json(&self) -> String {
        let mut raw = RawRequest {
            op: self.request.op().to_string(),
            request_id: Some(self.request_id),
            table_name: Some(self.request.table().to_string()),
            closure: self.closure.clone(),
            closure_timeout: self.closure_timeout,
            ..RawRequest::default()
        };

        match &self.request {
            Request::CreateTable { item_type, .. } => {
                raw.item_type = item_type.clone();
            }
            Request::DropTable { .. } => {}
            Request::AddRecord { record, .. } => {
                raw.record = Some(record.clone());
            }
            Request::GetRecords { predicate, .. }
            | Request::DeleteRecords { predicate, .. }
            | Request::FindRecord { predicate, .. }
            | Request::CountRecords { predicate, .. } => {
                raw.predicate = Some(predicate.clone());
            }
            Request::ReplaceRecords {
                new_record,
                predicate,
                ..
            } => {
                raw.new_record = Some(new_record.clone());
                raw.predicate = Some(predicate.clone());
            }
            Request::UpdateRecords {
                update_fn,
                predicate,
                ..
            } => {
                raw.update_fn = Some(update_fn.clone());
                raw.predicate = Some(predicate.clone());
            }
            Request::GetTopRecords {
                predicate,
                start_row,
                max_rows,
                sort_property,
                descending,
                ..
            } => {
                raw.predicate = Some(predicate.clone());
                raw.start_row = Some(*start_row);
                raw.max_rows = Some(*max_rows);
                raw.sort_property = Some(sort_property.clone());
                raw.descending = Some(*descending);
            }
        }

        serde_json::to_string(&raw).expect("RequestEnvelope serialization cannot fail")
    }

    fn new(request: Request) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            closure: None,
            closure_timeout: None,
            request,
        }
    }

    /// Attach a closure payload (a JSON object of name → value bindings)
    pub fn with_closure(mut self, closure: Value) -> Self {
        self.closure = Some(closure);
        self
    }

    /// Declare a closure timeout in milliseconds. Carried but not enforced.
    pub fn with_closure_timeout(mut self, millis: u64) -> Self {
        self.closure_timeout = Some(millis);
        self
    }

    /// Build a `createTable` envelope
    pub fn create_table(table: impl Into<String>) -> Self {
        Self::new(Request::CreateTable {
            table: table.into(),
            item_type: None,
        })
    }

    /// Build a `createTable` envelope with an item-type tag
    pub fn create_table_with_type(table: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self::new(Request::CreateTable {
            table: table.into(),
            item_type: Some(item_type.into()),
        })
    }

    /// Build a `dropTable` envelope
    pub fn drop_table(table: impl Into<String>) -> Self {
        Self::new(Request::DropTable {
            table: table.into(),
        })
    }

    /// Build an `addRecord` envelope
    pub fn add_record(table: impl Into<String>, record: Value) -> Self {
        Self::new(Request::AddRecord {
            table: table.into(),
            record,
        })
    }

    /// Build a `getRecords` envelope
    pub fn get_records(table: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self::new(Request::GetRecords {
            table: table.into(),
            predicate: predicate.into(),
        })
    }

    /// Build a `replaceRecords` envelope
    pub fn replace_records(
        table: impl Into<String>,
        new_record: Value,
        predicate: impl Into<String>,
    ) -> Self {
        Self::new(Request::ReplaceRecords {
            table: table.into(),
            new_record,
            predicate: predicate.into(),
        })
    }

    /// Build an `updateRecords` envelope
    pub fn update_records(
        table: impl Into<String>,
        update_fn: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self::new(Request::UpdateRecords {
            table: table.into(),
            update_fn: update_fn.into(),
            predicate: predicate.into(),
        })
    }

    /// Build a `deleteRecords` envelope
    pub fn delete_records(table: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self::new(Request::DeleteRecords {
            table: table.into(),
            predicate: predicate.into(),
        })
    }

    /// Build a `findRecord` envelope
    pub fn find_record(table: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self::new(Request::FindRecord {
            table: table.into(),
            predicate: predicate.into(),
        })
    }

    /// Build a `countRecords` envelope
    pub fn count_records(table: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self::new(Request::CountRecords {
            table: table.into(),
            predicate: predicate.into(),
        })
    }

    /// Build a `getTopRecords` envelope
    pub fn get_top_records(
        table: impl Into<String>,
        predicate: impl Into<String>,
        start_row: usize,
        max_rows: usize,
        sort_property: impl Into<String>,
        descending: bool,
    ) -> Self {
        Self::new(Request::GetTopRecords {
            table: table.into(),
            predicate: predicate.into(),
            start_row,
            max_rows,
            sort_property: sort_property.into(),
            descending,
        })
    }
}
