use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    entity::{entity_record, Entity, EntityRecord, Kind, KindDescriptor},
    error::{CredexError, Result},
    native::{ops, NativeArg},
    runtime::Runtime,
    types::{Handle, State},
};

/// A credential schema on the ledger.
pub type Schema = Entity<SchemaKind>;

/// Marker for [`Schema`].
#[derive(Debug)]
pub struct SchemaKind;

/// The schema definition as published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaData {
    /// Schema name.
    pub name: String,
    /// Schema version.
    #[serde(default)]
    pub version: String,
    /// Attribute names credentials of this schema carry.
    pub attr_names: Vec<String>,
}

/// Schema data kept next to the handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFields {
    /// Name the schema was created or looked up with.
    pub name: String,
    /// Ledger sequence number, once known.
    pub sequence_num: Option<u32>,
    /// Published definition.
    pub data: SchemaData,
}

/// Serialized form of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaRecord {
    /// Caller-supplied correlation id.
    pub source_id: String,
    /// Native handle at serialization time.
    pub handle: Handle,
    /// State at serialization time.
    pub state: State,
    /// Schema name.
    pub name: String,
    /// Ledger sequence number.
    #[serde(default)]
    pub sequence_num: Option<u32>,
    /// Published definition.
    pub data: SchemaData,
    /// Native fields not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

entity_record!(SchemaRecord);

impl Kind for SchemaKind {
    type Record = SchemaRecord;
    type Fields = SchemaFields;

    fn descriptor() -> &'static KindDescriptor {
        &ops::SCHEMA
    }

    fn fields_from_record(record: &SchemaRecord) -> SchemaFields {
        SchemaFields {
            name: record.name.clone(),
            sequence_num: record.sequence_num,
            data: record.data.clone(),
        }
    }
}

impl Entity<SchemaKind> {
    /// Publishes a schema named `name` with the given attribute names.
    ///
    /// # Errors
    ///
    /// Any error the native create or the subsequent serialize reports.
    pub async fn create(
        runtime: &Arc<Runtime>,
        source_id: &str,
        name: &str,
        attr_names: &[String],
    ) -> Result<Self> {
        let fields = SchemaFields {
            name: name.to_string(),
            sequence_num: None,
            data: SchemaData {
                name: name.to_string(),
                version: String::new(),
                attr_names: attr_names.to_vec(),
            },
        };
        let mut schema = Self::create_with(
            runtime,
            source_id,
            &ops::SCHEMA_CREATE,
            vec![
                NativeArg::Str(source_id.to_string()),
                NativeArg::Str(name.to_string()),
                NativeArg::Str(serde_json::to_string(attr_names)?),
            ],
            fields,
        )
        .await?;

        // The ledger assigns the sequence number and version.
        let record = schema.serialize().await?;
        *schema.fields_mut() = SchemaKind::fields_from_record(&record);
        Ok(schema)
    }

    /// Looks up the schema with ledger sequence number `sequence_num` and
    /// wraps the native object created for it.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidSchema`] if no such schema exists or the native
    /// answer is incomplete; errors unrelated to the schema itself (such as
    /// [`CredexError::Timeout`]) propagate unchanged.
    pub async fn lookup(runtime: &Arc<Runtime>, source_id: &str, sequence_num: u32) -> Result<Self> {
        let json: String = runtime
            .dispatcher()
            .invoke(
                &ops::SCHEMA_GET_ATTRIBUTES,
                vec![
                    NativeArg::Str(source_id.to_string()),
                    NativeArg::U32(sequence_num),
                ],
            )
            .await
            .map_err(|err| match err {
                CredexError::InvalidInput { .. } | CredexError::Protocol { .. } => {
                    CredexError::InvalidSchema
                }
                other => other,
            })?;

        let record: SchemaRecord = match serde_json::from_str(&json) {
            Ok(record) => record,
            Err(err) => {
                warn!(source_id, sequence_num, error = %err, "undecodable schema lookup result");
                release_orphan(runtime, &json);
                return Err(CredexError::InvalidSchema);
            }
        };
        if !record.handle().is_valid() {
            return Err(CredexError::InvalidSchema);
        }

        Ok(Self::from_parts(
            runtime,
            source_id.to_string(),
            record.handle(),
            record.state(),
            SchemaKind::fields_from_record(&record),
        ))
    }

    /// Schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.fields().name
    }

    /// Ledger sequence number, once known.
    #[must_use]
    pub fn sequence_number(&self) -> Option<u32> {
        self.fields().sequence_num
    }

    /// Attribute names of the schema.
    #[must_use]
    pub fn attr_names(&self) -> &[String] {
        &self.fields().data.attr_names
    }
}

/// Releases the object a lookup created when its payload still names a handle.
fn release_orphan(runtime: &Runtime, json: &str) {
    let Some(handle) = serde_json::from_str::<Value>(json)
        .ok()
        .and_then(|value| value.get("handle")?.as_u64())
        .and_then(|raw| u32::try_from(raw).ok())
        .map(Handle::new)
        .filter(|handle| handle.is_valid())
    else {
        return;
    };

    let status = runtime.dispatcher().release(ops::SCHEMA.release, handle);
    if status != 0 {
        warn!(handle = %handle, status, "failed to release schema from lookup");
    }
}
