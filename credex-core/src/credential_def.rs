use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    entity::{entity_record, Entity, Kind, KindDescriptor},
    error::Result,
    native::{ops, NativeArg},
    runtime::Runtime,
    types::{Handle, State},
};

/// A credential definition bound to a schema.
pub type CredentialDef = Entity<CredentialDefKind>;

/// Marker for [`CredentialDef`].
#[derive(Debug)]
pub struct CredentialDefKind;

/// Credential definition data kept next to the handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialDefFields {
    /// Definition name.
    pub name: String,
    /// Sequence number of the schema the definition is for.
    pub schema_seq_no: u32,
    /// Whether issued credentials can be revoked.
    pub revocation_enabled: bool,
}

/// Serialized form of a [`CredentialDef`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialDefRecord {
    /// Caller-supplied correlation id.
    pub source_id: String,
    /// Native handle at serialization time.
    pub handle: Handle,
    /// State at serialization time.
    pub state: State,
    /// Definition name.
    pub name: String,
    /// Sequence number of the schema the definition is for.
    pub schema_seq_no: u32,
    /// Whether issued credentials can be revoked.
    #[serde(default)]
    pub revocation_enabled: bool,
    /// Native fields not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

entity_record!(CredentialDefRecord);

impl Kind for CredentialDefKind {
    type Record = CredentialDefRecord;
    type Fields = CredentialDefFields;

    fn descriptor() -> &'static KindDescriptor {
        &ops::CREDENTIAL_DEF
    }

    fn fields_from_record(record: &CredentialDefRecord) -> CredentialDefFields {
        CredentialDefFields {
            name: record.name.clone(),
            schema_seq_no: record.schema_seq_no,
            revocation_enabled: record.revocation_enabled,
        }
    }
}

impl Entity<CredentialDefKind> {
    /// Creates a credential definition for the schema with sequence number
    /// `schema_seq_no`, issued under the configured issuer DID.
    ///
    /// # Errors
    ///
    /// Any error the native create operation reports, such as
    /// [`CredexError::InvalidSchema`](crate::CredexError::InvalidSchema) for
    /// an unknown schema.
    pub async fn create(
        runtime: &Arc<Runtime>,
        source_id: &str,
        name: &str,
        schema_seq_no: u32,
        revocation_enabled: bool,
    ) -> Result<Self> {
        Self::create_with(
            runtime,
            source_id,
            &ops::CREDENTIAL_DEF_CREATE,
            vec![
                NativeArg::Str(source_id.to_string()),
                NativeArg::Str(name.to_string()),
                NativeArg::U32(schema_seq_no),
                NativeArg::OptStr(None),
                NativeArg::Bool(revocation_enabled),
            ],
            CredentialDefFields {
                name: name.to_string(),
                schema_seq_no,
                revocation_enabled,
            },
        )
        .await
    }

    /// Definition name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.fields().name
    }

    /// Sequence number of the schema the definition is for.
    #[must_use]
    pub fn schema_seq_no(&self) -> u32 {
        self.fields().schema_seq_no
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{defaults::TEST_MODE_CONFIG, error::CredexError, RuntimeConfig};

    #[tokio::test]
    async fn test_create_and_round_trip() {
        let runtime = Runtime::in_memory(RuntimeConfig::default());
        runtime.init(TEST_MODE_CONFIG).await.unwrap();

        let definition = CredentialDef::create(&runtime, "cd", "Degree", 44, true)
            .await
            .unwrap();
        assert_eq!(definition.state(), State::Initialized);

        let record = definition.serialize().await.unwrap();
        assert_eq!(record.schema_seq_no, 44);
        assert!(record.revocation_enabled);
        assert!(record.extra.contains_key("cred_def_id"));

        let data = definition.serialize_json().await.unwrap();
        let copy = CredentialDef::deserialize(&runtime, &data).await.unwrap();
        assert_eq!(copy.name(), "Degree");
        assert_eq!(copy.schema_seq_no(), 44);
    }

    #[tokio::test]
    async fn test_unknown_schema_is_rejected() {
        let runtime = Runtime::in_memory(RuntimeConfig::default());
        runtime.init(TEST_MODE_CONFIG).await.unwrap();

        let result = CredentialDef::create(&runtime, "cd", "Degree", 0, false).await;
        assert_eq!(result.unwrap_err(), CredexError::InvalidSchema);
    }
}
