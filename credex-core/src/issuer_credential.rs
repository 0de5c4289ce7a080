use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    connection::Connection,
    entity::{entity_record, Entity, Kind, KindDescriptor},
    error::Result,
    native::{ops, NativeArg},
    runtime::Runtime,
    types::{Handle, State},
};

/// A credential this party offers and issues.
pub type IssuerCredential = Entity<IssuerCredentialKind>;

/// Marker for [`IssuerCredential`].
#[derive(Debug)]
pub struct IssuerCredentialKind;

/// Issuer credential data kept next to the handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuerCredentialFields {
    /// Credential name.
    pub name: String,
    /// Sequence number of the credential's schema.
    pub schema_seq_no: u32,
    /// Attribute values, one per attribute name.
    pub attributes: BTreeMap<String, String>,
}

/// Serialized form of an [`IssuerCredential`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuerCredentialRecord {
    /// Caller-supplied correlation id.
    pub source_id: String,
    /// Native handle at serialization time.
    pub handle: Handle,
    /// State at serialization time.
    pub state: State,
    /// Credential name.
    pub credential_name: String,
    /// Sequence number of the credential's schema.
    pub schema_seq_no: u32,
    /// Attribute values in the native list-wrapped form.
    pub credential_attributes: BTreeMap<String, Vec<String>>,
    /// Native fields not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

entity_record!(IssuerCredentialRecord);

impl Kind for IssuerCredentialKind {
    type Record = IssuerCredentialRecord;
    type Fields = IssuerCredentialFields;

    fn descriptor() -> &'static KindDescriptor {
        &ops::ISSUER_CREDENTIAL
    }

    fn fields_from_record(record: &IssuerCredentialRecord) -> IssuerCredentialFields {
        IssuerCredentialFields {
            name: record.credential_name.clone(),
            schema_seq_no: record.schema_seq_no,
            attributes: record
                .credential_attributes
                .iter()
                .filter_map(|(name, values)| Some((name.clone(), values.first()?.clone())))
                .collect(),
        }
    }
}

/// Wraps every attribute value in a single-element list, the shape the native
/// library expects.
fn wrap_attributes(attributes: &BTreeMap<String, String>) -> BTreeMap<&str, [&str; 1]> {
    attributes
        .iter()
        .map(|(name, value)| (name.as_str(), [value.as_str()]))
        .collect()
}

impl Entity<IssuerCredentialKind> {
    /// Creates a credential with the given attribute values for the schema
    /// with sequence number `schema_seq_no`.
    ///
    /// # Errors
    ///
    /// Any error the native create operation reports.
    pub async fn create(
        runtime: &Arc<Runtime>,
        source_id: &str,
        attributes: BTreeMap<String, String>,
        schema_seq_no: u32,
        name: &str,
    ) -> Result<Self> {
        let encoded = serde_json::to_string(&wrap_attributes(&attributes))?;
        Self::create_with(
            runtime,
            source_id,
            &ops::ISSUER_CREDENTIAL_CREATE,
            vec![
                NativeArg::Str(source_id.to_string()),
                NativeArg::U32(schema_seq_no),
                NativeArg::OptStr(None),
                NativeArg::Str(encoded),
                NativeArg::Str(name.to_string()),
            ],
            IssuerCredentialFields {
                name: name.to_string(),
                schema_seq_no,
                attributes,
            },
        )
        .await
    }

    /// Sends the credential offer over `connection`, then refreshes the state.
    ///
    /// # Errors
    ///
    /// The connection's invalid-handle error if it was released,
    /// [`CredexError::NotReady`](crate::CredexError::NotReady) if it never
    /// connected, or any other error the native call reports.
    pub async fn send_offer(&mut self, connection: &Connection) -> Result<()> {
        self.call::<()>(&ops::ISSUER_CREDENTIAL_SEND_OFFER, vec![connection.connection_arg()?])
            .await?;
        self.update_state().await?;
        Ok(())
    }

    /// Sends the credential over `connection` once the remote party requested
    /// it, then refreshes the state.
    ///
    /// # Errors
    ///
    /// [`CredexError::NotReady`](crate::CredexError::NotReady) before the
    /// credential request arrived, or as for [`IssuerCredential::send_offer`].
    pub async fn send_credential(&mut self, connection: &Connection) -> Result<()> {
        self.call::<()>(
            &ops::ISSUER_CREDENTIAL_SEND_CREDENTIAL,
            vec![connection.connection_arg()?],
        )
        .await?;
        self.update_state().await?;
        Ok(())
    }

    /// Attribute values, one per attribute name.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.fields().attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_values_are_wrapped() {
        let attributes = BTreeMap::from([
            ("age".to_string(), "28".to_string()),
            ("name".to_string(), "Alice".to_string()),
        ]);
        let encoded = serde_json::to_string(&wrap_attributes(&attributes)).unwrap();
        assert_eq!(encoded, r#"{"age":["28"],"name":["Alice"]}"#);
    }

    #[test]
    fn test_fields_unwrap_attribute_values() {
        let record: IssuerCredentialRecord = serde_json::from_str(
            r#"{"source_id":"s","handle":3,"state":1,"credential_name":"c","schema_seq_no":22,
                "credential_attributes":{"name":["Bob"]},"issuer_did":"did"}"#,
        )
        .unwrap();
        let fields = IssuerCredentialKind::fields_from_record(&record);

        assert_eq!(fields.attributes.get("name").map(String::as_str), Some("Bob"));
        assert_eq!(record.extra.get("issuer_did"), Some(&Value::from("did")));
    }
}
