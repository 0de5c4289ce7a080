use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{
    entity::{entity_record, Entity, Kind, KindDescriptor},
    error::Result,
    native::{ops, NativeArg},
    runtime::Runtime,
    types::{Handle, State},
};

/// A pairwise connection with a remote party.
pub type Connection = Entity<ConnectionKind>;

/// Marker for [`Connection`].
#[derive(Debug)]
pub struct ConnectionKind;

/// Connection data kept next to the handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionFields {
    /// The invitation sent by the last [`Connection::connect`], if any.
    pub invite_details: Option<String>,
}

/// Serialized form of a [`Connection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Caller-supplied correlation id.
    pub source_id: String,
    /// Native handle at serialization time.
    pub handle: Handle,
    /// State at serialization time.
    pub state: State,
    /// The invitation that was sent, once connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_detail: Option<String>,
    /// Native fields not modelled here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

entity_record!(ConnectionRecord);

impl Kind for ConnectionKind {
    type Record = ConnectionRecord;
    type Fields = ConnectionFields;

    fn descriptor() -> &'static KindDescriptor {
        &ops::CONNECTION
    }

    fn fields_from_record(record: &ConnectionRecord) -> ConnectionFields {
        ConnectionFields {
            invite_details: record.invite_detail.clone(),
        }
    }
}

/// How the invitation reaches the remote party.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct ConnectOptions {
    /// Send the invitation by SMS to this number. Without it the invitation is
    /// only returned, for display as a QR code.
    pub phone: Option<String>,
}

impl ConnectOptions {
    /// Invitation sent by SMS.
    #[must_use]
    pub fn sms(phone: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
        }
    }

    /// Invitation returned for display as a QR code.
    #[must_use]
    pub const fn qr() -> Self {
        Self { phone: None }
    }

    fn to_json(&self) -> String {
        match &self.phone {
            Some(phone) => json!({ "connection_type": "SMS", "phone": phone }),
            None => json!({ "connection_type": "QR" }),
        }
        .to_string()
    }
}

impl Entity<ConnectionKind> {
    /// Creates a connection object identified by `source_id`.
    ///
    /// # Errors
    ///
    /// Any error the native create operation reports.
    pub async fn create(runtime: &Arc<Runtime>, source_id: &str) -> Result<Self> {
        Self::create_with(
            runtime,
            source_id,
            &ops::CONNECTION_CREATE,
            vec![NativeArg::Str(source_id.to_string())],
            ConnectionFields::default(),
        )
        .await
    }

    /// Sends the connection invitation and returns its details. The state is
    /// refreshed afterwards.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidHandle`](crate::CredexError::InvalidHandle) once
    /// released, or any error the native connect reports.
    pub async fn connect(&mut self, options: ConnectOptions) -> Result<String> {
        let details: String = self
            .call(&ops::CONNECTION_CONNECT, vec![NativeArg::Str(options.to_json())])
            .await?;
        self.fields_mut().invite_details = Some(details.clone());
        self.update_state().await?;
        Ok(details)
    }

    /// The invitation details, in the abbreviated form used for QR codes when
    /// `abbreviated` is set.
    ///
    /// # Errors
    ///
    /// [`CredexError::NotReady`](crate::CredexError::NotReady) before
    /// [`Connection::connect`], or the invalid-handle error once released.
    pub async fn invite_details(&self, abbreviated: bool) -> Result<String> {
        self.call(&ops::CONNECTION_INVITE_DETAILS, vec![NativeArg::Bool(abbreviated)])
            .await
    }

    /// Deletes the connection on the remote side and frees the native object.
    ///
    /// # Errors
    ///
    /// The invalid-handle error once released, or any error the native delete
    /// reports (the connection is then kept).
    pub async fn delete(&mut self) -> Result<()> {
        self.call::<()>(&ops::CONNECTION_DELETE, Vec::new()).await?;
        self.forget_handle();
        Ok(())
    }

    /// The handle to pass as the connection argument of other operations.
    pub(crate) fn connection_arg(&self) -> Result<NativeArg> {
        self.live_handle().map(NativeArg::Handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{defaults::TEST_MODE_CONFIG, error::CredexError, types::EntityKind, RuntimeConfig};

    async fn runtime() -> Arc<Runtime> {
        let runtime = Runtime::in_memory(RuntimeConfig::default());
        runtime.init(TEST_MODE_CONFIG).await.unwrap();
        runtime
    }

    #[test]
    fn test_connect_options_json() {
        let sms: Value = serde_json::from_str(&ConnectOptions::sms("8019119191").to_json()).unwrap();
        assert_eq!(sms["connection_type"], "SMS");
        assert_eq!(sms["phone"], "8019119191");

        let qr: Value = serde_json::from_str(&ConnectOptions::qr().to_json()).unwrap();
        assert_eq!(qr, json!({ "connection_type": "QR" }));
    }

    #[tokio::test]
    async fn test_connect_refreshes_state() {
        let runtime = runtime().await;
        let mut connection = Connection::create(&runtime, "123").await.unwrap();
        assert!(connection.handle().is_valid());
        assert_eq!(connection.state(), State::Initialized);

        let details = connection.connect(ConnectOptions::sms("8019119191")).await.unwrap();
        assert!(!details.is_empty());
        assert_eq!(connection.state(), State::OfferSent);
        assert_eq!(connection.fields().invite_details.as_deref(), Some(details.as_str()));
    }

    #[tokio::test]
    async fn test_delete_invalidates_handle() {
        let runtime = runtime().await;
        let mut connection = Connection::create(&runtime, "to-delete").await.unwrap();

        connection.delete().await.unwrap();
        assert_eq!(connection.handle(), Handle::INVALID);
        assert_eq!(
            connection.invite_details(false).await,
            Err(CredexError::InvalidHandle {
                kind: EntityKind::Connection
            })
        );
    }
}
