//! Lifecycle shared by every native object wrapper.
//!
//! An [`Entity`] pairs a caller-supplied `source_id` with the native handle it
//! owns and the last state it observed. The kind-specific behaviour lives in
//! the [`Kind`] implementations; everything else (construction,
//! serialization, state polling and release) is implemented once here.

use std::{fmt, sync::Arc};

use tracing::{debug, warn};

use crate::{
    dispatch::FromPayload,
    error::{CredexError, Result},
    native::{NativeArg, Operation},
    runtime::Runtime,
    types::{EntityKind, Handle, State},
};

mod record;
pub(crate) use record::entity_record;
pub use record::EntityRecord;

pub use crate::native::KindDescriptor;

/// A kind of native object.
pub trait Kind: Send + Sync + 'static {
    /// The serialized payload of this kind.
    type Record: EntityRecord;
    /// Kind-specific data kept next to the handle.
    type Fields: fmt::Debug + Clone + Send + Sync;

    /// The native lifecycle operations of this kind.
    fn descriptor() -> &'static KindDescriptor;

    /// Extracts the kind-specific data from a serialized payload.
    fn fields_from_record(record: &Self::Record) -> Self::Fields;
}

/// A native object of kind `K`, released when dropped.
pub struct Entity<K: Kind> {
    runtime: Arc<Runtime>,
    source_id: String,
    handle: Handle,
    state: State,
    fields: K::Fields,
}

impl<K: Kind> fmt::Debug for Entity<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &K::descriptor().kind)
            .field("source_id", &self.source_id)
            .field("handle", &self.handle)
            .field("state", &self.state)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl<K: Kind> Entity<K> {
    /// Runs a kind's create operation and wraps the handle it completes with.
    ///
    /// A successful completion carrying the reserved zero handle is reported as
    /// [`CredexError::InvalidConfiguration`].
    pub(crate) async fn create_with(
        runtime: &Arc<Runtime>,
        source_id: &str,
        operation: &'static Operation,
        args: Vec<NativeArg>,
        fields: K::Fields,
    ) -> Result<Self> {
        let handle: Handle = runtime.dispatcher().invoke(operation, args).await?;
        if !handle.is_valid() {
            warn!(kind = %K::descriptor().kind, source_id, "create completed without a handle");
            return Err(CredexError::InvalidConfiguration);
        }

        debug!(kind = %K::descriptor().kind, source_id, handle = %handle, "created");
        Ok(Self::from_parts(
            runtime,
            source_id.to_string(),
            handle,
            State::Initialized,
            fields,
        ))
    }

    pub(crate) fn from_parts(
        runtime: &Arc<Runtime>,
        source_id: String,
        handle: Handle,
        state: State,
        fields: K::Fields,
    ) -> Self {
        Self {
            runtime: Arc::clone(runtime),
            source_id,
            handle,
            state,
            fields,
        }
    }

    /// Rebuilds an entity from a payload produced by [`Entity::serialize_json`].
    ///
    /// The payload is validated locally before the native library sees it and
    /// is then passed on unchanged. State and kind-specific data are taken from
    /// the payload.
    ///
    /// # Errors
    ///
    /// - [`CredexError::InvalidInput`] if the payload is not a valid record of
    ///   this kind. No native call is made in that case.
    /// - Any error the native deserialize operation reports.
    pub async fn deserialize(runtime: &Arc<Runtime>, data: &str) -> Result<Self> {
        let descriptor = K::descriptor();
        let record: K::Record = serde_json::from_str(data).map_err(|err| {
            CredexError::invalid_input(format!("invalid {} payload: {err}", descriptor.kind))
        })?;

        let handle: Handle = runtime
            .dispatcher()
            .invoke(descriptor.deserialize, vec![NativeArg::Str(data.to_string())])
            .await?;
        if !handle.is_valid() {
            return Err(CredexError::invalid_handle(descriptor.kind));
        }

        debug!(
            kind = %descriptor.kind,
            source_id = record.source_id(),
            handle = %handle,
            "deserialized"
        );
        Ok(Self::from_parts(
            runtime,
            record.source_id().to_string(),
            handle,
            record.state(),
            K::fields_from_record(&record),
        ))
    }

    /// The native payload describing this entity, as produced by the native
    /// library.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidHandle`] if the entity was released or the
    /// native side no longer knows its handle.
    pub async fn serialize_json(&self) -> Result<String> {
        self.call(K::descriptor().serialize, Vec::new()).await
    }

    /// The native payload decoded into the kind's record.
    ///
    /// # Errors
    ///
    /// As [`Entity::serialize_json`], plus [`CredexError::Protocol`] if the
    /// native payload does not decode.
    pub async fn serialize(&self) -> Result<K::Record> {
        let operation = K::descriptor().serialize;
        let json = self.serialize_json().await?;
        serde_json::from_str(&json)
            .map_err(|err| CredexError::protocol(operation.name, format!("undecodable record: {err}")))
    }

    /// Releases the native object. Idempotent; never suspends.
    ///
    /// Native failures are logged and otherwise ignored. Afterwards every
    /// operation on this entity fails with [`CredexError::InvalidHandle`].
    pub fn release(&mut self) {
        if !self.handle.is_valid() {
            return;
        }

        let descriptor = K::descriptor();
        let status = self
            .runtime
            .dispatcher()
            .release(descriptor.release, self.handle);
        if status == 0 {
            debug!(kind = %descriptor.kind, handle = %self.handle, "released");
        } else {
            warn!(
                kind = %descriptor.kind,
                handle = %self.handle,
                error = %CredexError::from_native_code(status),
                "native release failed"
            );
        }

        self.handle = Handle::INVALID;
        self.state = State::None;
    }

    /// Asks the native library to refresh the state from the remote party,
    /// caches it and returns it.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidHandle`] if the entity was released, or any
    /// error the native refresh reports.
    pub async fn update_state(&mut self) -> Result<State> {
        let state: State = self.call(K::descriptor().update_state, Vec::new()).await?;
        self.state = state;
        Ok(state)
    }

    /// Reads the state from the native library without refreshing it. The
    /// cached [`Entity::state`] is left unchanged.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidHandle`] if the entity was released, or any
    /// error the native query reports.
    pub async fn get_state(&self) -> Result<State> {
        self.call(K::descriptor().get_state, Vec::new()).await
    }

    /// Issues `operation` with this entity's handle followed by `args`.
    pub(crate) async fn call<T: FromPayload>(
        &self,
        operation: &'static Operation,
        args: Vec<NativeArg>,
    ) -> Result<T> {
        let handle = self.live_handle()?;
        let mut all = Vec::with_capacity(args.len() + 1);
        all.push(NativeArg::Handle(handle));
        all.extend(args);
        self.runtime.dispatcher().invoke(operation, all).await
    }

    /// The handle, or the kind's invalid-handle error once released.
    ///
    /// # Errors
    ///
    /// [`CredexError::InvalidHandle`] if the entity holds no handle.
    pub fn live_handle(&self) -> Result<Handle> {
        if self.handle.is_valid() {
            Ok(self.handle)
        } else {
            Err(CredexError::invalid_handle(self.kind()))
        }
    }

    /// Gives up the handle without releasing it, for operations after which
    /// the native side has already freed the object.
    pub(crate) fn forget_handle(&mut self) {
        self.handle = Handle::INVALID;
        self.state = State::None;
    }

    pub(crate) const fn fields_mut(&mut self) -> &mut K::Fields {
        &mut self.fields
    }

    /// The kind of native object.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        K::descriptor().kind
    }

    /// The caller-supplied correlation id.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The native handle; [`Handle::INVALID`] once released.
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    /// The state observed by the last construction or [`Entity::update_state`].
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Kind-specific data.
    #[must_use]
    pub const fn fields(&self) -> &K::Fields {
        &self.fields
    }

    /// The runtime this entity issues its calls through.
    #[must_use]
    pub const fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }
}

impl<K: Kind> Drop for Entity<K> {
    fn drop(&mut self) {
        self.release();
    }
}
