use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};

use crate::types::{Handle, State};

/// Typed view of an entity's serialized payload.
///
/// Every payload carries at least `source_id`, `handle` and `state`. Records
/// keep the keys they do not model in a flattened map so nothing the native
/// library produced is lost when a record is re-encoded.
pub trait EntityRecord: Serialize + DeserializeOwned + Debug + Clone + Send + Sync + 'static {
    /// The caller-supplied correlation id.
    fn source_id(&self) -> &str;
    /// The native handle at the time of serialization.
    fn handle(&self) -> Handle;
    /// The state at the time of serialization.
    fn state(&self) -> State;
}

/// Implements [`EntityRecord`] for a record with `source_id`, `handle` and
/// `state` fields.
macro_rules! entity_record {
    ($record:ty) => {
        impl $crate::entity::EntityRecord for $record {
            fn source_id(&self) -> &str {
                &self.source_id
            }

            fn handle(&self) -> $crate::types::Handle {
                self.handle
            }

            fn state(&self) -> $crate::types::State {
                self.state
            }
        }
    };
}

pub(crate) use entity_record;
