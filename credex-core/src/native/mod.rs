//! The boundary to the native credential-exchange library.
//!
//! Every asynchronous native operation has the same shape: the caller passes a
//! [`CommandHandle`] together with the operation's arguments and gets back an
//! immediate status. A zero status means exactly one completion will later be
//! delivered for that command handle through the [`CompletionBridge`]; any
//! other status means no completion will follow.

use std::fmt;

use crate::{
    dispatch::CompletionBridge,
    types::{CommandHandle, Handle},
};

pub mod ops;
pub use ops::{KindDescriptor, Operation, ALL_OPERATIONS};

mod memory;
pub use memory::{DeliveryMode, InMemoryLibrary, InMemoryLibraryBuilder};

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
mod ffi;
#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
pub use ffi::SystemLibrary;

/// Arity and types of the values a completion carries besides its error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultShape {
    /// Only the error code.
    Unit,
    /// A number, such as a handle or a state code.
    U32,
    /// A string, typically JSON.
    Text,
    /// A number and a string.
    U32Text,
}

/// A single argument passed across the native boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeArg {
    /// The handle of a native object.
    Handle(Handle),
    /// A plain number.
    U32(u32),
    /// A flag.
    Bool(bool),
    /// A string; it must not contain interior NUL bytes.
    Str(String),
    /// A nullable string.
    OptStr(Option<String>),
}

/// The values delivered alongside a successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionPayload {
    /// Nothing besides the error code.
    Unit,
    /// A number.
    U32(u32),
    /// A string; `None` if the native side passed a null pointer.
    Text(Option<String>),
    /// A number and a string.
    U32Text(u32, Option<String>),
}

impl CompletionPayload {
    /// The shape this payload was delivered in.
    #[must_use]
    pub const fn shape(&self) -> ResultShape {
        match self {
            Self::Unit => ResultShape::Unit,
            Self::U32(_) => ResultShape::U32,
            Self::Text(_) => ResultShape::Text,
            Self::U32Text(..) => ResultShape::U32Text,
        }
    }
}

/// A native credential-exchange library.
///
/// Implementations may deliver completions synchronously from inside
/// [`NativeLibrary::invoke`] or later from any thread.
pub trait NativeLibrary: Send + Sync + fmt::Debug {
    /// Issues an asynchronous operation and returns its immediate status.
    ///
    /// When the status is zero the library must eventually call
    /// [`CompletionBridge::complete`] exactly once with `command_handle`.
    fn invoke(
        &self,
        command_handle: CommandHandle,
        operation: &'static Operation,
        args: Vec<NativeArg>,
        completion: CompletionBridge,
    ) -> u32;

    /// Synchronously releases a native object and returns the status.
    fn release(&self, operation: &'static Operation, handle: Handle) -> u32;

    /// Called once when a runtime starts routing completions for this library.
    fn attach(&self, _completion: &CompletionBridge) {}

    /// Called when the runtime shuts down; no completions are routed afterwards.
    fn detach(&self) {}
}
