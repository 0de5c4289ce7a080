//! Raw bindings to the native library's C entry points.
//!
//! The library calls back through plain function pointers without a context
//! argument, so completions are routed through one statically registered
//! trampoline per [`ResultShape`] and a process-wide bridge slot that
//! [`SystemLibrary::attach`](NativeLibrary::attach) fills and
//! [`SystemLibrary::detach`](NativeLibrary::detach) clears. The slot has a
//! single owner: at most one [`SystemLibrary`] is alive at a time.

use std::{
    collections::HashMap,
    ffi::{CStr, CString},
    os::raw::c_char,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        PoisonError, RwLock,
    },
};

use tracing::{debug, error, warn};

use super::{ops, CompletionPayload, NativeArg, NativeLibrary, Operation, ResultShape};
use crate::{
    dispatch::CompletionBridge,
    error::{CredexError, ErrorCode},
    types::{CommandHandle, Handle},
};

// ── Callback signatures ─────────────────────────────────────────────────

type UnitCallback = extern "C" fn(command_handle: u32, err: u32);
type U32Callback = extern "C" fn(command_handle: u32, err: u32, value: u32);
type TextCallback = extern "C" fn(command_handle: u32, err: u32, text: *const c_char);
type U32TextCallback =
    extern "C" fn(command_handle: u32, err: u32, value: u32, text: *const c_char);

// ── Native symbols ──────────────────────────────────────────────────────

extern "C" {
    fn vcx_init(command_handle: u32, config: *const c_char, cb: Option<UnitCallback>) -> u32;

    fn vcx_connection_create(command_handle: u32, source_id: *const c_char, cb: Option<U32Callback>) -> u32;
    fn vcx_connection_connect(
        command_handle: u32,
        connection_handle: u32,
        connection_options: *const c_char,
        cb: Option<TextCallback>,
    ) -> u32;
    fn vcx_connection_invite_details(
        command_handle: u32,
        connection_handle: u32,
        abbreviated: bool,
        cb: Option<TextCallback>,
    ) -> u32;
    fn vcx_connection_delete_connection(command_handle: u32, connection_handle: u32, cb: Option<UnitCallback>) -> u32;
    fn vcx_connection_serialize(command_handle: u32, connection_handle: u32, cb: Option<TextCallback>) -> u32;
    fn vcx_connection_deserialize(command_handle: u32, serialized: *const c_char, cb: Option<U32Callback>) -> u32;
    fn vcx_connection_update_state(command_handle: u32, connection_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_connection_get_state(command_handle: u32, connection_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_connection_release(connection_handle: u32) -> u32;

    fn vcx_schema_create(
        command_handle: u32,
        source_id: *const c_char,
        schema_name: *const c_char,
        schema_data: *const c_char,
        cb: Option<U32Callback>,
    ) -> u32;
    fn vcx_schema_get_attributes(
        command_handle: u32,
        source_id: *const c_char,
        sequence_no: u32,
        cb: Option<TextCallback>,
    ) -> u32;
    fn vcx_schema_serialize(command_handle: u32, schema_handle: u32, cb: Option<TextCallback>) -> u32;
    fn vcx_schema_deserialize(command_handle: u32, serialized: *const c_char, cb: Option<U32Callback>) -> u32;
    fn vcx_schema_update_state(command_handle: u32, schema_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_schema_get_state(command_handle: u32, schema_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_schema_release(schema_handle: u32) -> u32;

    fn vcx_credentialdef_create(
        command_handle: u32,
        source_id: *const c_char,
        credentialdef_name: *const c_char,
        schema_seq_no: u32,
        issuer_did: *const c_char,
        revocation_enabled: bool,
        cb: Option<U32Callback>,
    ) -> u32;
    fn vcx_credentialdef_serialize(command_handle: u32, credentialdef_handle: u32, cb: Option<TextCallback>) -> u32;
    fn vcx_credentialdef_deserialize(command_handle: u32, serialized: *const c_char, cb: Option<U32Callback>) -> u32;
    fn vcx_credentialdef_update_state(command_handle: u32, credentialdef_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_credentialdef_get_state(command_handle: u32, credentialdef_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_credentialdef_release(credentialdef_handle: u32) -> u32;

    fn vcx_issuer_create_credential(
        command_handle: u32,
        source_id: *const c_char,
        schema_seq_no: u32,
        issuer_did: *const c_char,
        credential_data: *const c_char,
        credential_name: *const c_char,
        cb: Option<U32Callback>,
    ) -> u32;
    fn vcx_issuer_send_credential_offer(
        command_handle: u32,
        credential_handle: u32,
        connection_handle: u32,
        cb: Option<UnitCallback>,
    ) -> u32;
    fn vcx_issuer_send_credential(
        command_handle: u32,
        credential_handle: u32,
        connection_handle: u32,
        cb: Option<UnitCallback>,
    ) -> u32;
    fn vcx_issuer_credential_serialize(command_handle: u32, credential_handle: u32, cb: Option<TextCallback>) -> u32;
    fn vcx_issuer_credential_deserialize(command_handle: u32, serialized: *const c_char, cb: Option<U32Callback>) -> u32;
    fn vcx_issuer_credential_update_state(command_handle: u32, credential_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_issuer_credential_get_state(command_handle: u32, credential_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_issuer_credential_release(credential_handle: u32) -> u32;

    fn vcx_proof_create(
        command_handle: u32,
        source_id: *const c_char,
        requested_attrs: *const c_char,
        requested_predicates: *const c_char,
        name: *const c_char,
        cb: Option<U32Callback>,
    ) -> u32;
    fn vcx_proof_send_request(
        command_handle: u32,
        proof_handle: u32,
        connection_handle: u32,
        cb: Option<UnitCallback>,
    ) -> u32;
    fn vcx_get_proof(
        command_handle: u32,
        proof_handle: u32,
        connection_handle: u32,
        cb: Option<U32TextCallback>,
    ) -> u32;
    fn vcx_proof_serialize(command_handle: u32, proof_handle: u32, cb: Option<TextCallback>) -> u32;
    fn vcx_proof_deserialize(command_handle: u32, serialized: *const c_char, cb: Option<U32Callback>) -> u32;
    fn vcx_proof_update_state(command_handle: u32, proof_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_proof_get_state(command_handle: u32, proof_handle: u32, cb: Option<U32Callback>) -> u32;
    fn vcx_proof_release(proof_handle: u32) -> u32;
}

// ── Completion trampolines ──────────────────────────────────────────────

/// Where the trampolines deliver completions.
static BRIDGE: RwLock<Option<CompletionBridge>> = RwLock::new(None);

/// Set while a [`SystemLibrary`] owns the bridge slot.
static LIBRARY_BOUND: AtomicBool = AtomicBool::new(false);

fn install_bridge(bridge: Option<CompletionBridge>) {
    *BRIDGE.write().unwrap_or_else(PoisonError::into_inner) = bridge;
}

/// Copies a native string. The pointer is only valid for the duration of the
/// callback.
///
/// # Safety
///
/// `text` must be null or point to a NUL-terminated string.
unsafe fn copy_text(text: *const c_char) -> Option<String> {
    if text.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    Some(unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned())
}

/// Hands a completion to the installed bridge. Never unwinds into the caller.
fn route(command_handle: u32, err: u32, payload: impl FnOnce() -> CompletionPayload) {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let bridge = BRIDGE
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match bridge {
            Some(bridge) => {
                bridge.complete(CommandHandle::from(command_handle), err, payload());
            }
            None => warn!(command_handle, err, "completion arrived with no bridge installed"),
        }
    }));

    if outcome.is_err() {
        error!(command_handle, "panic while routing completion");
    }
}

extern "C" fn unit_trampoline(command_handle: u32, err: u32) {
    route(command_handle, err, || CompletionPayload::Unit);
}

extern "C" fn u32_trampoline(command_handle: u32, err: u32, value: u32) {
    route(command_handle, err, || CompletionPayload::U32(value));
}

extern "C" fn text_trampoline(command_handle: u32, err: u32, text: *const c_char) {
    // SAFETY: the native library passes null or a NUL-terminated string that
    // stays valid until this callback returns.
    let text = unsafe { copy_text(text) };
    route(command_handle, err, || CompletionPayload::Text(text));
}

extern "C" fn u32_text_trampoline(command_handle: u32, err: u32, value: u32, text: *const c_char) {
    // SAFETY: as in `text_trampoline`.
    let text = unsafe { copy_text(text) };
    route(command_handle, err, || CompletionPayload::U32Text(value, text));
}

// ── Argument marshalling ────────────────────────────────────────────────

/// Converts positional [`NativeArg`]s into C values.
struct CArgs(std::vec::IntoIter<NativeArg>);

impl CArgs {
    fn handle(&mut self) -> Result<u32, ErrorCode> {
        match self.0.next() {
            Some(NativeArg::Handle(handle)) => Ok(handle.get()),
            _ => Err(ErrorCode::InvalidOption),
        }
    }

    fn number(&mut self) -> Result<u32, ErrorCode> {
        match self.0.next() {
            Some(NativeArg::U32(value)) => Ok(value),
            _ => Err(ErrorCode::InvalidOption),
        }
    }

    fn flag(&mut self) -> Result<bool, ErrorCode> {
        match self.0.next() {
            Some(NativeArg::Bool(value)) => Ok(value),
            _ => Err(ErrorCode::InvalidOption),
        }
    }

    fn text(&mut self) -> Result<CString, ErrorCode> {
        match self.0.next() {
            Some(NativeArg::Str(value)) => CString::new(value).map_err(|_| ErrorCode::InvalidOption),
            _ => Err(ErrorCode::InvalidOption),
        }
    }

    fn optional_text(&mut self) -> Result<Option<CString>, ErrorCode> {
        match self.0.next() {
            Some(NativeArg::OptStr(value)) => value
                .map(CString::new)
                .transpose()
                .map_err(|_| ErrorCode::InvalidOption),
            _ => Err(ErrorCode::InvalidOption),
        }
    }
}

fn ptr_or_null(text: Option<&CString>) -> *const c_char {
    text.map_or(std::ptr::null(), |text| text.as_ptr())
}

// ── Entry points ────────────────────────────────────────────────────────

type EntryPoint = fn(u32, &mut CArgs) -> Result<u32, ErrorCode>;
type ReleasePoint = unsafe extern "C" fn(u32) -> u32;

/// Entry point taking only the object handle.
macro_rules! handle_entry {
    ($name:ident, $symbol:ident, $callback:ident) => {
        fn $name(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
            let handle = args.handle()?;
            // SAFETY: plain integers and a static callback.
            Ok(unsafe { $symbol(command_handle, handle, Some($callback)) })
        }
    };
}

/// Entry point taking only a serialized payload.
macro_rules! deserialize_entry {
    ($name:ident, $symbol:ident) => {
        fn $name(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
            let serialized = args.text()?;
            // SAFETY: `serialized` outlives the call; the library copies it.
            Ok(unsafe { $symbol(command_handle, serialized.as_ptr(), Some(u32_trampoline)) })
        }
    };
}

/// Entry point taking the object handle and a connection handle.
macro_rules! with_connection_entry {
    ($name:ident, $symbol:ident, $callback:ident) => {
        fn $name(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
            let handle = args.handle()?;
            let connection = args.handle()?;
            // SAFETY: plain integers and a static callback.
            Ok(unsafe { $symbol(command_handle, handle, connection, Some($callback)) })
        }
    };
}

fn init(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
    let config = args.text()?;
    // SAFETY: `config` outlives the call.
    Ok(unsafe { vcx_init(command_handle, config.as_ptr(), Some(unit_trampoline)) })
}

fn connection_create(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
    let source_id = args.text()?;
    // SAFETY: `source_id` outlives the call.
    Ok(unsafe { vcx_connection_create(command_handle, source_id.as_ptr(), Some(u32_trampoline)) })
}

fn connection_connect(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
    let handle = args.handle()?;
    let options = args.text()?;
    // SAFETY: `options` outlives the call.
    Ok(unsafe {
        vcx_connection_connect(command_handle, handle, options.as_ptr(), Some(text_trampoline))
    })
}

fn connection_invite_details(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
    let handle = args.handle()?;
    let abbreviated = args.flag()?;
    // SAFETY: plain values and a static callback.
    Ok(unsafe {
        vcx_connection_invite_details(command_handle, handle, abbreviated, Some(text_trampoline))
    })
}

fn schema_create(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
    let source_id = args.text()?;
    let name = args.text()?;
    let attr_names = args.text()?;
    // SAFETY: the strings outlive the call.
    Ok(unsafe {
        vcx_schema_create(
            command_handle,
            source_id.as_ptr(),
            name.as_ptr(),
            attr_names.as_ptr(),
            Some(u32_trampoline),
        )
    })
}

fn schema_get_attributes(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
    let source_id = args.text()?;
    let sequence_no = args.number()?;
    // SAFETY: `source_id` outlives the call.
    Ok(unsafe {
        vcx_schema_get_attributes(command_handle, source_id.as_ptr(), sequence_no, Some(text_trampoline))
    })
}

fn credential_def_create(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
    let source_id = args.text()?;
    let name = args.text()?;
    let schema_seq_no = args.number()?;
    let issuer_did = args.optional_text()?;
    let revocation_enabled = args.flag()?;
    // SAFETY: the strings outlive the call; a null DID selects the configured one.
    Ok(unsafe {
        vcx_credentialdef_create(
            command_handle,
            source_id.as_ptr(),
            name.as_ptr(),
            schema_seq_no,
            ptr_or_null(issuer_did.as_ref()),
            revocation_enabled,
            Some(u32_trampoline),
        )
    })
}

fn issuer_credential_create(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
    let source_id = args.text()?;
    let schema_seq_no = args.number()?;
    let issuer_did = args.optional_text()?;
    let attributes = args.text()?;
    let name = args.text()?;
    // SAFETY: the strings outlive the call; a null DID selects the configured one.
    Ok(unsafe {
        vcx_issuer_create_credential(
            command_handle,
            source_id.as_ptr(),
            schema_seq_no,
            ptr_or_null(issuer_did.as_ref()),
            attributes.as_ptr(),
            name.as_ptr(),
            Some(u32_trampoline),
        )
    })
}

fn proof_create(command_handle: u32, args: &mut CArgs) -> Result<u32, ErrorCode> {
    let source_id = args.text()?;
    let requested_attrs = args.text()?;
    let requested_predicates = args.text()?;
    let name = args.text()?;
    // SAFETY: the strings outlive the call.
    Ok(unsafe {
        vcx_proof_create(
            command_handle,
            source_id.as_ptr(),
            requested_attrs.as_ptr(),
            requested_predicates.as_ptr(),
            name.as_ptr(),
            Some(u32_trampoline),
        )
    })
}

handle_entry!(connection_delete, vcx_connection_delete_connection, unit_trampoline);
handle_entry!(connection_serialize, vcx_connection_serialize, text_trampoline);
handle_entry!(connection_update_state, vcx_connection_update_state, u32_trampoline);
handle_entry!(connection_get_state, vcx_connection_get_state, u32_trampoline);
deserialize_entry!(connection_deserialize, vcx_connection_deserialize);

handle_entry!(schema_serialize, vcx_schema_serialize, text_trampoline);
handle_entry!(schema_update_state, vcx_schema_update_state, u32_trampoline);
handle_entry!(schema_get_state, vcx_schema_get_state, u32_trampoline);
deserialize_entry!(schema_deserialize, vcx_schema_deserialize);

handle_entry!(credential_def_serialize, vcx_credentialdef_serialize, text_trampoline);
handle_entry!(credential_def_update_state, vcx_credentialdef_update_state, u32_trampoline);
handle_entry!(credential_def_get_state, vcx_credentialdef_get_state, u32_trampoline);
deserialize_entry!(credential_def_deserialize, vcx_credentialdef_deserialize);

with_connection_entry!(issuer_credential_send_offer, vcx_issuer_send_credential_offer, unit_trampoline);
with_connection_entry!(issuer_credential_send_credential, vcx_issuer_send_credential, unit_trampoline);
handle_entry!(issuer_credential_serialize, vcx_issuer_credential_serialize, text_trampoline);
handle_entry!(issuer_credential_update_state, vcx_issuer_credential_update_state, u32_trampoline);
handle_entry!(issuer_credential_get_state, vcx_issuer_credential_get_state, u32_trampoline);
deserialize_entry!(issuer_credential_deserialize, vcx_issuer_credential_deserialize);

with_connection_entry!(proof_send_request, vcx_proof_send_request, unit_trampoline);
with_connection_entry!(proof_get_proof, vcx_get_proof, u32_text_trampoline);
handle_entry!(proof_serialize, vcx_proof_serialize, text_trampoline);
handle_entry!(proof_update_state, vcx_proof_update_state, u32_trampoline);
handle_entry!(proof_get_state, vcx_proof_get_state, u32_trampoline);
deserialize_entry!(proof_deserialize, vcx_proof_deserialize);

static ENTRY_POINTS: &[(&Operation, EntryPoint)] = &[
    (&ops::INIT, init),
    (&ops::CONNECTION_CREATE, connection_create),
    (&ops::CONNECTION_CONNECT, connection_connect),
    (&ops::CONNECTION_INVITE_DETAILS, connection_invite_details),
    (&ops::CONNECTION_DELETE, connection_delete),
    (ops::CONNECTION.serialize, connection_serialize),
    (ops::CONNECTION.deserialize, connection_deserialize),
    (ops::CONNECTION.update_state, connection_update_state),
    (ops::CONNECTION.get_state, connection_get_state),
    (&ops::SCHEMA_CREATE, schema_create),
    (&ops::SCHEMA_GET_ATTRIBUTES, schema_get_attributes),
    (ops::SCHEMA.serialize, schema_serialize),
    (ops::SCHEMA.deserialize, schema_deserialize),
    (ops::SCHEMA.update_state, schema_update_state),
    (ops::SCHEMA.get_state, schema_get_state),
    (&ops::CREDENTIAL_DEF_CREATE, credential_def_create),
    (ops::CREDENTIAL_DEF.serialize, credential_def_serialize),
    (ops::CREDENTIAL_DEF.deserialize, credential_def_deserialize),
    (ops::CREDENTIAL_DEF.update_state, credential_def_update_state),
    (ops::CREDENTIAL_DEF.get_state, credential_def_get_state),
    (&ops::ISSUER_CREDENTIAL_CREATE, issuer_credential_create),
    (&ops::ISSUER_CREDENTIAL_SEND_OFFER, issuer_credential_send_offer),
    (&ops::ISSUER_CREDENTIAL_SEND_CREDENTIAL, issuer_credential_send_credential),
    (ops::ISSUER_CREDENTIAL.serialize, issuer_credential_serialize),
    (ops::ISSUER_CREDENTIAL.deserialize, issuer_credential_deserialize),
    (ops::ISSUER_CREDENTIAL.update_state, issuer_credential_update_state),
    (ops::ISSUER_CREDENTIAL.get_state, issuer_credential_get_state),
    (&ops::PROOF_CREATE, proof_create),
    (&ops::PROOF_SEND_REQUEST, proof_send_request),
    (&ops::PROOF_GET_PROOF, proof_get_proof),
    (ops::PROOF.serialize, proof_serialize),
    (ops::PROOF.deserialize, proof_deserialize),
    (ops::PROOF.update_state, proof_update_state),
    (ops::PROOF.get_state, proof_get_state),
];

static RELEASE_POINTS: &[(&Operation, ReleasePoint)] = &[
    (ops::CONNECTION.release, vcx_connection_release),
    (ops::SCHEMA.release, vcx_schema_release),
    (ops::CREDENTIAL_DEF.release, vcx_credentialdef_release),
    (ops::ISSUER_CREDENTIAL.release, vcx_issuer_credential_release),
    (ops::PROOF.release, vcx_proof_release),
];

// ── Library ─────────────────────────────────────────────────────────────

/// The linked native library.
#[derive(Debug)]
pub struct SystemLibrary {
    entry_points: HashMap<&'static str, EntryPoint>,
    release_points: HashMap<&'static str, ReleasePoint>,
}

impl SystemLibrary {
    /// Binds every operation in [`ALL_OPERATIONS`](ops::ALL_OPERATIONS) to its
    /// native entry point.
    ///
    /// # Errors
    ///
    /// - [`CredexError::Protocol`] if an operation has no entry point or an
    ///   entry point's completion shape disagrees with the table.
    /// - [`CredexError::AlreadyInitialized`] while another `SystemLibrary` is
    ///   alive.
    pub fn new() -> Result<Self, CredexError> {
        let entry_points: HashMap<_, _> = ENTRY_POINTS
            .iter()
            .map(|(operation, entry)| (operation.name, *entry))
            .collect();
        let release_points: HashMap<_, _> = RELEASE_POINTS
            .iter()
            .map(|(operation, release)| (operation.name, *release))
            .collect();

        for operation in ops::ALL_OPERATIONS {
            let bound = entry_points.contains_key(operation.name)
                || (release_points.contains_key(operation.name)
                    && operation.shape == ResultShape::Unit);
            if !bound {
                return Err(CredexError::protocol(
                    operation.name,
                    "no native entry point bound",
                ));
            }
        }

        if LIBRARY_BOUND
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("native library is already bound to another runtime");
            return Err(CredexError::AlreadyInitialized);
        }

        debug!(
            operations = entry_points.len() + release_points.len(),
            "bound native entry points"
        );
        Ok(Self {
            entry_points,
            release_points,
        })
    }
}

impl NativeLibrary for SystemLibrary {
    fn invoke(
        &self,
        command_handle: CommandHandle,
        operation: &'static Operation,
        args: Vec<NativeArg>,
        _completion: CompletionBridge,
    ) -> u32 {
        let Some(entry) = self.entry_points.get(operation.name) else {
            return ErrorCode::InvalidOption.code();
        };

        let mut args = CArgs(args.into_iter());
        match entry(command_handle.get(), &mut args) {
            Ok(status) => status,
            Err(code) => {
                warn!(operation = operation.name, "could not marshal native arguments");
                code.code()
            }
        }
    }

    fn release(&self, operation: &'static Operation, handle: Handle) -> u32 {
        let Some(release) = self.release_points.get(operation.name) else {
            return ErrorCode::InvalidOption.code();
        };
        // SAFETY: plain integer argument; releasing an unknown handle reports
        // an error code.
        unsafe { release(handle.get()) }
    }

    fn attach(&self, completion: &CompletionBridge) {
        install_bridge(Some(completion.clone()));
    }

    fn detach(&self) {
        install_bridge(None);
    }
}

impl Drop for SystemLibrary {
    fn drop(&mut self) {
        install_bridge(None);
        LIBRARY_BOUND.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_library_owns_the_bridge_slot() {
        let first = SystemLibrary::new().unwrap();
        assert_eq!(SystemLibrary::new().unwrap_err(), CredexError::AlreadyInitialized);

        drop(first);
        assert!(BRIDGE.read().unwrap().is_none());
        let second = SystemLibrary::new().unwrap();
        drop(second);
    }
}
