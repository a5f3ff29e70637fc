//! Engine backed by the native query library, loaded at runtime.
//!
//! The library exports:
//!
//! ```c
//! int  NativeInitializeSharedFiles(const char *files, env_t **env);
//! int  NativeExecuteQueryAsync(const wchar_t *query, env_t *env, void (*respond)(const wchar_t *));
//! void NativeDeInitialize(env_t **env);
//! ```

extern crate libloading;

use std::{
    cell::RefCell,
    ffi::{c_char, c_int, c_void, CString},
    path::{Path, PathBuf},
    ptr,
};

use libloading::Library;
use qstream::{ErrorCode, QueryEngine, Respond, Status};
use tracing::{debug, warn};

use crate::error::StartupError;

/// `wchar_t` of the platform the library was built for.
#[cfg(windows)]
pub type WideChar = u16;

#[cfg(not(windows))]
pub type WideChar = u32;

type ResponseFn = extern "C" fn(*const WideChar);
type InitializeFn = unsafe extern "C" fn(*const c_char, *mut *mut c_void) -> c_int;
type ExecuteFn = unsafe extern "C" fn(*const WideChar, *mut c_void, ResponseFn) -> c_int;
type DeinitializeFn = unsafe extern "C" fn(*mut *mut c_void);

const INITIALIZE: &[u8] = b"NativeInitializeSharedFiles\0";
const EXECUTE: &[u8] = b"NativeExecuteQueryAsync\0";
const DEINITIALIZE: [&[u8]; 2] = [b"NativeDeInitialize\0", b"NativeDeinitialize\0"];

/// Returned when the file list can't be passed as a C string.
const INVALID_FILE_LIST: Status = -200071;

/// Returned when the query can't be passed as a wide string.
const INVALID_QUERY: Status = -230080;

thread_local! {
    // The response callback carries no user data, so the responder for the
    // call running on this thread is parked here for its duration.
    static RESPONDER: RefCell<Option<Respond>> = RefCell::new(None);
}

extern "C" fn issue_response(response: *const WideChar) {
    if response.is_null() {
        warn!("engine issued a null response");
        return;
    }

    // SAFETY: the engine passes a NUL-terminated wide string that stays valid
    // for the duration of the callback.
    let text = unsafe { wide::decode(response) };

    RESPONDER.with(|responder| match responder.borrow_mut().as_mut() {
        Some(respond) => respond(text),
        None => warn!(response = %text, "response arrived outside of its query call, dropped"),
    });
}

/// Environment pointer owned by the library.
#[derive(Debug)]
pub struct NativeEnv(*mut c_void);

// SAFETY: the library shares one environment across concurrent queries and
// is responsible for its own synchronization. The harness never writes to it.
unsafe impl Send for NativeEnv {}
unsafe impl Sync for NativeEnv {}

pub struct NativeEngine {
    initialize: InitializeFn,
    execute: ExecuteFn,
    deinitialize: Option<DeinitializeFn>,

    // Keeps the function pointers above valid; dropped last.
    _library: Library,
}

impl NativeEngine {
    /// Platform file name of the default engine library.
    pub fn default_path() -> PathBuf {
        PathBuf::from(libloading::library_filename("QBASHQ-lib"))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StartupError> {
        let path = path.as_ref().to_path_buf();
        let failed = |error: libloading::Error| {
            StartupError::Library(path.display().to_string(), error.to_string())
        };

        // SAFETY: loading runs the library's initializers; the engine library
        // has none with preconditions.
        let library = unsafe { Library::new(&path) }.map_err(failed)?;

        // SAFETY: the symbol types match the exported C signatures above.
        let (initialize, execute, deinitialize) = unsafe {
            let initialize = *library.get::<InitializeFn>(INITIALIZE).map_err(failed)?;
            let execute = *library.get::<ExecuteFn>(EXECUTE).map_err(failed)?;
            let deinitialize = DEINITIALIZE
                .iter()
                .find_map(|name| library.get::<DeinitializeFn>(name).ok().map(|symbol| *symbol));

            (initialize, execute, deinitialize)
        };

        if deinitialize.is_none() {
            warn!(library = %path.display(), "engine library exports no deinitialize entry point");
        }

        debug!(library = %path.display(), "engine library loaded");

        Ok(Self {
            initialize,
            execute,
            deinitialize,
            _library: library,
        })
    }
}

impl QueryEngine for NativeEngine {
    type Env = NativeEnv;

    fn initialize(&self, files: &str) -> Result<Self::Env, ErrorCode> {
        let files = CString::new(files).map_err(|_| ErrorCode(INVALID_FILE_LIST))?;
        let mut env: *mut c_void = ptr::null_mut();

        // SAFETY: `files` is NUL-terminated and `env` is a valid out pointer.
        let code = unsafe { (self.initialize)(files.as_ptr(), &mut env) };

        match code {
            0 => Ok(NativeEnv(env)),
            code => Err(ErrorCode(code)),
        }
    }

    fn execute(&self, env: &Self::Env, query: &str, respond: Respond) -> Status {
        let Some(query) = wide::encode(query) else {
            return INVALID_QUERY;
        };

        let previous = RESPONDER.with(|responder| responder.borrow_mut().replace(respond));
        debug_assert!(previous.is_none());

        // SAFETY: `query` is NUL-terminated, `env` came from a successful
        // initialize and the callback has the exported signature.
        let status = unsafe { (self.execute)(query.as_ptr(), env.0, issue_response) };

        RESPONDER.with(|responder| responder.borrow_mut().take());
        status
    }

    fn deinitialize(&self, mut env: Self::Env) {
        if let Some(deinitialize) = self.deinitialize {
            // SAFETY: `env` came from initialize and is not used afterwards.
            unsafe { deinitialize(&mut env.0) };
        }
    }
}

mod wide {
    use super::WideChar;

    /// NUL-terminated wide copy of `text`, `None` if `text` contains NUL.
    pub fn encode(text: &str) -> Option<Vec<WideChar>> {
        if text.contains('\0') {
            return None;
        }

        #[cfg(windows)]
        let mut wide = text.encode_utf16().collect::<Vec<_>>();

        #[cfg(not(windows))]
        let mut wide = text.chars().map(u32::from).collect::<Vec<_>>();

        wide.push(0);
        Some(wide)
    }

    /// # Safety
    /// `ptr` must point to a NUL-terminated wide string.
    pub unsafe fn decode(ptr: *const WideChar) -> String {
        let mut len = 0;
        while *ptr.add(len) != 0 {
            len += 1;
        }

        let units = std::slice::from_raw_parts(ptr, len);

        #[cfg(windows)]
        return String::from_utf16_lossy(units);

        #[cfg(not(windows))]
        return units
            .iter()
            .map(|unit| char::from_u32(*unit).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }

    #[cfg(test)]
    mod tests {
        use super::{decode, encode};

        #[test]
        fn test_wide_conversion() {
            for text in ["hello", "", "Zürich straße", "東京 タワー", "emoji 🦀"] {
                let wide = encode(text).unwrap();
                assert_eq!(*wide.last().unwrap(), 0);

                let decoded = unsafe { decode(wide.as_ptr()) };
                assert_eq!(decoded, text);
            }
        }

        #[test]
        fn test_interior_nul_is_rejected() {
            assert_eq!(encode("a\0b"), None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NativeEngine;
    use crate::error::StartupError;

    #[test]
    fn test_missing_library() {
        match NativeEngine::load("/nonexistent/libnothing.so") {
            Err(StartupError::Library(path, _)) => assert_eq!(path, "/nonexistent/libnothing.so"),
            _ => panic!("expected a library error"),
        }
    }
}
