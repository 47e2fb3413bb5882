//! C ABI for foreign callers.
//!
//! Every function takes NUL-terminated UTF-8 strings and returns a
//! status code from [`crate::errors::status`] (`0` is success).
//!
//! # Ownership
//!
//! `read_message_extern` and `list_accounts_extern` return a
//! [`MessageAndError`].  When `err` is `0`, `message` points at a
//! string allocated by this library and **owned by the caller** from
//! that moment on.  The caller must release it exactly once with
//! [`deallocate_cstring`] and must not free it any other way.  The
//! library never reads, reuses, or frees a returned buffer on its own.
//! When `err` is non-zero, `message` is null.

use std::ffi::{CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::ptr;

use libc::c_char;
use zeroize::Zeroizing;

use crate::api;
use crate::config::Settings;
use crate::errors::{status, CredVaultError, Result};

/// A message and its status code, returned by value across the ABI.
#[repr(C)]
pub struct MessageAndError {
    /// Caller-owned string, or null on error.
    pub message: *mut c_char,
    /// Status code; `0` on success.
    pub err: i32,
}

impl MessageAndError {
    fn failure(err: i32) -> Self {
        Self {
            message: ptr::null_mut(),
            err,
        }
    }
}

/// Borrow a C string argument as UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays
/// valid for `'a`.
unsafe fn arg<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(CredVaultError::InvalidInput(format!("{what} is null")));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| CredVaultError::InvalidInput(format!("{what} is not valid UTF-8")))
}

/// Borrow the passphrase argument as raw bytes.
///
/// # Safety
///
/// Same contract as [`arg`].
unsafe fn passphrase_arg<'a>(ptr: *const c_char) -> Result<&'a [u8]> {
    if ptr.is_null() {
        return Err(CredVaultError::InvalidInput("passphrase is null".into()));
    }
    Ok(CStr::from_ptr(ptr).to_bytes())
}

/// Run `f`, turning errors and panics into status codes.
fn status_of(f: impl FnOnce() -> Result<()>) -> i32 {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => status::OK,
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "ffi call failed");
            e.status_code()
        }
        Err(_) => status::INTERNAL,
    }
}

/// Run `f` and hand its string result to the caller.
fn message_of(f: impl FnOnce() -> Result<Zeroizing<String>>) -> MessageAndError {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(message)) => match CString::new(message.as_bytes()) {
            Ok(c) => MessageAndError {
                message: c.into_raw(),
                err: status::OK,
            },
            Err(e) => {
                let mut bytes = e.into_vec();
                zeroize::Zeroize::zeroize(&mut bytes);
                MessageAndError::failure(status::MALFORMED_RECORD)
            }
        },
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "ffi call failed");
            MessageAndError::failure(e.status_code())
        }
        Err(_) => MessageAndError::failure(status::INTERNAL),
    }
}

/// Create a new, empty password file.
///
/// # Safety
///
/// All pointers must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn create_password_file(file_path: *const c_char, passphrase: *const c_char) -> i32 {
    status_of(|| {
        let path = arg(file_path, "file path")?;
        let passphrase = passphrase_arg(passphrase)?;
        api::create_password_file(Path::new(path), passphrase, &Settings::from_env()?)
    })
}

/// Add an account; fails with `DUPLICATE_ACCOUNT` if it exists.
///
/// # Safety
///
/// All pointers must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn add_account(
    file_path: *const c_char,
    passphrase: *const c_char,
    account: *const c_char,
    username: *const c_char,
    password: *const c_char,
) -> i32 {
    status_of(|| {
        api::add_account(
            Path::new(arg(file_path, "file path")?),
            passphrase_arg(passphrase)?,
            arg(account, "account")?,
            arg(username, "username")?,
            arg(password, "password")?,
            &Settings::from_env()?,
        )
    })
}

/// Replace an account's username and password.
///
/// # Safety
///
/// All pointers must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn modify_account(
    file_path: *const c_char,
    passphrase: *const c_char,
    account: *const c_char,
    username: *const c_char,
    password: *const c_char,
) -> i32 {
    status_of(|| {
        api::modify_account(
            Path::new(arg(file_path, "file path")?),
            passphrase_arg(passphrase)?,
            arg(account, "account")?,
            arg(username, "username")?,
            arg(password, "password")?,
            &Settings::from_env()?,
        )
    })
}

/// Delete an account.
///
/// # Safety
///
/// All pointers must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn delete_account(
    file_path: *const c_char,
    passphrase: *const c_char,
    account: *const c_char,
) -> i32 {
    status_of(|| {
        api::delete_account(
            Path::new(arg(file_path, "file path")?),
            passphrase_arg(passphrase)?,
            arg(account, "account")?,
            &Settings::from_env()?,
        )
    })
}

/// Read an account's password (`message_id` 0) or username (1).
///
/// # Safety
///
/// All pointers must be null or valid NUL-terminated strings.  A
/// non-null `message` in the result must be released with
/// [`deallocate_cstring`].
#[no_mangle]
pub unsafe extern "C" fn read_message_extern(
    file_path: *const c_char,
    passphrase: *const c_char,
    account: *const c_char,
    message_id: u32,
) -> MessageAndError {
    message_of(|| {
        api::read_message(
            Path::new(arg(file_path, "file path")?),
            passphrase_arg(passphrase)?,
            arg(account, "account")?,
            message_id,
            &Settings::from_env()?,
        )
    })
}

/// List account names as a JSON array of strings.
///
/// # Safety
///
/// All pointers must be null or valid NUL-terminated strings.  A
/// non-null `message` in the result must be released with
/// [`deallocate_cstring`].
#[no_mangle]
pub unsafe extern "C" fn list_accounts_extern(
    file_path: *const c_char,
    passphrase: *const c_char,
) -> MessageAndError {
    message_of(|| {
        let names = api::list_accounts(
            Path::new(arg(file_path, "file path")?),
            passphrase_arg(passphrase)?,
            &Settings::from_env()?,
        )?;
        let json = serde_json::to_string(&names)
            .map_err(|e| CredVaultError::InvalidInput(format!("cannot encode account list: {e}")))?;
        Ok(Zeroizing::new(json))
    })
}

/// Release a string returned by this library.
///
/// Null is ignored.
///
/// # Safety
///
/// `message` must be null or a pointer obtained from a
/// `MessageAndError` returned by this library that has not been
/// released yet.
#[no_mangle]
pub unsafe extern "C" fn deallocate_cstring(message: *mut c_char) {
    if message.is_null() {
        return;
    }
    let owned = CString::from_raw(message);
    let mut bytes = owned.into_bytes_with_nul();
    zeroize::Zeroize::zeroize(&mut bytes);
}
