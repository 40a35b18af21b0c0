//! C FFI bindings for da-core
//!
//! This crate provides a C-compatible API for use with Qt or other C/C++ applications.
//! The grid UI decodes tables and resolves references through these calls.

use da_core::{ColumnRoleMap, Config, DirectoryFetcher, StringResolver, StringTable, TableData};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Arc;

/// Opaque handle to a string resolver
pub struct FfiResolver {
    inner: StringResolver,
}

/// Opaque handle to a decoded table
pub struct FfiTable {
    inner: TableData,
}

unsafe fn to_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        None
    } else {
        CStr::from_ptr(s).to_str().ok()
    }
}

fn into_c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Open a resolver over the TLK files in `tlk_dir` and wait for it to load.
///
/// A resolver whose string tables fail to load is still returned; it
/// resolves every reference to its literal numeral.
///
/// # Safety
/// - `tlk_dir` must be a valid C string
/// - `standard` and `custom` must be valid C strings or null; null selects
///   the default resource names
/// - Returns null on error
#[no_mangle]
pub unsafe extern "C" fn da_resolver_open(
    tlk_dir: *const c_char,
    standard: *const c_char,
    custom: *const c_char,
) -> *mut FfiResolver {
    let Some(dir) = to_str(tlk_dir) else {
        return ptr::null_mut();
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(_) => return ptr::null_mut(),
    };

    let names = Config::default().string_tables;
    let resolver = StringResolver::new(
        Arc::new(DirectoryFetcher::new(dir)),
        to_str(standard).map_or(names.standard, str::to_string),
        to_str(custom).map_or(names.custom, str::to_string),
    );
    runtime.block_on(resolver.ensure_ready());

    Box::into_raw(Box::new(FfiResolver { inner: resolver }))
}

/// Whether the resolver loaded its string tables (1) or fell back (0)
///
/// # Safety
/// - `resolver` must be a valid pointer returned by `da_resolver_open`
#[no_mangle]
pub unsafe extern "C" fn da_resolver_loaded(resolver: *const FfiResolver) -> i32 {
    if resolver.is_null() {
        return 0;
    }
    ((*resolver).inner.status() == da_core::ResolverStatus::Ready) as i32
}

/// Resolve a string reference
///
/// # Safety
/// - `resolver` must be a valid pointer returned by `da_resolver_open`
/// - `reference` must be a valid C string
/// - Caller must free the returned string with `da_free_string`
#[no_mangle]
pub unsafe extern "C" fn da_resolver_resolve(
    resolver: *const FfiResolver,
    reference: *const c_char,
) -> *mut c_char {
    if resolver.is_null() {
        return ptr::null_mut();
    }
    match to_str(reference) {
        Some(r) => into_c_string((*resolver).inner.resolve(r)),
        None => ptr::null_mut(),
    }
}

/// Free a resolver
///
/// # Safety
/// - `resolver` must be a valid pointer returned by `da_resolver_open` or null
#[no_mangle]
pub unsafe extern "C" fn da_free_resolver(resolver: *mut FfiResolver) {
    if !resolver.is_null() {
        drop(Box::from_raw(resolver));
    }
}

/// Decode 2DA text
///
/// # Safety
/// - `resolver` must be a valid pointer returned by `da_resolver_open` or null;
///   without one, reference columns keep their numerals
/// - `kind` must be a valid C string or null; it selects the column roles
/// - `text` must be a valid C string
/// - Returns null on error
#[no_mangle]
pub unsafe extern "C" fn da_decode(
    resolver: *const FfiResolver,
    kind: *const c_char,
    text: *const c_char,
) -> *mut FfiTable {
    let Some(text) = to_str(text) else {
        return ptr::null_mut();
    };
    let roles = ColumnRoleMap::default().for_table(to_str(kind).unwrap_or_default());

    let table = if resolver.is_null() {
        let literal = StringResolver::settled(StringTable::new(), StringTable::new());
        da_core::decode(text, &roles, &literal)
    } else {
        da_core::decode(text, &roles, &(*resolver).inner)
    };

    Box::into_raw(Box::new(FfiTable { inner: table }))
}

/// Free a decoded table
///
/// # Safety
/// - `table` must be a valid pointer returned by `da_decode` or null
#[no_mangle]
pub unsafe extern "C" fn da_free_table(table: *mut FfiTable) {
    if !table.is_null() {
        drop(Box::from_raw(table));
    }
}

/// Get the row count of a decoded table
///
/// # Safety
/// - `table` must be a valid pointer returned by `da_decode`
#[no_mangle]
pub unsafe extern "C" fn da_table_row_count(table: *const FfiTable) -> usize {
    if table.is_null() {
        return 0;
    }
    (*table).inner.row_count()
}

/// Get the column count of a decoded table
///
/// # Safety
/// - `table` must be a valid pointer returned by `da_decode`
#[no_mangle]
pub unsafe extern "C" fn da_table_col_count(table: *const FfiTable) -> usize {
    if table.is_null() {
        return 0;
    }
    (*table).inner.column_count()
}

/// Get a column name by index
///
/// # Safety
/// - `table` must be a valid pointer returned by `da_decode`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `da_free_string`
#[no_mangle]
pub unsafe extern "C" fn da_table_col_name(table: *const FfiTable, index: usize) -> *mut c_char {
    if table.is_null() {
        return ptr::null_mut();
    }

    (&(*table)
        .inner
        .columns)
        .get(index)
        .map(|c| into_c_string(c.as_str()))
        .unwrap_or(ptr::null_mut())
}

/// Get a cell value as a string; absent values yield an empty string
///
/// # Safety
/// - `table` must be a valid pointer returned by `da_decode`
/// - Returns null if row or col is out of bounds
/// - Caller must free the returned string with `da_free_string`
#[no_mangle]
pub unsafe extern "C" fn da_table_cell(table: *const FfiTable, row: usize, col: usize) -> *mut c_char {
    if table.is_null() {
        return ptr::null_mut();
    }

    let inner = &(*table).inner;
    match (inner.rows.get(row), inner.columns.get(col)) {
        (Some(r), Some(c)) => into_c_string(r.get(c).map(|v| v.to_string()).unwrap_or_default()),
        _ => ptr::null_mut(),
    }
}

/// Render a decoded table as CSV
///
/// # Safety
/// - `table` must be a valid pointer returned by `da_decode`
/// - `name` must be a valid C string or null
/// - Caller must free the returned string with `da_free_string`
#[no_mangle]
pub unsafe extern "C" fn da_table_to_csv(table: *const FfiTable, name: *const c_char) -> *mut c_char {
    if table.is_null() {
        return ptr::null_mut();
    }
    into_c_string(da_core::to_csv(&(*table).inner, to_str(name).unwrap_or_default()))
}

/// Render a decoded table as JSON
///
/// # Safety
/// - `table` must be a valid pointer returned by `da_decode`
/// - Returns null on error
/// - Caller must free the returned string with `da_free_string`
#[no_mangle]
pub unsafe extern "C" fn da_table_to_json(table: *const FfiTable) -> *mut c_char {
    if table.is_null() {
        return ptr::null_mut();
    }
    match serde_json::to_string(&(*table).inner) {
        Ok(json) => into_c_string(json),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a da_* function or null
#[no_mangle]
pub unsafe extern "C" fn da_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
