//! FFI bindings for Synheart Pace
//!
//! This module provides C-compatible functions for calling Pace from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `pace_free_string`.
//!
//! Dates are `YYYY-MM-DD`; signal kinds are `load`, `hrv`, `resting_heart_rate` or
//! `sleep_hours`. Observation input is pace.observation.v1 as NDJSON or a JSON array.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::baseline::{BaselineSample, SignalKind};
use crate::config::LoadConfiguration;
use crate::engine::{compute_daily_load_scores, LoadEngine};
use crate::schema::RecordAdapter;
use crate::sources::InMemoryObservations;
use crate::thresholds::ThresholdResolver;
use crate::types::{DateRange, RiskLevel};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

unsafe fn required_str(ptr: *const c_char, what: &str) -> Result<String, String> {
    cstr_to_string(ptr).ok_or_else(|| format!("Invalid {} string pointer", what))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    s.parse::<NaiveDate>()
        .map_err(|e| format!("Invalid date '{}': {}", s, e))
}

unsafe fn parse_kind(ptr: *const c_char) -> Result<SignalKind, String> {
    required_str(ptr, "signal kind")?
        .parse::<SignalKind>()
        .map_err(|e| e.to_string())
}

/// NULL selects the default configuration
unsafe fn parse_configuration(ptr: *const c_char) -> Result<LoadConfiguration, String> {
    match cstr_to_string(ptr) {
        Some(json) => serde_json::from_str(&json).map_err(|e| e.to_string()),
        None => Ok(LoadConfiguration::default()),
    }
}

unsafe fn parse_observations(ptr: *const c_char) -> Result<InMemoryObservations, String> {
    let input = required_str(ptr, "records")?;
    let records = RecordAdapter::parse(&input).map_err(|e| e.to_string())?;
    let batch = RecordAdapter::to_batch(&records).map_err(|e| e.to_string())?;
    Ok(InMemoryObservations::new(batch))
}

unsafe fn parse_range(start: *const c_char, end: *const c_char) -> Result<DateRange, String> {
    let start = parse_date(&required_str(start, "start date")?)?;
    let end = parse_date(&required_str(end, "end date")?)?;
    DateRange::new(start, end).map_err(|e| e.to_string())
}

/// Negative lookback selects the engine default
fn lookback_arg(lookback_days: i32) -> Option<u32> {
    u32::try_from(lookback_days).ok()
}

fn finish_string(result: Result<String, String>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e);
            ptr::null_mut()
        }
    }
}

fn finish_status(result: Result<(), String>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

fn risk_code(level: RiskLevel) -> i32 {
    match level {
        RiskLevel::Safe => 0,
        RiskLevel::Caution => 1,
        RiskLevel::High => 2,
        RiskLevel::Critical => 3,
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute daily load scores from observation records.
///
/// # Safety
/// - `records`, `start` and `end` must be valid null-terminated C strings.
/// - `configuration` is a LoadConfiguration JSON string or NULL for the default.
/// - A negative `lookback_days` uses the default lookback.
/// - Returns a JSON array that must be freed with `pace_free_string`.
/// - Returns NULL on error; call `pace_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pace_compute_daily_scores(
    records: *const c_char,
    configuration: *const c_char,
    start: *const c_char,
    end: *const c_char,
    lookback_days: i32,
) -> *mut c_char {
    clear_last_error();

    finish_string((|| -> Result<String, String> {
        let source = parse_observations(records)?;
        let configuration = parse_configuration(configuration)?;
        let range = parse_range(start, end)?;

        let scores = match lookback_arg(lookback_days) {
            Some(days) => compute_daily_load_scores(source.batch(), range, days, &configuration),
            None => {
                let engine = LoadEngine::new(configuration, Default::default())
                    .map_err(|e| e.to_string())?;
                engine.compute_daily_load_scores(&source, range, None)
            }
        }
        .map_err(|e| e.to_string())?;

        serde_json::to_string(&scores).map_err(|e| e.to_string())
    })())
}

/// Resolve the threshold profile and half-life for a configuration.
///
/// # Safety
/// - `configuration` is a LoadConfiguration JSON string or NULL for the default.
/// - Returns a JSON object that must be freed with `pace_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pace_resolve_thresholds(configuration: *const c_char) -> *mut c_char {
    clear_last_error();

    finish_string(parse_configuration(configuration).and_then(|config| {
        serde_json::to_string(&ThresholdResolver::resolve(&config)).map_err(|e| e.to_string())
    }))
}

// ============================================================================
// Stateful Engine API
// ============================================================================

/// Opaque handle to a LoadEngine; calls from several threads are serialised
pub struct PaceEngineHandle {
    engine: Mutex<LoadEngine>,
}

unsafe fn lock_engine<'a>(
    handle: *mut PaceEngineHandle,
) -> Result<MutexGuard<'a, LoadEngine>, String> {
    if handle.is_null() {
        return Err("Null engine pointer".to_string());
    }
    (*handle)
        .engine
        .lock()
        .map_err(|_| "Engine lock poisoned".to_string())
}

/// Create a new engine.
///
/// # Safety
/// - `configuration` is a LoadConfiguration JSON string or NULL for the default.
/// - Must be freed with `pace_engine_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_new(configuration: *const c_char) -> *mut PaceEngineHandle {
    clear_last_error();

    let configuration = match parse_configuration(configuration) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    let mut engine = LoadEngine::default();
    engine.set_configuration(configuration);
    let handle = Box::new(PaceEngineHandle {
        engine: Mutex::new(engine),
    });
    Box::into_raw(handle)
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_free(engine: *mut PaceEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Replace the active configuration.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `configuration` must be a LoadConfiguration JSON string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_set_configuration(
    engine: *mut PaceEngineHandle,
    configuration: *const c_char,
) -> i32 {
    clear_last_error();

    finish_status((|| -> Result<(), String> {
        let json = required_str(configuration, "configuration")?;
        let configuration: LoadConfiguration =
            serde_json::from_str(&json).map_err(|e| e.to_string())?;
        lock_engine(engine)?.set_configuration(configuration);
        Ok(())
    })())
}

/// Compute daily load scores with the engine's configuration and load baseline.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `records`, `start` and `end` must be valid null-terminated C strings.
/// - A negative `lookback_days` uses the engine default.
/// - Returns a JSON array that must be freed with `pace_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_compute(
    engine: *mut PaceEngineHandle,
    records: *const c_char,
    start: *const c_char,
    end: *const c_char,
    lookback_days: i32,
) -> *mut c_char {
    clear_last_error();

    finish_string((|| -> Result<String, String> {
        let source = parse_observations(records)?;
        let range = parse_range(start, end)?;
        let guard = lock_engine(engine)?;
        let scores = guard
            .compute_daily_load_scores(&source, range, lookback_arg(lookback_days))
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&scores).map_err(|e| e.to_string())
    })())
}

/// Classify a decayed load.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - Returns 0 (safe), 1 (caution), 2 (high) or 3 (critical); -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_classify(engine: *mut PaceEngineHandle, load: f64) -> i32 {
    clear_last_error();

    match lock_engine(engine) {
        Ok(guard) => risk_code(guard.classify(load)),
        Err(e) => {
            set_last_error(&e);
            -1
        }
    }
}

/// Start a calibration session.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `kind` must be a valid null-terminated C string.
/// - Returns the session id, to be freed with `pace_free_string`; NULL on error.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_start_calibration(
    engine: *mut PaceEngineHandle,
    kind: *const c_char,
) -> *mut c_char {
    clear_last_error();

    finish_string((|| -> Result<String, String> {
        let kind = parse_kind(kind)?;
        let session = lock_engine(engine)?
            .start_calibration(kind)
            .map_err(|e| e.to_string())?;
        Ok(session.to_string())
    })())
}

/// Record a calibration sample.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `kind` must be a valid null-terminated C string.
/// - `date` is a `YYYY-MM-DD` string, or NULL for an undated sample.
/// - Returns the record outcome as JSON, to be freed with `pace_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_record_sample(
    engine: *mut PaceEngineHandle,
    kind: *const c_char,
    date: *const c_char,
    value: f64,
) -> *mut c_char {
    clear_last_error();

    finish_string((|| -> Result<String, String> {
        let kind = parse_kind(kind)?;
        let sample = match cstr_to_string(date) {
            Some(d) => BaselineSample::on(parse_date(&d)?, value),
            None => BaselineSample::undated(value),
        };
        let outcome = lock_engine(engine)?
            .record_sample(kind, sample)
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&outcome).map_err(|e| e.to_string())
    })())
}

/// Record a good day's decayed load into the load calibration.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `records` and `date` must be valid null-terminated C strings.
/// - Returns the record outcome as JSON, to be freed with `pace_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_record_good_day(
    engine: *mut PaceEngineHandle,
    records: *const c_char,
    date: *const c_char,
) -> *mut c_char {
    clear_last_error();

    finish_string((|| -> Result<String, String> {
        let source = parse_observations(records)?;
        let date = parse_date(&required_str(date, "date")?)?;
        let outcome = lock_engine(engine)?
            .record_good_day(date, &source)
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&outcome).map_err(|e| e.to_string())
    })())
}

/// Calibrate a physiological baseline from sample records.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `kind`, `records` and `as_of` must be valid null-terminated C strings.
/// - Returns the record outcome as JSON, to be freed with `pace_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_calibrate_physiological(
    engine: *mut PaceEngineHandle,
    kind: *const c_char,
    records: *const c_char,
    as_of: *const c_char,
) -> *mut c_char {
    clear_last_error();

    finish_string((|| -> Result<String, String> {
        let kind = parse_kind(kind)?;
        let input = required_str(records, "records")?;
        let parsed = RecordAdapter::parse(&input).map_err(|e| e.to_string())?;
        let samples = RecordAdapter::to_samples(&parsed).map_err(|e| e.to_string())?;
        let as_of = parse_date(&required_str(as_of, "as_of date")?)?;

        let outcome = lock_engine(engine)?
            .calibrate_physiological(kind, &samples, as_of)
            .map_err(|e| e.to_string())?;
        serde_json::to_string(&outcome).map_err(|e| e.to_string())
    })())
}

/// Cancel the active calibration session.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `kind` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_cancel_calibration(
    engine: *mut PaceEngineHandle,
    kind: *const c_char,
) -> i32 {
    clear_last_error();

    finish_status((|| -> Result<(), String> {
        let kind = parse_kind(kind)?;
        lock_engine(engine)?
            .cancel_calibration(kind)
            .map(|_| ())
            .map_err(|e| e.to_string())
    })())
}

/// Discard a calibrated baseline.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `kind` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_reset_baseline(
    engine: *mut PaceEngineHandle,
    kind: *const c_char,
) -> i32 {
    clear_last_error();

    finish_status((|| -> Result<(), String> {
        let kind = parse_kind(kind)?;
        lock_engine(engine)?
            .reset_baseline(kind)
            .map_err(|e| e.to_string())
    })())
}

/// Compute `mean + deviations * spread` for a calibrated baseline.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `kind` must be a valid null-terminated C string.
/// - `out` must point to writable memory for one double.
/// - Returns 0 on success, -1 on error.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_threshold(
    engine: *mut PaceEngineHandle,
    kind: *const c_char,
    deviations: f64,
    out: *mut f64,
) -> i32 {
    clear_last_error();

    finish_status((|| -> Result<(), String> {
        if out.is_null() {
            return Err("Null output pointer".to_string());
        }
        let kind = parse_kind(kind)?;
        let value = lock_engine(engine)?
            .threshold(kind, deviations)
            .map_err(|e| e.to_string())?;
        *out = value;
        Ok(())
    })())
}

/// Calibrator state for one signal kind as JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `kind` must be a valid null-terminated C string.
/// - Returns a JSON object that must be freed with `pace_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_calibration_status(
    engine: *mut PaceEngineHandle,
    kind: *const c_char,
) -> *mut c_char {
    clear_last_error();

    finish_string((|| -> Result<String, String> {
        let kind = parse_kind(kind)?;
        let guard = lock_engine(engine)?;
        guard.calibrator(kind).to_json().map_err(|e| e.to_string())
    })())
}

/// Save engine state to JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - Returns a newly allocated string that must be freed with `pace_free_string`.
/// - Returns NULL on error; call `pace_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_save_state(engine: *mut PaceEngineHandle) -> *mut c_char {
    clear_last_error();

    finish_string(lock_engine(engine).and_then(|guard| guard.save_state().map_err(|e| e.to_string())))
}

/// Load engine state from JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `pace_engine_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `pace_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pace_engine_load_state(
    engine: *mut PaceEngineHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    finish_status((|| -> Result<(), String> {
        let json = required_str(json, "JSON")?;
        lock_engine(engine)?
            .load_state(&json)
            .map_err(|e| e.to_string())
    })())
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Pace functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Pace function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pace_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Pace function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pace_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Pace library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pace_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn pulse_records() -> CString {
        CString::new(
            r#"{"schema_version":"pace.observation.v1","recorded_at":"2024-01-01T12:00:00Z","record_type":"symptom","payload":{"symptom":{"severity":5,"polarity":"negative"}}}"#,
        )
        .unwrap()
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        pace_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_compute_daily_scores() {
        let records = pulse_records();
        let start = c("2024-01-01");
        let end = c("2024-01-06");

        unsafe {
            let result = pace_compute_daily_scores(
                records.as_ptr(),
                ptr::null(),
                start.as_ptr(),
                end.as_ptr(),
                0,
            );
            let json = take_string(result);
            let scores: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(scores.as_array().unwrap().len(), 6);
            assert_eq!(scores[0]["decayed_load"], 10.0);
            assert_eq!(scores[0]["risk_level"], "safe");
            assert_eq!(scores[3]["date"], "2024-01-04");
        }
    }

    #[test]
    fn test_ffi_resolve_thresholds() {
        let config = c(r#"{"mode":"preset","preset":"me_cfs"}"#);
        unsafe {
            let json = take_string(pace_resolve_thresholds(config.as_ptr()));
            let resolved: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(resolved["half_life_days"], 5.0);
        }
    }

    #[test]
    fn test_ffi_engine_lifecycle() {
        let load = c("load");

        unsafe {
            let engine = pace_engine_new(ptr::null());
            assert!(!engine.is_null());
            assert_eq!(pace_engine_classify(engine, 35.0), 1);

            let session = take_string(pace_engine_start_calibration(engine, load.as_ptr()));
            assert_eq!(session.len(), 36);

            for v in [10.0, 10.0, 10.0] {
                let outcome = pace_engine_record_sample(engine, load.as_ptr(), ptr::null(), v);
                take_string(outcome);
            }

            let mut threshold = 0.0;
            assert_eq!(
                pace_engine_threshold(engine, load.as_ptr(), 1.0, &mut threshold),
                0
            );
            assert_eq!(threshold, 10.0);
            assert_eq!(pace_engine_classify(engine, 35.0), 0);

            // Save and load into a fresh engine
            let state = pace_engine_save_state(engine);
            assert!(!state.is_null());
            let engine2 = pace_engine_new(ptr::null());
            assert_eq!(pace_engine_load_state(engine2, state), 0);
            pace_free_string(state);
            assert_eq!(pace_engine_classify(engine2, 35.0), 0);

            let status = take_string(pace_engine_calibration_status(engine2, load.as_ptr()));
            assert!(status.contains("\"state\":\"calibrated\""));

            assert_eq!(pace_engine_reset_baseline(engine2, load.as_ptr()), 0);
            assert_eq!(pace_engine_classify(engine2, 35.0), 1);

            pace_engine_free(engine);
            pace_engine_free(engine2);
        }
    }

    #[test]
    fn test_ffi_record_good_day() {
        let records = pulse_records();
        let load = c("load");
        let date = c("2024-01-01");

        unsafe {
            let engine = pace_engine_new(ptr::null());
            take_string(pace_engine_start_calibration(engine, load.as_ptr()));
            let json = take_string(pace_engine_record_good_day(
                engine,
                records.as_ptr(),
                date.as_ptr(),
            ));
            assert!(json.contains("\"sample_count\":1"));
            assert_eq!(pace_engine_cancel_calibration(engine, load.as_ptr()), 0);
            pace_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        let bad_kind = c("steps");
        let load = c("load");

        unsafe {
            let engine = pace_engine_new(ptr::null());

            let result = pace_engine_start_calibration(engine, bad_kind.as_ptr());
            assert!(result.is_null());
            let error = pace_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("steps"));

            // Cancelling an idle calibration is an explicit error
            assert_eq!(pace_engine_cancel_calibration(engine, load.as_ptr()), -1);
            assert!(!pace_last_error().is_null());

            assert_eq!(pace_engine_classify(ptr::null_mut(), 1.0), -1);
            pace_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_excessive_lookback_reports_error() {
        let records = pulse_records();
        let start = c("2024-01-01");
        let end = c("2024-01-06");

        unsafe {
            let result = pace_compute_daily_scores(
                records.as_ptr(),
                ptr::null(),
                start.as_ptr(),
                end.as_ptr(),
                i32::MAX,
            );
            assert!(result.is_null());
            let error = pace_last_error();
            assert!(!error.is_null());
            assert!(CStr::from_ptr(error).to_str().unwrap().contains("lookback"));

            let engine = pace_engine_new(ptr::null());
            let result =
                pace_engine_compute(engine, records.as_ptr(), start.as_ptr(), end.as_ptr(), i32::MAX);
            assert!(result.is_null());
            assert!(!pace_last_error().is_null());

            // The engine stays usable afterwards
            let result =
                pace_engine_compute(engine, records.as_ptr(), start.as_ptr(), end.as_ptr(), -1);
            take_string(result);
            pace_engine_free(engine);
        }
    }

    #[test]
    fn test_ffi_load_state_rejects_inconsistent_calibrator() {
        let load = c("load");

        unsafe {
            let engine = pace_engine_new(ptr::null());
            take_string(pace_engine_start_calibration(engine, load.as_ptr()));
            for v in [10.0, 10.0, 10.0] {
                take_string(pace_engine_record_sample(engine, load.as_ptr(), ptr::null(), v));
            }
            let state = take_string(pace_engine_save_state(engine));
            pace_engine_free(engine);

            let forged = c(&state.replace("\"calibrated\":true", "\"calibrated\":false"));
            let target = pace_engine_new(ptr::null());
            assert_eq!(pace_engine_load_state(target, forged.as_ptr()), -1);
            assert!(!pace_last_error().is_null());
            assert_eq!(pace_engine_classify(target, 35.0), 1);
            pace_engine_free(target);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = pace_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
