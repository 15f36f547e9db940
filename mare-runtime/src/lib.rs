//! # Mare Runtime
//!
//! C-ABI exports the Mare compiler's generated code links against: printing
//! helpers and elementary math. Build as a `staticlib`/`cdylib` and link
//! compiled Mare programs with `-lmare_runtime`.
//!
//! All printing goes to **stderr**. Floats print with six decimal places,
//! matching C's `%f`.

use std::ffi::CStr;
use std::io::{self, Write};
use std::os::raw::c_char;

// ============================================================
// Printing helpers
// ============================================================

/// Print a single byte as a character.
#[no_mangle]
pub extern "C" fn __mare_printc(x: c_char) {
    let _ = io::stderr().write_all(&[x as u8]);
}

/// Print a null-terminated byte string.
///
/// # Safety
///
/// `x` must be null or point to a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn __mare_printstr(x: *const c_char) {
    if x.is_null() {
        return;
    }
    let bytes = CStr::from_ptr(x).to_bytes();
    let _ = io::stderr().write_all(bytes);
}

#[no_mangle]
pub extern "C" fn __mare_printf(x: f32) {
    eprint!("{x:.6}");
}

#[no_mangle]
pub extern "C" fn __mare_printd(x: f64) {
    eprint!("{x:.6}");
}

#[no_mangle]
pub extern "C" fn __mare_printi8(x: i8) {
    eprint!("{x}");
}

#[no_mangle]
pub extern "C" fn __mare_printi16(x: i16) {
    eprint!("{x}");
}

#[no_mangle]
pub extern "C" fn __mare_printi32(x: i32) {
    eprint!("{x}");
}

#[no_mangle]
pub extern "C" fn __mare_printi64(x: i64) {
    eprint!("{x}");
}

/// Print the character whose code is `x`; always returns 0.0.
#[no_mangle]
pub extern "C" fn putchard(x: f64) -> f64 {
    let _ = io::stderr().write_all(&[(x as i32) as u8]);
    0.0
}

// ============================================================
// Unary math
// ============================================================

#[no_mangle]
pub extern "C" fn __mare_sqrtd(x: f64) -> f64 {
    x.sqrt()
}

#[no_mangle]
pub extern "C" fn __mare_sqrtf(x: f32) -> f32 {
    x.sqrt()
}

#[no_mangle]
pub extern "C" fn __mare_sind(x: f64) -> f64 {
    x.sin()
}

#[no_mangle]
pub extern "C" fn __mare_sinf(x: f32) -> f32 {
    x.sin()
}

#[no_mangle]
pub extern "C" fn __mare_cosd(x: f64) -> f64 {
    x.cos()
}

#[no_mangle]
pub extern "C" fn __mare_cosf(x: f32) -> f32 {
    x.cos()
}

#[no_mangle]
pub extern "C" fn __mare_tand(x: f64) -> f64 {
    x.tan()
}

#[no_mangle]
pub extern "C" fn __mare_tanf(x: f32) -> f32 {
    x.tan()
}

#[no_mangle]
pub extern "C" fn __mare_logd(x: f64) -> f64 {
    x.ln()
}

#[no_mangle]
pub extern "C" fn __mare_logf(x: f32) -> f32 {
    x.ln()
}

#[no_mangle]
pub extern "C" fn __mare_expd(x: f64) -> f64 {
    x.exp()
}

#[no_mangle]
pub extern "C" fn __mare_expf(x: f32) -> f32 {
    x.exp()
}

#[no_mangle]
pub extern "C" fn __mare_roundd(x: f64) -> f64 {
    x.round()
}

#[no_mangle]
pub extern "C" fn __mare_roundf(x: f32) -> f32 {
    x.round()
}

#[no_mangle]
pub extern "C" fn __mare_floord(x: f64) -> f64 {
    x.floor()
}

#[no_mangle]
pub extern "C" fn __mare_floorf(x: f32) -> f32 {
    x.floor()
}

#[no_mangle]
pub extern "C" fn __mare_ceild(x: f64) -> f64 {
    x.ceil()
}

#[no_mangle]
pub extern "C" fn __mare_ceilf(x: f32) -> f32 {
    x.ceil()
}

// ============================================================
// Binary math
// ============================================================

#[no_mangle]
pub extern "C" fn __mare_powd(x: f64, y: f64) -> f64 {
    x.powf(y)
}

#[no_mangle]
pub extern "C" fn __mare_powf(x: f32, y: f32) -> f32 {
    x.powf(y)
}

#[no_mangle]
pub extern "C" fn __mare_hypotd(x: f64, y: f64) -> f64 {
    x.hypot(y)
}

#[no_mangle]
pub extern "C" fn __mare_hypotf(x: f32, y: f32) -> f32 {
    x.hypot(y)
}

/// Floating-point remainder with the sign of the dividend, like C `fmod`.
#[no_mangle]
pub extern "C" fn __mare_fmodd(x: f64, y: f64) -> f64 {
    x % y
}

#[no_mangle]
pub extern "C" fn __mare_fmodf(x: f32, y: f32) -> f32 {
    x % y
}
