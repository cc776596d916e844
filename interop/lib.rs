//! Interop layer for running native code inside a live RollerCoaster
//! Tycoon 2 process.
//!
//! The original `rct2.exe` is mapped into the process at its preferred base
//! and keeps executing everything that has not been rewritten yet. This
//! crate is the seam between the two worlds:
//!
//! - [`memory`] treats fixed addresses inside the image as typed variables
//!   and arrays, with no checking of any kind. The declaration macros
//!   ([`global_by_address!`], [`array_by_address!`], [`legacy_fn!`]) are the
//!   only sanctioned way to name a location in the image.
//! - [`trampoline`] calls a function that still lives in the image, passing
//!   and retrieving values through the seven x86 general purpose registers
//!   the 2002 compiler used as its parameter-passing convention, and
//!   reporting the callee's EFLAGS byte as the result.
//! - [`hooks`] patches the image so that original code calls back into
//!   rewritten functions, which is how replacement proceeds one function at
//!   a time.
//! - [`addresses`] is the catalogue of known fields in the image.
//!
//! Nothing here is memory safe by construction and nothing tries to be: the
//! image layout is an externally fixed ABI and a wrong address or width is
//! silent corruption, exactly as it was for the original macros this layer
//! replaces. The whole layer assumes a single thread; the register file and
//! the image are shared mutable state with no locking discipline.

pub mod addresses;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod memory;
pub mod registers;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod trampoline;

pub use error::{InteropError, Result};
pub use memory::{Global, GlobalArray};
pub use registers::{Flags, RegisterBundle};
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use trampoline::{call_func_x, call_proc, call_proc_x};

#[doc(hidden)]
pub mod __private {
    pub use paste::paste;
}
