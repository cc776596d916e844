//! Patches the image so original code transfers control to rewritten
//! functions.
//!
//! This is the other half of progressive replacement: once a routine has a
//! native rewrite, the copy in the image gets its prologue overwritten with
//! a call out to the rewrite followed by `ret`, so every remaining native
//! caller takes the new path without being touched itself. The caller of
//! [`install_call_hook`] states how many bytes at the site may be clobbered;
//! overwriting part of an instruction past that budget would leave garbage
//! opcodes behind the patch.

use iced_x86::code_asm::CodeAssembler;
use iced_x86::IcedError;

use crate::error::{InteropError, Result};

/// The largest patch [`install_call_hook`] will emit.
pub const MAX_PATCH_LEN: usize = 16;

/// Overwrites the routine at `address` with `call native; ret` and returns
/// the number of bytes written.
///
/// `native` must use a calling convention compatible with how the original
/// routine was entered (for register-convention routines that means a
/// naked or assembly shim; for the handful of cdecl routines an
/// `extern "cdecl" fn` works directly). `budget` is the number of bytes at
/// `address` known to be safe to destroy.
pub fn install_call_hook(address: u32, native: usize, budget: usize) -> Result<usize> {
    let patch = assemble_call_stub(address, native)?;
    if patch.len() > budget.min(MAX_PATCH_LEN) {
        return Err(InteropError::PatchTooLarge {
            address,
            len: patch.len(),
            budget: budget.min(MAX_PATCH_LEN),
        });
    }
    patch_bytes(address, &patch)?;
    Ok(patch.len())
}

/// Blanks `len` bytes at `address` with `nop`, for call sites whose callee
/// has been replaced by native code that runs elsewhere.
pub fn write_nop(address: u32, len: usize) -> Result<()> {
    patch_bytes(address, &vec![0x90; len])
}

/// Writes raw bytes into the image through the central resolve path,
/// lifting page protection first where that applies.
pub fn patch_bytes(address: u32, bytes: &[u8]) -> Result<()> {
    unprotect_patch_site(address, bytes.len())?;
    let dst = crate::memory::resolve(address, bytes.len());
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
    }
    tracing::debug!(address, patch = %hex::encode(bytes), "patched image");
    Ok(())
}

fn assemble_call_stub(address: u32, native: usize) -> Result<Vec<u8>> {
    // The image is 32-bit code, so the stub is assembled in 32-bit mode
    // regardless of the host. iced takes absolute targets as u64.
    let mut asm = CodeAssembler::new(32).map_err(|e| assembly_error(address, e))?;
    asm.call(native as u64)
        .map_err(|e| assembly_error(address, e))?;
    asm.ret().map_err(|e| assembly_error(address, e))?;
    asm.assemble(u64::from(address))
        .map_err(|e| assembly_error(address, e))
}

fn assembly_error(address: u32, source: IcedError) -> InteropError {
    InteropError::PatchAssembly {
        address,
        message: source.to_string(),
    }
}

#[cfg(all(windows, not(any(test, feature = "scratch-image"))))]
fn unprotect_patch_site(address: u32, len: usize) -> Result<()> {
    use windows::Win32::System::Memory::{
        VirtualProtect, PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS,
    };

    let mut old = PAGE_PROTECTION_FLAGS(0);
    unsafe {
        VirtualProtect(
            address as usize as *const core::ffi::c_void,
            len,
            PAGE_EXECUTE_READWRITE,
            &mut old,
        )
    }
    .map_err(|source| InteropError::PageProtection { address, source })
}

#[cfg(not(all(windows, not(any(test, feature = "scratch-image")))))]
fn unprotect_patch_site(_address: u32, _len: usize) -> Result<()> {
    // Scratch regions are plain heap memory.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{map_scratch_region, Global};

    fn map_code_region() {
        let _ = map_scratch_region(0x00660000, 0x100);
    }

    fn read_bytes(address: u32, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| unsafe { Global::<u8>::at(address + i as u32).read() })
            .collect()
    }

    #[test]
    fn call_hook_is_call_rel32_then_ret() {
        map_code_region();
        let site = 0x0066_0010;
        let native = 0x0040_A000usize;
        let len = install_call_hook(site, native, 16).unwrap();
        assert_eq!(len, 6);

        let bytes = read_bytes(site, len);
        assert_eq!(bytes[0], 0xE8);
        let rel = i32::from_le_bytes(bytes[1..5].try_into().unwrap());
        assert_eq!(site as i64 + 5 + rel as i64, native as i64);
        assert_eq!(bytes[5], 0xC3);
    }

    #[test]
    fn oversized_patch_is_refused_before_writing() {
        map_code_region();
        let site = 0x0066_0040;
        let err = install_call_hook(site, 0x0040_A000, 3).unwrap_err();
        assert!(matches!(err, InteropError::PatchTooLarge { len: 6, .. }));
        // Nothing was written.
        assert_eq!(read_bytes(site, 6), vec![0; 6]);
    }

    #[test]
    fn nops_blank_a_replaced_call_site() {
        map_code_region();
        let site = 0x0066_0080;
        write_nop(site, 5).unwrap();
        assert_eq!(read_bytes(site, 5), vec![0x90; 5]);
    }
}
