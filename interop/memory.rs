//! Typed views onto fixed addresses in the game image.
//!
//! The image is a flat byte space whose layout is decided by a binary from
//! 2002. A [`Global`] is an (address, type) pair producing direct volatile
//! reads and writes of one field; a [`GlobalArray`] is the same for a fixed
//! table. Several views may alias one address with different types, and the
//! original reuses memory across game states, so that aliasing is a feature.
//! Nothing is checked: the wrong width or a wrong address silently corrupts
//! the running game, the same trade the original C macros made.
//!
//! All address resolution funnels through one private path. In a real
//! process it is the identity: field addresses are real addresses. Under
//! `cfg(test)` or the `scratch-image` feature, heap-backed scratch regions
//! stand in for the image instead, which keeps the aliasing semantics
//! testable on hosts where rct2.exe does not exist; an access outside every
//! mapped region panics rather than wild-writing the host.

use std::marker::PhantomData;
use std::mem::size_of;

/// A typed view of a single field at a fixed legacy address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Global<T> {
    address: u32,
    _field: PhantomData<*mut T>,
}

impl<T: Copy> Global<T> {
    pub const fn at(address: u32) -> Self {
        Self {
            address,
            _field: PhantomData,
        }
    }

    pub const fn address(self) -> u32 {
        self.address
    }

    pub fn as_ptr(self) -> *mut T {
        resolve(self.address, size_of::<T>()).cast()
    }

    /// # Safety
    ///
    /// The field at this address must really be `T`-shaped in the live
    /// image. No width, alignment or liveness check is possible.
    pub unsafe fn read(self) -> T {
        unsafe { self.as_ptr().read_volatile() }
    }

    /// # Safety
    ///
    /// Same contract as [`read`](Self::read).
    pub unsafe fn write(self, value: T) {
        unsafe { self.as_ptr().write_volatile(value) }
    }
}

/// A typed view of a fixed-size table at a legacy base address.
///
/// `N` documents the table length as laid out in the image and is only
/// debug-asserted; the image itself is the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalArray<T, const N: usize> {
    address: u32,
    _elems: PhantomData<*mut T>,
}

impl<T: Copy, const N: usize> GlobalArray<T, N> {
    pub const fn at(address: u32) -> Self {
        Self {
            address,
            _elems: PhantomData,
        }
    }

    pub const fn address(self) -> u32 {
        self.address
    }

    #[allow(clippy::len_without_is_empty)]
    pub const fn len(self) -> usize {
        N
    }

    pub fn element(self, index: usize) -> Global<T> {
        debug_assert!(index < N);
        Global::at(self.address + (index * size_of::<T>()) as u32)
    }

    pub fn as_mut_ptr(self) -> *mut T {
        resolve(self.address, N * size_of::<T>()).cast()
    }

    /// # Safety
    ///
    /// Same contract as [`Global::read`].
    pub unsafe fn read(self, index: usize) -> T {
        unsafe { self.element(index).read() }
    }

    /// # Safety
    ///
    /// Same contract as [`Global::read`].
    pub unsafe fn write(self, index: usize, value: T) {
        unsafe { self.element(index).write(value) }
    }
}

/// Declares typed [`Global`] views of fields in the image.
///
/// ```ignore
/// global_by_address! {
///     /// Lower 16 bits of the park rating.
///     pub PARK_RATING: u16 = 0x01357CB0;
/// }
/// ```
#[macro_export]
macro_rules! global_by_address {
    ($(
        $(#[$($attrss:tt)*])*
        $vis:vis
        $name:ident: $type:ty = $address:literal;
    )+) => {
        $(
            $(#[$($attrss)*])*
            $vis const $name: $crate::memory::Global<$type> =
                $crate::memory::Global::at($address);
        )+
    };
}

/// Declares typed [`GlobalArray`] views of fixed tables in the image.
#[macro_export]
macro_rules! array_by_address {
    ($(
        $(#[$($attrss:tt)*])*
        $vis:vis
        $name:ident: [$type:ty; $count:expr] = $address:literal;
    )+) => {
        $(
            $(#[$($attrss)*])*
            $vis const $name: $crate::memory::GlobalArray<$type, $count> =
                $crate::memory::GlobalArray::at($address);
        )+
    };
}

/// Declares callable function pointers for the minority of image routines
/// that use a plain calling convention instead of the register one. Also
/// emits a `<NAME>_ADDRESS` constant for trampoline or hook use.
///
/// These should be declarable as statics without the `LazyLock`, but the
/// compiler rejects transmuting an integer to a pointer in a constant; the
/// one-time runtime initialization is the workable equivalent.
#[macro_export]
macro_rules! legacy_fn {
    ($(
        $(#[$($attrss:tt)*])*
        $vis:vis
        $name:ident: $signature:ty = $address:literal;
    )+) => {
        $(
            $crate::__private::paste! {
                $vis const [<$name _ADDRESS>]: usize = $address;

                $(#[$($attrss)*])*
                $vis static $name: ::std::sync::LazyLock<$signature> =
                    ::std::sync::LazyLock::new(|| unsafe {
                        ::core::mem::transmute::<usize, $signature>([<$name _ADDRESS>])
                    });
            }
        )+
    };
}

pub(crate) fn resolve(address: u32, len: usize) -> *mut u8 {
    #[cfg(any(test, feature = "scratch-image"))]
    {
        match scratch::lookup(address, len) {
            Some(ptr) => ptr,
            None => panic!("no scratch region maps legacy address {address:#010x} (+{len})"),
        }
    }
    #[cfg(not(any(test, feature = "scratch-image")))]
    {
        let _ = len;
        address as usize as *mut u8
    }
}

/// Drops the loader's protection from the rct2 image so the overlay can
/// write its data and the hook installer can patch its code. Must run once
/// at attach, before anything else touches the image.
#[cfg(all(windows, not(any(test, feature = "scratch-image"))))]
pub fn unprotect_image() -> crate::Result<()> {
    use windows::Win32::System::Memory::{
        VirtualProtect, PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS,
    };

    // Code and data sections of rct2.exe as mapped at its preferred base.
    const IMAGE_RANGES: &[(u32, usize)] = &[
        (0x0040_1000, 0x008A_4000 - 0x0040_1000), // .text
        (0x008A_4000, 0x0142_9000 - 0x008A_4000), // data and bss
    ];

    for &(start, len) in IMAGE_RANGES {
        let mut old = PAGE_PROTECTION_FLAGS(0);
        unsafe {
            VirtualProtect(
                start as usize as *const core::ffi::c_void,
                len,
                PAGE_EXECUTE_READWRITE,
                &mut old,
            )
        }
        .map_err(|source| crate::InteropError::PageProtection {
            address: start,
            source,
        })?;
        tracing::debug!(start, len, "unprotected image range");
    }
    Ok(())
}

#[cfg(any(test, feature = "scratch-image"))]
pub use scratch::map_scratch_region;

#[cfg(any(test, feature = "scratch-image"))]
mod scratch {
    use std::sync::RwLock;

    use crate::{InteropError, Result};

    struct Region {
        start: u32,
        len: usize,
        // Base of a leaked, zero-filled allocation; stored as an integer so
        // the registry stays Send + Sync without pointer gymnastics.
        base: usize,
    }

    static REGIONS: RwLock<Vec<Region>> = RwLock::new(Vec::new());

    /// Backs the legacy address range `start..start + len` with zeroed host
    /// memory. Regions live for the rest of the process; overlapping an
    /// existing region is refused so two tests cannot silently share state.
    pub fn map_scratch_region(start: u32, len: usize) -> Result<()> {
        let mut regions = REGIONS.write().expect("scratch registry poisoned");
        let end = start as u64 + len as u64;
        for existing in regions.iter() {
            let existing_end = existing.start as u64 + existing.len as u64;
            if (start as u64) < existing_end && (existing.start as u64) < end {
                return Err(InteropError::ScratchOverlap {
                    start,
                    end: end as u32,
                });
            }
        }
        let base = Box::leak(vec![0u8; len].into_boxed_slice()).as_mut_ptr() as usize;
        tracing::debug!(start, len, "mapped scratch region for image range");
        regions.push(Region { start, len, base });
        Ok(())
    }

    pub fn lookup(address: u32, len: usize) -> Option<*mut u8> {
        let regions = REGIONS.read().expect("scratch registry poisoned");
        for region in regions.iter() {
            let Some(offset) = (address as u64).checked_sub(region.start as u64) else {
                continue;
            };
            if offset + len as u64 <= region.len as u64 {
                return Some((region.base + offset as usize) as *mut u8);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy_fn;

    legacy_fn! {
        STUB_ENTRY: extern "C" fn() = 0x0040A000;
    }

    global_by_address! {
        WIDE: u32 = 0x009A0000;
        LOW_BYTE: u8 = 0x009A0000;
        LOW_WORD: u16 = 0x009A0000;
        HIGH_WORD: u16 = 0x009A0002;
        SIGNED_BYTE: i8 = 0x009A0000;
        SIGNED_WORD: i16 = 0x009A0010;
        UNSIGNED_WORD: u16 = 0x009A0010;
    }

    array_by_address! {
        WORD_TABLE: [u16; 8] = 0x009A0020;
    }

    fn map_test_region() {
        // First caller maps it; later tests reuse the same region.
        let _ = map_scratch_region(0x009A0000, 0x100);
    }

    #[test]
    fn round_trip_at_every_width() {
        map_test_region();
        unsafe {
            LOW_BYTE.write(0xAB);
            assert_eq!(LOW_BYTE.read(), 0xAB);
            SIGNED_WORD.write(-2);
            assert_eq!(SIGNED_WORD.read(), -2);
            WIDE.write(0xDEAD_BEEF);
            assert_eq!(WIDE.read(), 0xDEAD_BEEF);
        }
    }

    #[test]
    fn views_alias_the_same_bytes() {
        map_test_region();
        unsafe {
            WIDE.write(0x1122_3344);
            assert_eq!(LOW_BYTE.read(), 0x44);
            assert_eq!(LOW_WORD.read(), 0x3344);
            assert_eq!(HIGH_WORD.read(), 0x1122);

            LOW_BYTE.write(0xFF);
            assert_eq!(SIGNED_BYTE.read(), -1);
            assert_eq!(WIDE.read(), 0x1122_33FF);

            SIGNED_WORD.write(-1);
            assert_eq!(UNSIGNED_WORD.read(), 0xFFFF);
        }
    }

    #[test]
    fn array_elements_land_at_fixed_offsets() {
        map_test_region();
        unsafe {
            for i in 0..WORD_TABLE.len() {
                WORD_TABLE.write(i, 0x0100 + i as u16);
            }
            assert_eq!(WORD_TABLE.read(0), 0x0100);
            assert_eq!(WORD_TABLE.read(7), 0x0107);
            // The third element is just a Global at base + 2 * 2.
            assert_eq!(Global::<u16>::at(0x009A0024).read(), 0x0102);
        }
    }

    #[test]
    fn legacy_fn_exposes_both_address_and_pointer() {
        assert_eq!(STUB_ENTRY_ADDRESS, 0x0040A000);
        assert_eq!((*STUB_ENTRY) as usize, 0x0040A000);
    }

    #[test]
    fn overlapping_scratch_regions_are_refused() {
        map_test_region();
        let err = map_scratch_region(0x009A0080, 0x10).unwrap_err();
        assert!(matches!(err, crate::InteropError::ScratchOverlap { .. }));
    }
}
