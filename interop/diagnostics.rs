//! Crash attribution for foreign calls.
//!
//! Once control transfers into the image there is nothing between us and a
//! 2002-era access violation. The only observability this layer offers is a
//! per-thread slot recording which legacy address is currently executing, so
//! a crash handler can report "died inside original code at X" instead of
//! pointing at the trampoline.

use std::cell::Cell;

thread_local! {
    static CURRENT_FOREIGN_CALL: Cell<Option<usize>> = const { Cell::new(None) };
}

/// The legacy address currently executing under the trampoline on this
/// thread, or `None` when control is in native code.
pub fn current_foreign_call() -> Option<usize> {
    CURRENT_FOREIGN_CALL.get()
}

/// Marks the slot for the duration of one foreign call. Restores the
/// previous value on drop, so a hooked routine that re-enters the
/// trampoline attributes correctly at every depth.
pub(crate) struct ForeignCallGuard {
    previous: Option<usize>,
}

impl ForeignCallGuard {
    pub(crate) fn enter(address: usize) -> Self {
        Self {
            previous: CURRENT_FOREIGN_CALL.replace(Some(address)),
        }
    }
}

impl Drop for ForeignCallGuard {
    fn drop(&mut self) {
        CURRENT_FOREIGN_CALL.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_nests_and_restores() {
        assert_eq!(current_foreign_call(), None);
        {
            let _outer = ForeignCallGuard::enter(0x0066_B4E8);
            assert_eq!(current_foreign_call(), Some(0x0066_B4E8));
            {
                let _inner = ForeignCallGuard::enter(0x006E_A9B1);
                assert_eq!(current_foreign_call(), Some(0x006E_A9B1));
            }
            assert_eq!(current_foreign_call(), Some(0x0066_B4E8));
        }
        assert_eq!(current_foreign_call(), None);
    }
}
