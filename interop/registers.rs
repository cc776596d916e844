use derive_more::Display;

/// The seven general purpose registers the original compiler passes
/// arguments and results through.
///
/// Which slots a given routine reads or writes is part of that routine's
/// (undocumented) contract; callers pick filler values for the slots the
/// callee ignores. The same struct doubles as the output bundle of
/// [`call_func_x`](crate::trampoline::call_func_x), where every field holds
/// the register's value at the moment the callee returned.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RegisterBundle {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
    pub esi: u32,
    pub edi: u32,
    pub ebp: u32,
}

/// The callee's status flags, as captured by `lahf` immediately after the
/// call returned.
///
/// `lahf` copies the low byte of EFLAGS into `ah`, so the flag bits land in
/// bits 8..=15 of `eax`; the trampoline masks everything else off. This is
/// the only channel through which a still-native routine reports success or
/// failure: the 2002 compiler expressed "did this work" as a flag state, not
/// a return value. Interpreting the bits is entirely the call site's
/// business and differs per routine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[display("{_0:#06x}")]
pub struct Flags(u32);

impl Flags {
    pub const CARRY: u32 = 1 << 8;
    /// EFLAGS bit 1 is architecturally always one, so this bit is set in
    /// every genuine result.
    pub const ALWAYS_ONE: u32 = 1 << 9;
    pub const PARITY: u32 = 1 << 10;
    pub const ADJUST: u32 = 1 << 12;
    pub const ZERO: u32 = 1 << 14;
    pub const SIGN: u32 = 1 << 15;

    pub(crate) fn from_raw(raw: u32) -> Self {
        debug_assert_eq!(raw & !0xFF00, 0);
        Self(raw)
    }

    /// The masked `eax & 0xFF00` value, for call sites that test bit
    /// patterns directly the way the original C did (`& 0x100` for carry).
    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn carry(self) -> bool {
        self.0 & Self::CARRY != 0
    }

    pub fn parity(self) -> bool {
        self.0 & Self::PARITY != 0
    }

    pub fn adjust(self) -> bool {
        self.0 & Self::ADJUST != 0
    }

    pub fn zero(self) -> bool {
        self.0 & Self::ZERO != 0
    }

    pub fn sign(self) -> bool {
        self.0 & Self::SIGN != 0
    }
}
