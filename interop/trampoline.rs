//! Register-convention calls into functions that still live in the game
//! image.
//!
//! The original compiler did not use a stack-based calling convention for
//! most internal routines: arguments arrive in whichever of eax, ebx, ecx,
//! edx, esi, edi and ebp the routine happens to read, results come back the
//! same way, and success or failure is frequently reported only through the
//! CPU flags. These entry points reproduce that convention exactly: load
//! all seven registers, `call` the raw address, capture EFLAGS with `lahf`
//! before anything can disturb them, and put the stack back the way the
//! original callers would have left it.
//!
//! There is no failure channel of its own. A bad address or a callee that
//! corrupts the stack takes the process down, which is the same bargain the
//! original call sites lived with. The one hard invariant is that the
//! callee must see the stack exactly as it would when called from original
//! code: return address on top, nothing of ours below it that we are not
//! prepared to lose.
//!
//! On `x86` this is the faithful 32-bit mechanism. On `x86_64` the same
//! marshalling runs over the 32-bit sub-registers with a 64-bit target
//! address; the 2002 image cannot be mapped there, but the register and
//! flags plumbing can be exercised against local stubs, which is what the
//! tests do. Other architectures have no equivalent of this convention and
//! the module is compiled out.

use core::arch::asm;

use crate::diagnostics::ForeignCallGuard;
use crate::registers::{Flags, RegisterBundle};

/// Register slots plus the target address, in the fixed layout the asm
/// blocks index by offset: seven dwords at 0..=24, target at 32.
#[repr(C)]
struct CallFrame {
    regs: [u32; 7],
    _pad: u32,
    target: usize,
}

impl CallFrame {
    fn new(target: usize, regs: &RegisterBundle) -> Self {
        Self {
            regs: [
                regs.eax, regs.ebx, regs.ecx, regs.edx, regs.esi, regs.edi, regs.ebp,
            ],
            _pad: 0,
            target,
        }
    }
}

/// Calls the routine at `address`, seeding all seven registers from `regs`
/// and discarding their post-call values.
///
/// Returns the callee's flags byte. Use this when the callee communicates
/// nothing, or nothing beyond a flag, back to the caller.
///
/// # Safety
///
/// `address` must be the entry of a routine using the game's register
/// convention, and the register values must satisfy whatever contract that
/// routine has. There is no way to check either; a violation is memory
/// corruption or a crash, not an error return.
pub unsafe fn call_proc_x(address: usize, regs: RegisterBundle) -> Flags {
    let frame = CallFrame::new(address, &regs);
    let _guard = ForeignCallGuard::enter(address);
    Flags::from_raw(unsafe { raw_call_proc(&frame) })
}

/// Calls the routine at `address` with the registers seeded from `regs`,
/// then writes the post-call value of every register back into `regs`.
///
/// This is the multi-value return path: a routine that reports, say, a
/// coordinate in ax/cx and a sprite index in dx is called through here and
/// read out of the bundle afterwards. The flags byte is returned exactly as
/// for [`call_proc_x`].
///
/// # Safety
///
/// Same contract as [`call_proc_x`].
pub unsafe fn call_func_x(address: usize, regs: &mut RegisterBundle) -> Flags {
    let mut frame = CallFrame::new(address, regs);
    let raw = {
        let _guard = ForeignCallGuard::enter(address);
        unsafe { raw_call_func(&mut frame) }
    };
    *regs = RegisterBundle {
        eax: frame.regs[0],
        ebx: frame.regs[1],
        ecx: frame.regs[2],
        edx: frame.regs[3],
        esi: frame.regs[4],
        edi: frame.regs[5],
        ebp: frame.regs[6],
    };
    Flags::from_raw(raw)
}

/// [`call_proc_x`] with every register zeroed, for routines that take no
/// register arguments at all.
///
/// # Safety
///
/// Same contract as [`call_proc_x`].
pub unsafe fn call_proc(address: usize) -> Flags {
    unsafe { call_proc_x(address, RegisterBundle::default()) }
}

// The asm blocks cannot name ebx or ebp as operands (both are reserved by
// the compiler), so each block saves them, uses them freely, and restores
// them before declaring any outputs. The target address is pushed and
// called through [esp] so that no register has to survive the callee to
// reach it.

#[cfg(target_arch = "x86")]
unsafe fn raw_call_proc(frame: &CallFrame) -> u32 {
    let flags: usize;
    unsafe {
        asm!(
            "push ebx",
            "push ebp",
            "push dword ptr [eax + 32]",
            "mov ebx, [eax + 4]",
            "mov ecx, [eax + 8]",
            "mov edx, [eax + 12]",
            "mov esi, [eax + 16]",
            "mov edi, [eax + 20]",
            "mov ebp, [eax + 24]",
            "mov eax, [eax]",
            "call dword ptr [esp]",
            "lahf",
            "and eax, 0xFF00",
            "add esp, 4",
            "pop ebp",
            "pop ebx",
            inout("eax") frame as *const CallFrame as usize => flags,
            out("ecx") _,
            out("edx") _,
            out("esi") _,
            out("edi") _,
            clobber_abi("C"),
        );
    }
    flags as u32
}

#[cfg(target_arch = "x86")]
unsafe fn raw_call_func(frame: &mut CallFrame) -> u32 {
    let flags: usize;
    unsafe {
        asm!(
            "push ebx",
            "push ebp",
            "push eax",
            "push dword ptr [eax + 32]",
            "mov ebx, [eax + 4]",
            "mov ecx, [eax + 8]",
            "mov edx, [eax + 12]",
            "mov esi, [eax + 16]",
            "mov edi, [eax + 20]",
            "mov ebp, [eax + 24]",
            "mov eax, [eax]",
            "call dword ptr [esp]",
            // Flags first: push and mov leave EFLAGS alone, so the lahf
            // image is still the callee's. The callee's full eax is saved
            // before lahf overwrites ah, then swapped back on top of the
            // masked flags value.
            "push eax",
            "lahf",
            "and eax, 0xFF00",
            "xchg eax, [esp]",
            // ebp doubles as the frame pointer here, so the callee's value
            // parks on the stack until the slot pointer is back in ebp.
            "push ebp",
            "mov ebp, [esp + 12]",
            "mov [ebp], eax",
            "mov [ebp + 4], ebx",
            "mov [ebp + 8], ecx",
            "mov [ebp + 12], edx",
            "mov [ebp + 16], esi",
            "mov [ebp + 20], edi",
            "pop eax",
            "mov [ebp + 24], eax",
            "pop eax",
            "add esp, 8",
            "pop ebp",
            "pop ebx",
            inout("eax") frame as *mut CallFrame as usize => flags,
            out("ecx") _,
            out("edx") _,
            out("esi") _,
            out("edi") _,
            clobber_abi("C"),
        );
    }
    flags as u32
}

#[cfg(target_arch = "x86_64")]
unsafe fn raw_call_proc(frame: &CallFrame) -> u32 {
    let flags: usize;
    unsafe {
        asm!(
            "push rbx",
            "push rbp",
            "push qword ptr [rax + 32]",
            "mov ebx, [rax + 4]",
            "mov ecx, [rax + 8]",
            "mov edx, [rax + 12]",
            "mov esi, [rax + 16]",
            "mov edi, [rax + 20]",
            "mov ebp, [rax + 24]",
            "mov eax, [rax]",
            "call qword ptr [rsp]",
            "lahf",
            "and eax, 0xFF00",
            "add rsp, 8",
            "pop rbp",
            "pop rbx",
            inout("rax") frame as *const CallFrame as usize => flags,
            out("rcx") _,
            out("rdx") _,
            out("rsi") _,
            out("rdi") _,
            clobber_abi("C"),
        );
    }
    flags as u32
}

#[cfg(target_arch = "x86_64")]
unsafe fn raw_call_func(frame: &mut CallFrame) -> u32 {
    let flags: usize;
    unsafe {
        asm!(
            "push rbx",
            "push rbp",
            "push rax",
            "push qword ptr [rax + 32]",
            "mov ebx, [rax + 4]",
            "mov ecx, [rax + 8]",
            "mov edx, [rax + 12]",
            "mov esi, [rax + 16]",
            "mov edi, [rax + 20]",
            "mov ebp, [rax + 24]",
            "mov eax, [rax]",
            "call qword ptr [rsp]",
            "push rax",
            "lahf",
            "and eax, 0xFF00",
            "xchg rax, [rsp]",
            "push rbp",
            "mov rbp, [rsp + 24]",
            "mov [rbp], eax",
            "mov [rbp + 4], ebx",
            "mov [rbp + 8], ecx",
            "mov [rbp + 12], edx",
            "mov [rbp + 16], esi",
            "mov [rbp + 20], edi",
            "pop rax",
            "mov [rbp + 24], eax",
            "pop rax",
            "add rsp, 16",
            "pop rbp",
            "pop rbx",
            inout("rax") frame as *mut CallFrame as usize => flags,
            out("rcx") _,
            out("rdx") _,
            out("rsi") _,
            out("rdi") _,
            clobber_abi("C"),
        );
    }
    flags as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics;
    use std::arch::naked_asm;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Stub targets standing in for routines inside the image. They follow
    // the same convention the trampoline speaks: arguments in the GP
    // registers, results wherever they feel like leaving them.

    #[unsafe(naked)]
    extern "C" fn stub_ret() {
        naked_asm!("ret")
    }

    #[unsafe(naked)]
    extern "C" fn stub_cmp_eax_ebx() {
        naked_asm!("cmp eax, ebx", "ret")
    }

    #[unsafe(naked)]
    extern "C" fn stub_add_eax_ebx() {
        naked_asm!("add eax, ebx", "ret")
    }

    #[unsafe(naked)]
    extern "C" fn stub_load_constants() {
        naked_asm!(
            "mov eax, 0x11110001",
            "mov ebx, 0x22220002",
            "mov ecx, 0x33330003",
            "mov edx, 0x44440004",
            "mov esi, 0x55550005",
            "mov edi, 0x66660006",
            "mov ebp, 0x77770007",
            "ret",
        )
    }

    #[cfg(target_arch = "x86")]
    #[unsafe(naked)]
    extern "C" fn stub_balanced_push_pop() {
        naked_asm!("push eax", "push ecx", "pop ecx", "pop eax", "ret")
    }

    #[cfg(target_arch = "x86_64")]
    #[unsafe(naked)]
    extern "C" fn stub_balanced_push_pop() {
        naked_asm!("push rax", "push rcx", "pop rcx", "pop rax", "ret")
    }

    static REG_SINK: [AtomicU32; 7] = [const { AtomicU32::new(0) }; 7];

    #[cfg(target_arch = "x86")]
    #[unsafe(naked)]
    extern "C" fn stub_spill_registers() {
        naked_asm!(
            "mov [{sink}], eax",
            "mov [{sink} + 4], ebx",
            "mov [{sink} + 8], ecx",
            "mov [{sink} + 12], edx",
            "mov [{sink} + 16], esi",
            "mov [{sink} + 20], edi",
            "mov [{sink} + 24], ebp",
            "ret",
            sink = sym REG_SINK,
        )
    }

    #[cfg(target_arch = "x86_64")]
    #[unsafe(naked)]
    extern "C" fn stub_spill_registers() {
        naked_asm!(
            "mov [rip + {sink}], eax",
            "mov [rip + {sink} + 4], ebx",
            "mov [rip + {sink} + 8], ecx",
            "mov [rip + {sink} + 12], edx",
            "mov [rip + {sink} + 16], esi",
            "mov [rip + {sink} + 20], edi",
            "mov [rip + {sink} + 24], ebp",
            "ret",
            sink = sym REG_SINK,
        )
    }

    #[test]
    fn flags_result_is_isolated_to_the_lahf_byte() {
        // 5 == 5: zero and parity set, carry and sign clear.
        let flags = unsafe {
            call_proc_x(
                stub_cmp_eax_ebx as usize,
                RegisterBundle {
                    eax: 5,
                    ebx: 5,
                    ..Default::default()
                },
            )
        };
        assert_eq!(flags.raw() & !0xFF00, 0);
        assert_eq!(
            flags.raw(),
            Flags::ZERO | Flags::PARITY | Flags::ALWAYS_ONE
        );

        // 5 - 10 borrows: carry, sign and adjust, no zero.
        let flags = unsafe {
            call_proc_x(
                stub_cmp_eax_ebx as usize,
                RegisterBundle {
                    eax: 5,
                    ebx: 10,
                    ..Default::default()
                },
            )
        };
        assert_eq!(flags.raw() & !0xFF00, 0);
        assert_ne!(flags.raw() & Flags::ALWAYS_ONE, 0);
        assert!(flags.carry());
        assert!(flags.sign());
        assert!(flags.adjust());
        assert!(!flags.zero());
    }

    #[test]
    fn all_seven_inputs_reach_the_callee() {
        let input = RegisterBundle {
            eax: 0xA1A1_0001,
            ebx: 0xB2B2_0002,
            ecx: 0xC3C3_0003,
            edx: 0xD4D4_0004,
            esi: 0xE5E5_0005,
            edi: 0xF6F6_0006,
            ebp: 0x0707_0007,
        };
        unsafe { call_proc_x(stub_spill_registers as usize, input) };
        let observed: Vec<u32> = REG_SINK.iter().map(|v| v.load(Ordering::SeqCst)).collect();
        assert_eq!(
            observed,
            [
                input.eax, input.ebx, input.ecx, input.edx, input.esi, input.edi, input.ebp
            ]
        );
    }

    #[test]
    fn all_seven_outputs_come_back() {
        let mut regs = RegisterBundle::default();
        unsafe { call_func_x(stub_load_constants as usize, &mut regs) };
        assert_eq!(
            regs,
            RegisterBundle {
                eax: 0x11110001,
                ebx: 0x22220002,
                ecx: 0x33330003,
                edx: 0x44440004,
                esi: 0x55550005,
                edi: 0x66660006,
                ebp: 0x77770007,
            }
        );
    }

    #[test]
    fn untouched_registers_round_trip_through_readback() {
        let mut regs = RegisterBundle {
            eax: 1,
            ebx: 2,
            ecx: 3,
            edx: 4,
            esi: 5,
            edi: 6,
            ebp: 7,
        };
        let input = regs;
        unsafe { call_func_x(stub_ret as usize, &mut regs) };
        assert_eq!(regs, input);
    }

    #[test]
    fn caller_locals_survive_the_call() {
        for target in [stub_ret as usize, stub_balanced_push_pop as usize] {
            let locals = std::hint::black_box([
                0x1111_AAAAu32,
                0x2222_BBBB,
                0x3333_CCCC,
                0x4444_DDDD,
            ]);
            unsafe { call_proc(target) };
            assert_eq!(
                std::hint::black_box(locals),
                [0x1111_AAAA, 0x2222_BBBB, 0x3333_CCCC, 0x4444_DDDD]
            );
        }
    }

    #[test]
    fn add_scenario_reports_through_eax_and_zero_flag() {
        let mut regs = RegisterBundle {
            eax: 5,
            ebx: (-5i32) as u32,
            ..Default::default()
        };
        let flags = unsafe { call_func_x(stub_add_eax_ebx as usize, &mut regs) };
        assert_eq!(regs.eax, 0);
        assert!(flags.zero());

        let mut regs = RegisterBundle {
            eax: 5,
            ebx: 10,
            ..Default::default()
        };
        let flags = unsafe { call_func_x(stub_add_eax_ebx as usize, &mut regs) };
        assert_eq!(regs.eax, 15);
        assert!(!flags.zero());
    }

    #[test]
    fn diagnostics_slot_is_clear_outside_a_call() {
        assert_eq!(diagnostics::current_foreign_call(), None);
        unsafe { call_proc(stub_ret as usize) };
        assert_eq!(diagnostics::current_foreign_call(), None);
    }
}
