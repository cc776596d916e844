//! Catalogue of known locations in the rct2.exe image.
//!
//! This is configuration, not logic: the set of valid addresses, their
//! widths and their signedness are fixed by the original binary and are only
//! documented here, never inferred. Entries are added as replacement work
//! reaches them, so the catalogue is nowhere near the full image; widths
//! follow what the original code actually does at each location, including
//! the places where one address is deliberately read at several widths.
//!
//! Routine addresses near the bottom are entry points still living in the
//! image, called through the [`trampoline`](crate::trampoline); the register
//! contract noted on each is the callee's, reverse engineered from its
//! original call sites.

use crate::{array_by_address, global_by_address};
#[cfg(target_arch = "x86")]
use crate::legacy_fn;

/// Fixed-point currency, ten units per in-game dime.
pub type Money32 = i32;
/// Index into the string table.
pub type StringId = u16;

global_by_address! {
    /// Ticks elapsed since the scenario started.
    pub CURRENT_TICKS: u32 = 0x013628F4;
    /// Park cash, stored XORed with the anti-tamper constant.
    pub CURRENT_MONEY_ENCRYPTED: Money32 = 0x013573DC;
    /// Format arguments for the park name string.
    pub PARK_NAME_ARGS: u32 = 0x013573D8;
    /// Bit field of shop item types priced identically across the park.
    pub SAME_PRICE_THROUGHOUT: u32 = 0x01358838;

    /// Input state bits: bit 3 tool active, bit 5 cursor over a window.
    pub INPUT_FLAGS: u32 = 0x009DE518;
    /// Map position carried by the game command being executed.
    pub COMMAND_MAP_X: u16 = 0x009DEA5E;
    pub COMMAND_MAP_Y: u16 = 0x009DEA60;
    pub COMMAND_MAP_Z: u16 = 0x009DEA62;

    /// Ride currently being constructed.
    pub CONSTRUCTION_RIDE_INDEX: u8 = 0x00F440D4;
    /// Track element placement position.
    pub CONSTRUCTION_X: i16 = 0x00F44142;
    pub CONSTRUCTION_Y: i16 = 0x00F44144;
    pub CONSTRUCTION_Z: i16 = 0x00F44146;

    /// First two bytes of the formatter argument area. The area is aliased
    /// at whatever width each call site needs; see [`FORMAT_ARGS`].
    pub FORMAT_ARGS_0: StringId = 0x013CE952;
    pub FORMAT_ARGS_2: u32 = 0x013CE954;
}

array_by_address! {
    /// String formatter argument area, written piecewise before any text
    /// operation and consumed by the formatter in the image.
    pub FORMAT_ARGS: [u8; 16] = 0x013CE952;
    /// The ride table: 255 records of 0x260 bytes, opaque until the ride
    /// struct is ported.
    pub RIDE_LIST: [[u8; 0x260]; 255] = 0x013628F8;
    /// The sprite table: 10000 records of 0x100 bytes covering peeps,
    /// vehicles and scenery animations.
    pub SPRITE_LIST: [[u8; 0x100]; 10000] = 0x010E63BC;
}

// Register-convention routines still running in the image. Contracts:
// unlisted registers are ignored on entry and unspecified on return.

/// Creates a window. ebx = (height << 16) | width, ecx = (flags << 8) |
/// window class, edx = event handler table; the new window comes back in
/// esi.
pub const PROC_WINDOW_CREATE: usize = 0x006EA9B1;

/// Converts a screen position to a map position. eax = x and ebx = y, in
/// and out; eax holds 0x8000 on return when the point is off the map.
pub const PROC_SCREEN_POS_TO_MAP_POS: usize = 0x00688972;

/// Computes a vehicle's G forces. esi = vehicle record; vertical G in ax,
/// lateral G in dx, both signed.
pub const PROC_VEHICLE_GET_G_FORCES: usize = 0x006D73D0;

/// Path surface height under a peep. eax = x, ecx = y, esi = peep record;
/// height in dx.
pub const PROC_PEEP_PATH_HEIGHT: usize = 0x00694921;

#[cfg(target_arch = "x86")]
legacy_fn! {
    /// Moves the DirectDraw game window into the top left corner. One of
    /// the few image routines with a plain no-argument convention, so it is
    /// callable directly instead of through the trampoline.
    pub DDWINDOW_MOVE_TO_TOP_CORNER: extern "cdecl" fn() = 0x004067E3;
}
