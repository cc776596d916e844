//! The in-process payload: injected into a running rct2.exe, it unprotects
//! the image, reads a little park state through the typed overlay to prove
//! the mapping is live, and installs the first replacement hook.
//!
//! Everything below is 32-bit Windows only, because that is the only place
//! the original image can exist; on any other target this crate builds as
//! an empty cdylib so the workspace stays checkable.

#[cfg(all(windows, target_arch = "x86"))]
mod dllmain;
#[cfg(all(windows, target_arch = "x86"))]
mod errors;
#[cfg(all(windows, target_arch = "x86"))]
mod logging;
#[cfg(all(windows, target_arch = "x86"))]
mod rct2;

#[cfg(all(windows, target_arch = "x86"))]
fn install() -> Result<(), eyre::Error> {
    use rct2_interop::addresses::{CURRENT_TICKS, DDWINDOW_MOVE_TO_TOP_CORNER_ADDRESS};
    use rct2_interop::hooks;

    use crate::logging::logln;

    rct2_interop::memory::unprotect_image()?;

    let ticks = unsafe { CURRENT_TICKS.read() };
    let cash = unsafe { rct2::current_money() };
    logln!("attached at tick {ticks}, park cash {cash}");

    // One register-convention call into the image, so a broken trampoline
    // shows up in the log at attach instead of at first real use.
    match rct2::screen_pos_to_map_pos(0, 0) {
        Some((x, y)) => logln!("screen origin is over map tile ({x}, {y})"),
        None => logln!("screen origin is off the map"),
    }

    // First fully replaced routine: the DirectDraw window repositioning
    // helper, chosen because its plain no-argument convention needs no
    // register shim.
    let len = hooks::install_call_hook(
        DDWINDOW_MOVE_TO_TOP_CORNER_ADDRESS as u32,
        rct2::move_game_window_to_top_corner as usize,
        8,
    )?;
    logln!("replaced window repositioning routine ({len} byte patch)");

    Ok(())
}
