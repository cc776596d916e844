use {
    crate::{errors::try_or_die, logging::logln},
    windows::Win32::{
        Foundation::HINSTANCE,
        System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH},
    },
};

#[no_mangle]
#[allow(non_snake_case)]
extern "system" fn DllMain(_module: HINSTANCE, event: u32, _: *mut ()) -> bool {
    match event {
        DLL_PROCESS_ATTACH => {
            logln!("Handling DllMain attach event ({event}).");
            try_or_die(crate::install);
        },
        DLL_PROCESS_DETACH => {
            // Unloading would leave patched image code calling into a freed
            // module, and returning false here does not block FreeLibrary.
            panic!("detaching not supported. panicking to avoid memory unsafety.")
        },
        _ => {},
    }

    true
}
