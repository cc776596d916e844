use thiserror::Error;

/// Failures this layer can actually report.
///
/// The overlay and the trampoline have no error channel at all: misuse there
/// is undefined behavior, exactly as it was for the original macros. What is
/// left are the bookkeeping operations around them (scratch mapping, patch
/// assembly, page protection), which fail loudly and recoverably.
#[derive(Debug, Error)]
pub enum InteropError {
    #[error("scratch region {start:#010x}..{end:#010x} overlaps an existing mapping")]
    ScratchOverlap { start: u32, end: u32 },

    #[error("failed to assemble patch for {address:#010x}: {message}")]
    PatchAssembly { address: u32, message: String },

    #[error("patch at {address:#010x} is {len} bytes but only {budget} may be clobbered")]
    PatchTooLarge {
        address: u32,
        len: usize,
        budget: usize,
    },

    #[cfg(windows)]
    #[error("failed to change page protection at {address:#010x}")]
    PageProtection {
        address: u32,
        #[source]
        source: windows::core::Error,
    },
}

pub type Result<T> = std::result::Result<T, InteropError>;
