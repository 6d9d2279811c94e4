use std::path::PathBuf;

/// Outcome of a single [`step`](super::Chip8::step).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Continue executing instructions in the current frame.
    Continue,
    /// The framebuffer changed, a driver may want to present it before the next step.
    Redraw,
    /// FX0A saw no pressed key; the same instruction runs again on the next step.
    WaitingForKey,
    /// The word at `address` is not a CHIP-8 instruction and was skipped.
    UnknownOpcode { opcode: u16, address: u16 },
}

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("Program image is too large ({size} bytes), max size is {max_size} bytes")]
    ImageTooLarge { size: usize, max_size: usize },

    #[error("Failed to read program image {}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: u16 },

    #[error("Stack underflow: attempted to return from a subroutine with empty call stack")]
    StackUnderflow,

    #[error("Stack overflow: subroutine calls nested deeper than {depth} levels")]
    StackOverflow { depth: usize },
}

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;

/// Framebuffer: one flag per pixel, row-major, indexed as `x + y * DISPLAY_X`.
pub type Display = [bool; DISPLAY_X * DISPLAY_Y];
