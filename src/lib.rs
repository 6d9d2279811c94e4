//! CHIP-8 interpreter core.
//!
//! [`emu::Chip8`] owns the whole machine state. A driver loads an image with
//! [`emu::Chip8::load`], calls [`emu::Chip8::step`] as often as it likes and
//! [`emu::Chip8::tick_timers`] at 60 Hz, and presents
//! [`emu::Chip8::display`] whenever [`emu::Chip8::needs_redraw`] is set.

pub mod emu;
mod nibble;

pub use nibble::u4;
