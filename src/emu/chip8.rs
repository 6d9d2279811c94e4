use std::time::{SystemTime, UNIX_EPOCH};

use rand::{SeedableRng, rngs::StdRng};

use super::{
    Chip8Error, DISPLAY_X, DISPLAY_Y, Display, FONT, FONT_END_ADDRESS, FONT_START_ADDRESS, Opcode,
    StepResult,
};
use crate::u4;

// Standard CHIP-8 memory layout
pub const ROM_START_ADDRESS: usize = 0x200;
pub const MEMORY_SIZE: usize = 4096;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDRESS;
pub const STACK_DEPTH: usize = 16;

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: Display,
    /// Set whenever `display` changes, cleared by whoever presents it
    pub(crate) redraw: bool,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Call stack for subroutine returns
    pub(crate) stack: Vec<u16>,

    /// Delay timer: decrements at 60Hz until it reaches 0
    pub(crate) delay_timer: u8,
    /// Sound timer: decrements at 60Hz, beeps while non-zero
    pub(crate) sound_timer: u8,

    /// Keypad state: 16 keys mapped as booleans (true = pressed)
    pub(crate) keypad: [bool; 16],

    /// Source for the CXNN instruction
    pub(crate) rng: StdRng,
}

impl Chip8 {
    /// Creates an initialized machine whose random generator is seeded from the clock.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();

        Self::with_seed(seed)
    }

    /// Creates an initialized machine with a fixed random seed, for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        let mut chip8 = Chip8 {
            memory: [0; MEMORY_SIZE],
            display: [false; DISPLAY_X * DISPLAY_Y],
            redraw: true,
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: Vec::with_capacity(STACK_DEPTH),
            delay_timer: 0,
            sound_timer: 0,
            keypad: [false; 16],
            rng: StdRng::seed_from_u64(seed),
        };
        chip8.reset();
        chip8
    }

    /// Puts the machine back into its power-on state and installs the font set.
    ///
    /// The random generator keeps its current state.
    pub fn reset(&mut self) {
        self.memory = [0; MEMORY_SIZE];
        self.memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);

        self.display = [false; DISPLAY_X * DISPLAY_Y];
        self.redraw = true;
        self.pc = ROM_START_ADDRESS as u16;
        self.i = 0;
        self.v = [0; 16];
        self.stack.clear();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.keypad = [false; 16];

        log::debug!("CHIP-8 reset, pc = {:#05X}", self.pc);
    }

    /// Copies a program image into memory at the program start address.
    ///
    /// Images that do not fit are rejected and memory is left untouched.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let rom_end = ROM_START_ADDRESS + rom.len();
        self.memory
            .get_mut(ROM_START_ADDRESS..rom_end)
            .ok_or(Chip8Error::ImageTooLarge {
                size: rom.len(),
                max_size: MAX_ROM_SIZE,
            })?
            .copy_from_slice(rom);

        self.pc = ROM_START_ADDRESS as u16;

        log::debug!("Loaded {} byte program image", rom.len());
        Ok(())
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    ///
    /// On error the program counter still points at the faulting instruction.
    pub fn step(&mut self) -> Result<StepResult, Chip8Error> {
        let pc = self.pc;
        let opcode = self.fetch()?;
        let decoded_opcode = Opcode::decode(opcode);
        log::trace!("{:#05X}: {:04X} {:?}", pc, opcode, decoded_opcode);

        self.execute(decoded_opcode).inspect_err(|_| self.pc = pc)
    }

    /// Updates the delay and sound timers. Should be called at 60Hz.
    ///
    /// Returns true when the sound timer ran out during this tick.
    pub fn tick_timers(&mut self) -> bool {
        self.delay_timer = self.delay_timer.saturating_sub(1);

        let sound_expired = self.sound_timer == 1;
        self.sound_timer = self.sound_timer.saturating_sub(1);
        sound_expired
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer > 0
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad[key] = pressed;
    }

    pub fn keypad(&self) -> &[bool; 16] {
        &self.keypad
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.display[x + y * DISPLAY_X]
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    /// True when the display changed since the last [`clear_redraw`](Self::clear_redraw).
    pub fn needs_redraw(&self) -> bool {
        self.redraw
    }

    pub fn clear_redraw(&mut self) {
        self.redraw = false;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn v(&self) -> &[u8; 16] {
        &self.v
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    /// Fetches the next 16-bit opcode from memory.
    fn fetch(&mut self) -> Result<u16, Chip8Error> {
        let high = *self.mem_get(self.pc)?;
        let low = *self.mem_get(self.pc.wrapping_add(1))?;

        Ok(u16::from_be_bytes([high, low]))
    }

    /// Helper to get a mutable reference to a memory location with bounds checking.
    pub(crate) fn mem_get(&mut self, addr: u16) -> Result<&mut u8, Chip8Error> {
        self.memory
            .get_mut(addr as usize)
            .ok_or(Chip8Error::MemoryOutOfBounds { address: addr })
    }

    /// Bounds-checked mutable view of `len` bytes starting at `addr`.
    pub(crate) fn mem_range(&mut self, addr: u16, len: usize) -> Result<&mut [u8], Chip8Error> {
        let start = addr as usize;
        self.memory
            .get_mut(start..start + len)
            .ok_or_else(|| Chip8Error::MemoryOutOfBounds {
                address: MEMORY_SIZE.max(start) as u16,
            })
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_machine_is_in_power_on_state() {
        let chip8 = Chip8::with_seed(1);

        assert_eq!(&chip8.memory[..80], &FONT);
        assert!(chip8.memory[80..].iter().all(|&b| b == 0));
        assert_eq!(chip8.pc, 0x200);
        assert_eq!(chip8.i, 0);
        assert_eq!(chip8.v, [0; 16]);
        assert!(chip8.stack.is_empty());
        assert_eq!(chip8.delay_timer, 0);
        assert_eq!(chip8.sound_timer, 0);
        assert!(chip8.display.iter().all(|&p| !p));
        assert!(chip8.keypad.iter().all(|&k| !k));
        assert!(chip8.needs_redraw());
    }

    #[test]
    fn reset_clears_a_used_machine() {
        let mut chip8 = Chip8::with_seed(1);
        chip8.load(&[0x12, 0x34, 0x56]).unwrap();
        chip8.v[3] = 9;
        chip8.i = 0x300;
        chip8.stack.push(0x204);
        chip8.delay_timer = 4;
        chip8.sound_timer = 5;
        chip8.display[10] = true;
        chip8.keypad[2] = true;
        chip8.pc = 0x250;
        chip8.clear_redraw();

        chip8.reset();

        assert_eq!(&chip8.memory[..80], &FONT);
        assert!(chip8.memory[80..].iter().all(|&b| b == 0));
        assert_eq!(chip8.pc, 0x200);
        assert_eq!(chip8.i, 0);
        assert_eq!(chip8.v, [0; 16]);
        assert!(chip8.stack.is_empty());
        assert_eq!((chip8.delay_timer, chip8.sound_timer), (0, 0));
        assert!(chip8.display.iter().all(|&p| !p));
        assert!(!chip8.keypad[2]);
        assert!(chip8.needs_redraw());
    }

    #[test]
    fn load_accepts_image_filling_all_program_memory() {
        let mut chip8 = Chip8::with_seed(1);
        let rom = vec![0xAB; MAX_ROM_SIZE];

        chip8.load(&rom).unwrap();

        assert_eq!(&chip8.memory[ROM_START_ADDRESS..], rom.as_slice());
        assert_eq!(&chip8.memory[..80], &FONT);
    }

    #[test]
    fn load_rejects_image_one_byte_too_large() {
        let mut chip8 = Chip8::with_seed(1);
        let rom = vec![0xAB; MAX_ROM_SIZE + 1];

        let err = chip8.load(&rom).unwrap_err();

        assert!(matches!(
            err,
            Chip8Error::ImageTooLarge {
                size,
                max_size: MAX_ROM_SIZE
            } if size == MAX_ROM_SIZE + 1
        ));
        assert!(chip8.memory[ROM_START_ADDRESS..].iter().all(|&b| b == 0));
    }

    #[test]
    fn fetch_reads_big_endian_words() {
        let mut chip8 = Chip8::with_seed(1);
        chip8.load(&[0xA2, 0xF0]).unwrap();

        assert_eq!(chip8.fetch().unwrap(), 0xA2F0);
    }

    #[test]
    fn fetch_past_end_of_memory_fails() {
        let mut chip8 = Chip8::with_seed(1);
        chip8.pc = 0x0FFF;

        assert!(matches!(
            chip8.step(),
            Err(Chip8Error::MemoryOutOfBounds { address: 0x1000 })
        ));
    }

    #[test]
    fn tick_timers_decrements_and_saturates() {
        let mut chip8 = Chip8::with_seed(1);
        chip8.delay_timer = 2;

        chip8.tick_timers();
        assert_eq!(chip8.delay_timer, 1);
        chip8.tick_timers();
        chip8.tick_timers();
        assert_eq!(chip8.delay_timer, 0);
    }

    #[test]
    fn tick_timers_signals_sound_expiry_once() {
        let mut chip8 = Chip8::with_seed(1);
        chip8.sound_timer = 1;
        assert!(chip8.should_beep());

        assert!(chip8.tick_timers());
        assert_eq!(chip8.sound_timer, 0);
        assert!(!chip8.should_beep());

        assert!(!chip8.tick_timers());
        assert_eq!(chip8.sound_timer, 0);
    }

    #[test]
    fn tick_timers_is_silent_while_sound_keeps_running() {
        let mut chip8 = Chip8::with_seed(1);
        chip8.sound_timer = 3;

        assert!(!chip8.tick_timers());
        assert!(!chip8.tick_timers());
        assert!(chip8.tick_timers());
    }

    #[test]
    fn pixel_reads_row_major_display() {
        let mut chip8 = Chip8::with_seed(1);
        chip8.display[5 + 2 * DISPLAY_X] = true;

        assert!(chip8.pixel(5, 2));
        assert!(!chip8.pixel(2, 5));
    }
}
