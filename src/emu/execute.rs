use rand::Rng;

use super::{
    Chip8, Chip8Error, DISPLAY_X, DISPLAY_Y, FONT_GLYPH_SIZE, FONT_START_ADDRESS, Opcode,
    OpcodeAlu, STACK_DEPTH, StepResult,
};
use crate::u4;

/// Highest address reachable through the 12-bit index register.
const INDEX_LIMIT: u32 = 0x0FFF;

impl Chip8 {
    pub(crate) fn execute(&mut self, opcode: Opcode) -> Result<StepResult, Chip8Error> {
        self.pc = self.pc.wrapping_add(2);

        match opcode {
            Opcode::ClearDisplay => {
                self.display.fill(false);
                self.redraw = true;
                return Ok(StepResult::Redraw);
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn;
            }
            Opcode::JumpWithOffset { nnn } => {
                self.pc = nnn.wrapping_add(self.v[0].into());
            }
            Opcode::Call { nnn } => {
                if self.stack.len() >= STACK_DEPTH {
                    return Err(Chip8Error::StackOverflow { depth: STACK_DEPTH });
                }
                self.stack.push(self.pc);
                self.pc = nnn;
            }
            Opcode::Return => {
                self.pc = self.stack.pop().ok_or(Chip8Error::StackUnderflow)?;
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v[x] == nn);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v[x] != nn);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v[x] == self.v[y]);
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v[x] != self.v[y]);
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::Alu { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                let vx = self.v[x];
                let overflow = u32::from(self.i) + u32::from(vx) > INDEX_LIMIT;
                // Saturate so an out-of-range I can never wrap back into memory.
                self.i = self.i.saturating_add(vx.into());
                self.v[0xF] = overflow as u8;
            }
            Opcode::Draw { x, y, n } => {
                return self.execute_draw(x, y, n);
            }
            Opcode::SkipIfPressed { x } => {
                self.skip_if(self.keypad[u4::from_low_bits(self.v[x])]);
            }
            Opcode::SkipIfNotPressed { x } => {
                self.skip_if(!self.keypad[u4::from_low_bits(self.v[x])]);
            }
            Opcode::WaitForKey { x } => {
                return Ok(self.execute_wait_for_key(x));
            }
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
            }
            Opcode::FontChar { x } => {
                self.i = FONT_START_ADDRESS as u16 + u16::from(self.v[x]) * FONT_GLYPH_SIZE as u16;
            }
            Opcode::Bcd { x } => {
                let value = self.v[x];
                let digits = [value / 100, (value / 10) % 10, value % 10];
                self.mem_range(self.i, digits.len())?
                    .copy_from_slice(&digits);
            }
            Opcode::StoreRegs { x } => {
                let count = usize::from(x) + 1;
                let regs = self.v;
                self.mem_range(self.i, count)?
                    .copy_from_slice(&regs[..count]);
                self.i = self.i.wrapping_add(count as u16);
            }
            Opcode::LoadRegs { x } => {
                let count = usize::from(x) + 1;
                let mut regs = [0; 16];
                regs[..count].copy_from_slice(self.mem_range(self.i, count)?);
                self.v[..count].copy_from_slice(&regs[..count]);
                self.i = self.i.wrapping_add(count as u16);
            }
            Opcode::Unknown(opcode) => {
                let address = self.pc.wrapping_sub(2);
                log::warn!("Skipping unknown opcode {:04X} at {:#05X}", opcode, address);
                return Ok(StepResult::UnknownOpcode { opcode, address });
            }
        };

        Ok(StepResult::Continue)
    }

    /// Skips the next instruction. The program counter already points past the current one.
    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    // Shifts take their operand from VX. When X is F the flag overwrites the result.
    fn execute_alu(&mut self, x: u4, y: u4, op: OpcodeAlu) {
        match op {
            OpcodeAlu::Set => self.v[x] = self.v[y],
            OpcodeAlu::Or => self.v[x] |= self.v[y],
            OpcodeAlu::And => self.v[x] &= self.v[y],
            OpcodeAlu::Xor => self.v[x] ^= self.v[y],
            OpcodeAlu::Add => {
                let (res, overflow) = self.v[x].overflowing_add(self.v[y]);
                self.v[x] = res;
                self.v[0xF] = if overflow { 1 } else { 0 };
            }
            OpcodeAlu::Sub => {
                let (res, borrow) = self.v[x].overflowing_sub(self.v[y]);
                self.v[x] = res;
                self.v[0xF] = if borrow { 0 } else { 1 }; // Notice that borrow is inverted
            }
            OpcodeAlu::SubReverse => {
                let (res, borrow) = self.v[y].overflowing_sub(self.v[x]);
                self.v[x] = res;
                self.v[0xF] = if borrow { 0 } else { 1 };
            }
            OpcodeAlu::ShiftRight => {
                let lsb = self.v[x] & 1;
                self.v[x] >>= 1;
                self.v[0xF] = lsb;
            }
            OpcodeAlu::ShiftLeft => {
                let msb = (self.v[x] >> 7) & 1;
                self.v[x] <<= 1;
                self.v[0xF] = msb;
            }
        }
    }

    /// XORs an N-row sprite onto the display.
    ///
    /// Sprites wrap around both screen edges: a pixel pushed past the right
    /// edge reappears on the left, one pushed past the bottom reappears at the top.
    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Result<StepResult, Chip8Error> {
        let x_pos = self.v[x] as usize;
        let y_pos = self.v[y] as usize;

        // Read every row up front so a bad I leaves the display untouched.
        let rows = usize::from(n);
        let mut sprite = [0u8; 15];
        sprite[..rows].copy_from_slice(self.mem_range(self.i, rows)?);

        let mut any_erased = false;
        for (row, &sprite_byte) in sprite[..rows].iter().enumerate() {
            let py = (y_pos + row) % DISPLAY_Y;

            for col in 0..8 {
                // If current sprite bit is non-zero
                if (sprite_byte & (0x80 >> col)) != 0 {
                    let px = (x_pos + col) % DISPLAY_X;
                    let pixel = &mut self.display[px + py * DISPLAY_X];

                    // Flip the pixel
                    *pixel ^= true;

                    if !*pixel {
                        any_erased = true;
                    }
                }
            }
        }

        self.v[0xF] = if any_erased { 1 } else { 0 };
        self.redraw = true;
        Ok(StepResult::Redraw)
    }

    fn execute_wait_for_key(&mut self, x: u4) -> StepResult {
        if let Some(key) = self.keypad.iter().position(|&pressed| pressed) {
            self.v[x] = key as u8;
            return StepResult::Continue;
        }

        // Repeat this instruction until a key is pressed
        self.pc = self.pc.wrapping_sub(2);
        StepResult::WaitingForKey
    }
}
