use crate::u4;

/// CHIP-8 instruction opcodes.
///
/// The fields (x, y, n, nn, nnn) correspond to the operands encoded in the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// 1nnn - Jump to location nnn.
    Jump { nnn: u16 },
    /// Bnnn - Jump to location nnn + V0.
    JumpWithOffset { nnn: u16 },

    /// 2nnn - Call subroutine at nnn.
    Call { nnn: u16 },
    /// 00EE - Return from a subroutine.
    Return,

    /// 3xnn - Skip next instruction if Vx == nn.
    SkipRegEqualImm { x: u4, nn: u8 },
    /// 4xnn - Skip next instruction if Vx != nn.
    SkipRegNotEqualImm { x: u4, nn: u8 },
    /// 5xy0 - Skip next instruction if Vx == Vy.
    SkipRegEqualReg { x: u4, y: u4 },
    /// 9xy0 - Skip next instruction if Vx != Vy.
    SkipRegNotEqualReg { x: u4, y: u4 },

    /// 6xnn - Set Vx = nn.
    SetRegImm { x: u4, nn: u8 },
    /// 7xnn - Set Vx = Vx + nn, VF untouched.
    AddRegImm { x: u4, nn: u8 },
    /// Annn - Set I = nnn.
    SetIndexImm { nnn: u16 },
    /// Fx1E - Set I = I + Vx, VF = 1 if the sum passes 0xFFF.
    AddIndexReg { x: u4 },

    /// 8xyN - ALU operations
    Alu { x: u4, y: u4, op: OpcodeAlu },
    /// Cxnn - Set Vx = random byte AND nn.
    Random { x: u4, nn: u8 },

    /// 00E0 - Clear the display.
    ClearDisplay,
    /// Dxyn - XOR an n-row sprite from I onto the display at (Vx, Vy), VF = collision.
    Draw { x: u4, y: u4, n: u4 },

    /// Ex9E - Skip next instruction if key with the value of Vx is pressed.
    SkipIfPressed { x: u4 },
    /// ExA1 - Skip next instruction if key with the value of Vx is not pressed.
    SkipIfNotPressed { x: u4 },
    /// Fx0A - Wait for a key press, store the value of the key in Vx.
    WaitForKey { x: u4 },

    /// Fx07 - Set Vx = delay timer value.
    ReadDelayTimer { x: u4 },
    /// Fx15 - Set delay timer = Vx.
    SetDelayTimer { x: u4 },
    /// Fx18 - Set sound timer = Vx.
    SetSoundTimer { x: u4 },

    /// Fx29 - Set I = location of sprite for digit Vx.
    FontChar { x: u4 },
    /// Fx33 - Store BCD representation of Vx in memory locations I, I+1, and I+2.
    Bcd { x: u4 },

    /// Fx55 - Store registers V0 through Vx in memory starting at location I.
    StoreRegs { x: u4 },
    /// Fx65 - Read registers V0 through Vx from memory starting at location I.
    LoadRegs { x: u4 },

    /// Any word outside the instruction set, including 8xyN with an invalid N.
    Unknown(u16),
}

/// ALU operations for the 8xyN instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeAlu {
    /// 8xy0 - Vx = Vy
    Set,
    /// 8xy1 - Vx = Vx OR Vy
    Or,
    /// 8xy2 - Vx = Vx AND Vy
    And,
    /// 8xy3 - Vx = Vx XOR Vy
    Xor,
    /// 8xy4 - Vx = Vx + Vy, VF = carry
    Add,
    /// 8xy5 - Vx = Vx - Vy, VF = NOT borrow
    Sub,
    /// 8xy6 - Vx = Vx SHR 1, VF = shifted out bit
    ShiftRight,
    /// 8xy7 - Vx = Vy - Vx, VF = NOT borrow
    SubReverse,
    /// 8xyE - Vx = Vx SHL 1, VF = shifted out bit
    ShiftLeft,
}

impl Opcode {
    /// Decode a 16-bit raw opcode into an Opcode enum variant.
    ///
    /// Never fails: words outside the instruction set become [`Opcode::Unknown`].
    pub fn decode(opcode: u16) -> Self {
        let [high, low] = opcode.to_be_bytes();
        let nibble = (high >> 4, high & 0x0F, low >> 4, low & 0x0F);

        let x = u4::from_low_bits(nibble.1);
        let y = u4::from_low_bits(nibble.2);
        let n = u4::from_low_bits(nibble.3);
        let nn = low;
        let nnn = opcode & 0x0FFF;

        match nibble {
            (0x0, 0x0, 0xE, 0x0) => Opcode::ClearDisplay,
            (0x0, 0x0, 0xE, 0xE) => Opcode::Return,
            (0x1, _, _, _) => Opcode::Jump { nnn },
            (0x2, _, _, _) => Opcode::Call { nnn },
            (0x3, _, _, _) => Opcode::SkipRegEqualImm { x, nn },
            (0x4, _, _, _) => Opcode::SkipRegNotEqualImm { x, nn },
            (0x5, _, _, 0x0) => Opcode::SkipRegEqualReg { x, y },
            (0x6, _, _, _) => Opcode::SetRegImm { x, nn },
            (0x7, _, _, _) => Opcode::AddRegImm { x, nn },
            (0x8, _, _, _) => Opcode::Alu {
                x,
                y,
                op: match nibble.3 {
                    0x0 => OpcodeAlu::Set,
                    0x1 => OpcodeAlu::Or,
                    0x2 => OpcodeAlu::And,
                    0x3 => OpcodeAlu::Xor,
                    0x4 => OpcodeAlu::Add,
                    0x5 => OpcodeAlu::Sub,
                    0x6 => OpcodeAlu::ShiftRight,
                    0x7 => OpcodeAlu::SubReverse,
                    0xE => OpcodeAlu::ShiftLeft,
                    _ => return Opcode::Unknown(opcode),
                },
            },
            (0x9, _, _, 0x0) => Opcode::SkipRegNotEqualReg { x, y },
            (0xA, _, _, _) => Opcode::SetIndexImm { nnn },
            (0xB, _, _, _) => Opcode::JumpWithOffset { nnn },
            (0xC, _, _, _) => Opcode::Random { x, nn },
            (0xD, _, _, _) => Opcode::Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => Opcode::SkipIfPressed { x },
            (0xE, _, 0xA, 0x1) => Opcode::SkipIfNotPressed { x },
            (0xF, _, 0x0, 0x7) => Opcode::ReadDelayTimer { x },
            (0xF, _, 0x0, 0xA) => Opcode::WaitForKey { x },
            (0xF, _, 0x1, 0x5) => Opcode::SetDelayTimer { x },
            (0xF, _, 0x1, 0x8) => Opcode::SetSoundTimer { x },
            (0xF, _, 0x1, 0xE) => Opcode::AddIndexReg { x },
            (0xF, _, 0x2, 0x9) => Opcode::FontChar { x },
            (0xF, _, 0x3, 0x3) => Opcode::Bcd { x },
            (0xF, _, 0x5, 0x5) => Opcode::StoreRegs { x },
            (0xF, _, 0x6, 0x5) => Opcode::LoadRegs { x },

            _ => Opcode::Unknown(opcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_operand_fields() {
        assert_eq!(
            Opcode::decode(0xD125),
            Opcode::Draw {
                x: u4::new(1),
                y: u4::new(2),
                n: u4::new(5)
            }
        );
        assert_eq!(
            Opcode::decode(0x6A3C),
            Opcode::SetRegImm {
                x: u4::new(0xA),
                nn: 0x3C
            }
        );
        assert_eq!(Opcode::decode(0x2ABC), Opcode::Call { nnn: 0xABC });
        assert_eq!(Opcode::decode(0xB300), Opcode::JumpWithOffset { nnn: 0x300 });
    }

    #[test]
    fn decodes_alu_family_by_low_nibble() {
        let ops = [
            (0x8120, OpcodeAlu::Set),
            (0x8121, OpcodeAlu::Or),
            (0x8122, OpcodeAlu::And),
            (0x8123, OpcodeAlu::Xor),
            (0x8124, OpcodeAlu::Add),
            (0x8125, OpcodeAlu::Sub),
            (0x8126, OpcodeAlu::ShiftRight),
            (0x8127, OpcodeAlu::SubReverse),
            (0x812E, OpcodeAlu::ShiftLeft),
        ];

        for (word, op) in ops {
            assert_eq!(
                Opcode::decode(word),
                Opcode::Alu {
                    x: u4::new(1),
                    y: u4::new(2),
                    op
                }
            );
        }
    }

    #[test]
    fn decodes_timer_and_memory_family() {
        let x = u4::new(7);
        assert_eq!(Opcode::decode(0xF707), Opcode::ReadDelayTimer { x });
        assert_eq!(Opcode::decode(0xF70A), Opcode::WaitForKey { x });
        assert_eq!(Opcode::decode(0xF715), Opcode::SetDelayTimer { x });
        assert_eq!(Opcode::decode(0xF718), Opcode::SetSoundTimer { x });
        assert_eq!(Opcode::decode(0xF71E), Opcode::AddIndexReg { x });
        assert_eq!(Opcode::decode(0xF729), Opcode::FontChar { x });
        assert_eq!(Opcode::decode(0xF733), Opcode::Bcd { x });
        assert_eq!(Opcode::decode(0xF755), Opcode::StoreRegs { x });
        assert_eq!(Opcode::decode(0xF765), Opcode::LoadRegs { x });
    }

    #[test]
    fn unrecognized_words_decode_to_unknown() {
        for word in [0x0000, 0x0123, 0x5121, 0x8128, 0x812F, 0x9121, 0xE19F, 0xF1FF] {
            assert_eq!(Opcode::decode(word), Opcode::Unknown(word), "{word:#06X}");
        }
    }
}
