use chip8_core::{
    emu::{Chip8, Chip8Error, DISPLAY_X, StepResult},
    u4,
};

fn assemble(program: &[u16]) -> Vec<u8> {
    program.iter().flat_map(|op| op.to_be_bytes()).collect()
}

/// Steps until the program counter parks on `halt` (a jump to itself).
fn run_until(chip8: &mut Chip8, halt: u16) {
    for _ in 0..1000 {
        if chip8.pc() == halt {
            return;
        }
        chip8.step().unwrap();
    }
    panic!("program did not reach {halt:#05X}");
}

#[test]
fn prints_a_number_with_font_glyphs() {
    let program = assemble(&[
        0x607B, // LD V0, 123
        0xA300, // LD I, 0x300
        0xF033, // LD B, V0
        0xF265, // LD V2, [I]
        0x6300, // LD V3, 0
        0x6400, // LD V4, 0
        0xF029, // LD F, V0
        0xD345, // DRW V3, V4, 5
        0x7305, // ADD V3, 5
        0xF129, // LD F, V1
        0xD345, // DRW V3, V4, 5
        0x7305, // ADD V3, 5
        0xF229, // LD F, V2
        0xD345, // DRW V3, V4, 5
        0x121C, // JP 0x21C
    ]);

    let mut chip8 = Chip8::with_seed(0);
    chip8.load(&program).unwrap();
    chip8.clear_redraw();
    run_until(&mut chip8, 0x21C);

    assert_eq!(&chip8.v()[..3], &[1, 2, 3]);
    assert_eq!(chip8.v()[0xF], 0);
    assert!(chip8.needs_redraw());

    // "1"
    assert!(!chip8.pixel(0, 0));
    assert!(chip8.pixel(2, 0));
    assert!(chip8.pixel(1, 4) && chip8.pixel(3, 4));
    // "2" and "3" have a full top row
    assert!((5..9).all(|x| chip8.pixel(x, 0)));
    assert!((10..14).all(|x| chip8.pixel(x, 0)));
    assert!(!chip8.pixel(14, 0));
    // Nothing below the glyphs
    assert!(chip8.display()[5 * DISPLAY_X..].iter().all(|&p| !p));
}

#[test]
fn subroutine_counts_down_with_the_delay_timer() {
    let program = assemble(&[
        0x6005, // LD V0, 5
        0xF015, // LD DT, V0
        0x2208, // CALL 0x208
        0x1206, // JP 0x206
        0xF107, // 0x208: LD V1, DT
        0x3100, // SE V1, 0
        0x1208, // JP 0x208
        0x00EE, // RET
    ]);

    let mut chip8 = Chip8::with_seed(0);
    chip8.load(&program).unwrap();

    // Without timer ticks the subroutine spins forever.
    for _ in 0..100 {
        chip8.step().unwrap();
    }
    assert_eq!(chip8.stack(), &[0x206]);
    assert_eq!(chip8.delay_timer(), 5);

    for _ in 0..5 {
        chip8.tick_timers();
        for _ in 0..10 {
            chip8.step().unwrap();
        }
    }
    run_until(&mut chip8, 0x206);

    assert!(chip8.stack().is_empty());
    assert_eq!(chip8.v()[1], 0);
}

#[test]
fn waits_for_a_key_then_stores_it() {
    let program = assemble(&[
        0xF50A, // LD V5, K
        0x1202, // JP 0x202
    ]);

    let mut chip8 = Chip8::with_seed(0);
    chip8.load(&program).unwrap();

    for _ in 0..10 {
        assert_eq!(chip8.step().unwrap(), StepResult::WaitingForKey);
    }

    chip8.set_key(u4::new(0x9), true);
    chip8.set_key(u4::new(0xC), true);
    chip8.step().unwrap();

    assert_eq!(chip8.v()[5], 0x9);
    assert_eq!(chip8.pc(), 0x202);
}

#[test]
fn fatal_errors_are_reported_not_raised() {
    let mut chip8 = Chip8::with_seed(0);
    chip8.load(&assemble(&[0x00EE])).unwrap();

    let err = chip8.step().unwrap_err();

    assert!(matches!(err, Chip8Error::StackUnderflow));
    assert!(err.to_string().contains("Stack underflow"));
    // The faulting instruction is still the one at the program counter.
    assert_eq!(chip8.pc(), 0x200);
}

#[test]
fn reset_allows_loading_another_program() {
    let mut chip8 = Chip8::with_seed(0);
    chip8.load(&assemble(&[0x6AFF, 0x1202])).unwrap();
    chip8.step().unwrap();
    assert_eq!(chip8.v()[0xA], 0xFF);

    chip8.reset();
    chip8.load(&assemble(&[0x6B01])).unwrap();
    chip8.step().unwrap();

    assert_eq!(chip8.v()[0xA], 0);
    assert_eq!(chip8.v()[0xB], 1);
    assert_eq!(chip8.memory()[0x202], 0);
}
