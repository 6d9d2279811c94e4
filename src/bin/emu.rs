use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::LevelFilter;
use ratatui::{
    DefaultTerminal, Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
};
use simple_logger::SimpleLogger;

use chip8_core::{
    emu::{CPU_HZ, Chip8, Chip8Runner, DISPLAY_X, DISPLAY_Y, rom},
    u4,
};

/// Mapping from keyboard keys to CHIP-8 hex keypad (0x0-0xF).
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::Char('x'), // 0x0
    KeyCode::Char('1'), // 0x1
    KeyCode::Char('2'), // 0x2
    KeyCode::Char('3'), // 0x3
    KeyCode::Char('q'), // 0x4
    KeyCode::Char('w'), // 0x5
    KeyCode::Char('e'), // 0x6
    KeyCode::Char('a'), // 0x7
    KeyCode::Char('s'), // 0x8
    KeyCode::Char('d'), // 0x9
    KeyCode::Char('z'), // 0xA
    KeyCode::Char('c'), // 0xB
    KeyCode::Char('4'), // 0xC
    KeyCode::Char('r'), // 0xD
    KeyCode::Char('f'), // 0xE
    KeyCode::Char('v'), // 0xF
];

// Key release events are not fired in terminals on Linux.
// To handle this, we implement a timeout after which we consider a key released.
const KEY_RELEASE_TIMEOUT: Duration = Duration::from_millis(50);

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(4);

struct App {
    runner: Chip8Runner,
    title: String,
    status: String,
    should_quit: bool,
    force_redraw: bool,
    last_tick: Instant,
    key_press_times: [Option<Instant>; 16],
}

impl App {
    fn new(image: &[u8], title: String, cpu_hz: f32) -> anyhow::Result<Self> {
        let mut chip8 = Chip8::new();
        chip8
            .load(image)
            .context("Failed to load program image into CHIP-8 memory")?;

        Ok(Self {
            runner: Chip8Runner::with_cpu_hz(chip8, cpu_hz),
            title,
            status: String::new(),
            should_quit: false,
            force_redraw: true,
            last_tick: Instant::now(),
            key_press_times: [None; 16],
        })
    }

    fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        while !self.should_quit {
            let dt = self.last_tick.elapsed().as_secs_f32();
            self.last_tick = Instant::now();

            let result = self.runner.update(dt).context("CHIP-8 execution error")?;

            if result.tone_ended {
                log::debug!("Sound timer expired");
            }
            if let Some(unknown) = result.last_unknown_opcode {
                self.status = format!(
                    "Skipped unknown opcode {:04X} at {:#05X}",
                    unknown.opcode, unknown.address
                );
                self.force_redraw = true;
            }

            if self.force_redraw || self.runner.chip8_ref().needs_redraw() {
                terminal.draw(|frame| self.draw(frame))?;
                self.runner.chip8_mut().clear_redraw();
                self.force_redraw = false;
            }

            self.check_key_timeout();

            if event::poll(INPUT_POLL_INTERVAL)? {
                match event::read()? {
                    Event::Key(key) => self.handle_key_event(key),
                    Event::Resize(..) => self.force_redraw = true,
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn check_key_timeout(&mut self) {
        let now = Instant::now();

        for (idx, press_time) in self.key_press_times.iter_mut().enumerate() {
            if let Some(time) = press_time
                && now.duration_since(*time) > KEY_RELEASE_TIMEOUT
            {
                *press_time = None;
                self.runner.set_key(u4::new(idx as u8), false);
                self.force_redraw = true;
            }
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        // Handle Ctrl+C globally
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if key.code == KeyCode::Esc && key.kind == KeyEventKind::Press {
            self.should_quit = true;
            return;
        }

        if let Some(idx) = KEY_MAP.iter().position(|&k| k == key.code) {
            let pressed = key.kind != KeyEventKind::Release;
            self.runner.set_key(u4::new(idx as u8), pressed);
            self.key_press_times[idx] = pressed.then(Instant::now);
            self.force_redraw = true;
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Check if we have enough space
        const MIN_WIDTH: u16 = DISPLAY_X as u16 + 2;
        const MIN_HEIGHT: u16 = DISPLAY_Y as u16 + 2 + 1 + 2;
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            let center = area.centered(Constraint::Length(45), Constraint::Length(3));

            Paragraph::new(format!(
                "Terminal is too small ({}x{} min)",
                MIN_WIDTH, MIN_HEIGHT
            ))
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .block(Block::bordered())
            .render(center, buf);

            return;
        }

        let [display, status] = Layout::vertical([
            Constraint::Length(DISPLAY_Y as u16 + 2),
            Constraint::Length(1 + 2),
        ])
        .areas(area);

        self.render_display(display, buf);
        self.render_status(status, buf);
    }
}

impl App {
    fn render_display(&self, area: Rect, buf: &mut Buffer) {
        let chip8 = self.runner.chip8_ref();
        let text: Vec<Line> = chip8
            .display()
            .chunks_exact(DISPLAY_X)
            .map(|row| {
                row.iter()
                    .map(|pixel| {
                        Span::styled(if *pixel { "█" } else { " " }, Style::default().green())
                    })
                    .collect()
            })
            .collect();

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(format!(" {} ", self.title)))
            .render(area, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let chip8 = self.runner.chip8_ref();
        let mut spans = vec![Span::raw(format!("PC: {:03X}  ", chip8.pc()))];

        if self.runner.should_beep() {
            spans.push(Span::styled("♪ BEEP ", Style::default().fg(Color::Yellow)));
        }

        let keys: String = chip8
            .keypad()
            .iter()
            .enumerate()
            .filter(|(_, pressed)| **pressed)
            .map(|(key, _)| format!("{:X}", key))
            .collect();
        if !keys.is_empty() {
            spans.push(Span::raw(format!("Keys: {}  ", keys)));
        }

        spans.push(Span::raw(self.status.as_str()));

        Paragraph::new(Line::from(spans))
            .block(Block::bordered().title(" Status "))
            .render(area, buf);
    }
}

/// Terminal CHIP-8 player.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// Escape is used to exit the emulator.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 program image (.ch8)
    rom_path: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = CPU_HZ)]
    cpu_hz: f32,

    /// Log level written to stderr (off, error, warn, info, debug, trace)
    #[arg(long, default_value_t = LevelFilter::Off)]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    SimpleLogger::new()
        .with_level(args.log_level)
        .init()
        .context("Failed to initialize logger")?;

    anyhow::ensure!(args.cpu_hz > 0.0, "--cpu-hz must be positive");

    let image = rom::read_image(&args.rom_path).context("Failed to read program image")?;
    let title = args
        .rom_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "CHIP-8".to_string());

    let mut app = App::new(&image, title, args.cpu_hz).context("Failed to initialize application")?;

    let mut terminal = ratatui::init();
    let app_result = app.run(&mut terminal);
    ratatui::restore();

    app_result
}
