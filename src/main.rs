//! Keywave - a pocket piano for the terminal
//!
//! The home row plays one octave through a Glicol synth, struck keys are
//! mirrored on a one-line keyboard, and a spectrum meter follows the output.
//! Played notes can be recorded and replayed, and built-in lessons walk
//! through short practice tunes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::warn;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use keywave::cli::Args;
use keywave::controller::Controller;
use keywave::display::{SpectrumDisplay, TerminalKeyboard, TerminalSpectrum};
use keywave::engine::GlicolEngine;
use keywave::lessons;
use keywave::params::{AudioParams, FftParams, TimingParams, WavCapture};
use keywave::spectrum::SpectrumAnalyser;

/// Spectrum meter redraw period
const SPECTRUM_REFRESH: Duration = Duration::from_millis(100);

/// Main application state
struct App {
    // The window exists only to receive keyboard focus
    window: Option<Arc<Window>>,

    controller: Controller,
    spectrum: TerminalSpectrum,

    // Startup options, consumed on first resume
    startup_lesson: Option<&'static str>,
    wav_capture: Option<WavCapture>,
}

impl App {
    fn new(args: &Args) -> Self {
        let keyboard = TerminalKeyboard::new(args.show_notes);
        let controller = Controller::new(Box::new(keyboard), TimingParams::default());

        Self {
            window: None,
            controller,
            spectrum: TerminalSpectrum::new(),
            startup_lesson: args.startup_lesson(),
            wav_capture: args.wav_capture(),
        }
    }

    /// Start the audio engine and attach the spectrum analyser
    fn init_audio(&mut self) {
        match GlicolEngine::new(AudioParams::default(), self.wav_capture.take()) {
            Ok(engine) => {
                match SpectrumAnalyser::spawn(FftParams::default(), engine.tap()) {
                    Ok(analyser) => self.spectrum.set_analyser(analyser),
                    Err(e) => warn!("spectrum analysis unavailable: {}", e),
                }
                self.controller.attach_engine(Box::new(engine));

                if let Some(name) = self.startup_lesson.take() {
                    self.controller.start_lesson(name, Instant::now());
                }
            }
            // Keyboard input stays gated off until an engine exists
            Err(e) => warn!("audio unavailable: {}", e),
        }
    }

    fn handle_key(&mut self, code: KeyCode, state: ElementState, repeat: bool) {
        let now = Instant::now();

        if state == ElementState::Pressed && !repeat {
            match code {
                KeyCode::F1 => return self.controller.toggle_record(now),
                KeyCode::F2 => return self.controller.start_playback(now),
                KeyCode::F3 => {
                    self.spectrum.clear_analyser();
                    return self.controller.shutdown_audio();
                }
                KeyCode::F5 => {
                    let show = !self.controller.show_notes();
                    return self.controller.set_show_notes(show);
                }
                KeyCode::Digit1 | KeyCode::Digit2 | KeyCode::Digit3 => {
                    let index = match code {
                        KeyCode::Digit1 => 0,
                        KeyCode::Digit2 => 1,
                        _ => 2,
                    };
                    if let Some(lesson) = lessons::LESSONS.get(index) {
                        self.controller.start_lesson(lesson.name, now);
                    }
                    return;
                }
                _ => {}
            }
        }

        match state {
            ElementState::Pressed => self.controller.key_down(code, repeat, now),
            ElementState::Released => self.controller.key_up(code, now),
        }
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        self.spectrum.clear_analyser();
        self.controller.shutdown_audio();
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Keywave - focus me and play")
            .with_inner_size(winit::dpi::LogicalSize::new(480.0, 120.0));
        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        self.init_audio();

        println!("\nKeywave is running!");
        println!("Press ESC to quit\n");

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.quit(event_loop),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                if code == KeyCode::Escape && state == ElementState::Pressed {
                    self.quit(event_loop);
                } else {
                    self.handle_key(code, state, repeat);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let next_timer = self.controller.tick(now);
        self.spectrum.refresh();

        // Sleep until the next timer, but keep the meter moving while the
        // engine is up
        let control_flow = if self.controller.has_engine() {
            let wake = next_timer
                .unwrap_or(now + SPECTRUM_REFRESH)
                .min(now + SPECTRUM_REFRESH);
            ControlFlow::WaitUntil(wake)
        } else {
            match next_timer {
                Some(deadline) => ControlFlow::WaitUntil(deadline),
                None => ControlFlow::Wait,
            }
        };
        event_loop.set_control_flow(control_flow);
    }
}

fn print_help() {
    println!("Keys:");
    println!("  A W S E D F T G Y H U J K   play C4 through C5");
    println!("  F1   start/stop recording");
    println!("  F2   replay the recording");
    println!("  F3   shut down the audio engine");
    println!("  F5   toggle note-name labels");
    println!("  1-3  start a lesson (twinkle, happy, lullaby)");
    println!("  ESC  quit");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keywave=info")),
        )
        .init();

    let args = Args::parse();

    if args.list_lessons {
        for lesson in lessons::LESSONS {
            println!("{:10} {:2} notes", lesson.name, lesson.notes.len());
        }
        return Ok(());
    }

    println!("Keywave - pocket piano");
    print_help();

    let mut app = App::new(&args);
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop
        .run_app(&mut app)
        .context("event loop failed")?;

    Ok(())
}
