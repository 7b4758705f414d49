//! Visual collaborators: keyboard mirror and spectrum meter.
//!
//! Both components sit behind traits so the controller never depends on how
//! (or whether) they draw. The bundled implementations render to the
//! terminal: one line of piano keys with the struck key bracketed, and a
//! three-band bar meter.

use std::io::{self, Write};

use crate::keymap;
use crate::note::Note;
use crate::spectrum::{Bands, SpectrumAnalyser};

/// Visual keyboard: mirrors struck keys, optionally labelling them
pub trait KeyboardDisplay {
    /// Flash `note` as active
    fn activate_key(&mut self, note: Note);

    /// Toggle note-name labels on the keys
    fn set_show_notes(&mut self, show: bool);

    fn show_notes(&self) -> bool;
}

/// Spectrum meter fed by an FFT analyser
pub trait SpectrumDisplay {
    /// Attach the analysis source; replaces any previous one
    fn set_analyser(&mut self, analyser: SpectrumAnalyser);

    /// Detach from the analysis source
    fn clear_analyser(&mut self);

    /// Redraw from the current band energies
    fn refresh(&mut self);
}

/// One-line terminal keyboard
#[derive(Debug)]
pub struct TerminalKeyboard {
    show_notes: bool,
    keys: Vec<Note>,
}

impl TerminalKeyboard {
    pub fn new(show_notes: bool) -> Self {
        Self {
            show_notes,
            keys: keymap::bound_notes(),
        }
    }

    fn render(&self, active: Note) -> String {
        let mut line = String::new();
        for &key in &self.keys {
            let label = if self.show_notes {
                key.to_string()
            } else if key.pitch.is_sharp() {
                "▮".to_string()
            } else {
                "▯".to_string()
            };
            if key == active {
                line.push_str(&format!("[{}]", label));
            } else {
                line.push_str(&format!(" {} ", label));
            }
        }
        line
    }
}

impl KeyboardDisplay for TerminalKeyboard {
    fn activate_key(&mut self, note: Note) {
        println!("  {}", self.render(note));
        let _ = io::stdout().flush();
    }

    fn set_show_notes(&mut self, show: bool) {
        self.show_notes = show;
    }

    fn show_notes(&self) -> bool {
        self.show_notes
    }
}

/// Three-band terminal bar meter, redrawn in place
#[derive(Default)]
pub struct TerminalSpectrum {
    analyser: Option<SpectrumAnalyser>,
}

impl TerminalSpectrum {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Scale a band energy to a bar of at most `width` cells
fn bar(energy: f32, width: usize) -> String {
    let filled = ((energy * 2.0) as usize).min(width);
    "█".repeat(filled) + " ".repeat(width - filled).as_str()
}

impl SpectrumDisplay for TerminalSpectrum {
    fn set_analyser(&mut self, analyser: SpectrumAnalyser) {
        self.analyser = Some(analyser);
    }

    fn clear_analyser(&mut self) {
        self.analyser = None;
        print!("\r{:60}\r", "");
        let _ = io::stdout().flush();
    }

    fn refresh(&mut self) {
        let Some(ref analyser) = self.analyser else {
            return;
        };
        let Bands { low, mid, high } = analyser.bands();
        print!(
            "\r  low |{}| mid |{}| high |{}|",
            bar(low, 12),
            bar(mid, 12),
            bar(high, 12)
        );
        let _ = io::stdout().flush();
    }
}
