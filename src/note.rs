//! Musical note identifiers.
//!
//! A note is a pitch class (letter plus optional sharp) and an octave number,
//! written as a token like `C4` or `F#3`. Notes are plain values compared by
//! exact equality; frequency is derived from the MIDI number with A4 = 440 Hz.

use std::fmt;
use std::str::FromStr;

/// Pitch class within an octave (chromatic, sharps only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// Semitone offset from C (C=0, B=11)
    pub fn semitone(self) -> u8 {
        match self {
            PitchClass::C => 0,
            PitchClass::CSharp => 1,
            PitchClass::D => 2,
            PitchClass::DSharp => 3,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::FSharp => 6,
            PitchClass::G => 7,
            PitchClass::GSharp => 8,
            PitchClass::A => 9,
            PitchClass::ASharp => 10,
            PitchClass::B => 11,
        }
    }

    /// Note letter without the sharp marker
    pub fn letter(self) -> char {
        match self {
            PitchClass::C | PitchClass::CSharp => 'C',
            PitchClass::D | PitchClass::DSharp => 'D',
            PitchClass::E => 'E',
            PitchClass::F | PitchClass::FSharp => 'F',
            PitchClass::G | PitchClass::GSharp => 'G',
            PitchClass::A | PitchClass::ASharp => 'A',
            PitchClass::B => 'B',
        }
    }

    /// Whether this is a sharp (black-key) pitch class
    pub fn is_sharp(self) -> bool {
        matches!(
            self,
            PitchClass::CSharp
                | PitchClass::DSharp
                | PitchClass::FSharp
                | PitchClass::GSharp
                | PitchClass::ASharp
        )
    }

    fn from_letter_and_sharp(letter: char, sharp: bool) -> Option<Self> {
        let class = match (letter, sharp) {
            ('C', false) => PitchClass::C,
            ('C', true) => PitchClass::CSharp,
            ('D', false) => PitchClass::D,
            ('D', true) => PitchClass::DSharp,
            ('E', false) => PitchClass::E,
            ('F', false) => PitchClass::F,
            ('F', true) => PitchClass::FSharp,
            ('G', false) => PitchClass::G,
            ('G', true) => PitchClass::GSharp,
            ('A', false) => PitchClass::A,
            ('A', true) => PitchClass::ASharp,
            ('B', false) => PitchClass::B,
            _ => return None,
        };
        Some(class)
    }
}

/// A single note: pitch class plus octave number (middle C = C4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pub pitch: PitchClass,
    pub octave: u8,
}

impl Note {
    pub const fn new(pitch: PitchClass, octave: u8) -> Self {
        Self { pitch, octave }
    }

    /// MIDI note number (C4 = 60)
    pub fn midi(self) -> u8 {
        (self.octave + 1) * 12 + self.pitch.semitone()
    }

    /// Equal-temperament frequency in Hz (A4 = 440 Hz)
    pub fn frequency_hz(self) -> f32 {
        440.0 * 2f32.powf((self.midi() as f32 - 69.0) / 12.0)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.pitch.letter(),
            if self.pitch.is_sharp() { "#" } else { "" },
            self.octave
        )
    }
}

/// Error parsing a note token like `C4` or `F#3`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid note token {0:?}")]
pub struct ParseNoteError(pub String);

impl FromStr for Note {
    type Err = ParseNoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseNoteError(s.to_string());

        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(err)?.to_ascii_uppercase();
        let rest = chars.as_str();
        let (sharp, octave_str) = match rest.strip_prefix('#') {
            Some(tail) => (true, tail),
            None => (false, rest),
        };

        let pitch = PitchClass::from_letter_and_sharp(letter, sharp).ok_or_else(err)?;
        let octave: u8 = octave_str.parse().map_err(|_| err())?;

        Ok(Note::new(pitch, octave))
    }
}
