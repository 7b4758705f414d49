//! Built-in practice lessons.
//!
//! A lesson is a named, fixed, ordered note sequence walked on a one-second
//! grid by the controller.

use crate::note::{Note, PitchClass};

/// A named practice sequence
#[derive(Debug, Clone, Copy)]
pub struct Lesson {
    pub name: &'static str,
    pub notes: &'static [Note],
}

const TWINKLE: [Note; 7] = [
    Note::new(PitchClass::C, 4),
    Note::new(PitchClass::C, 4),
    Note::new(PitchClass::G, 4),
    Note::new(PitchClass::G, 4),
    Note::new(PitchClass::A, 4),
    Note::new(PitchClass::A, 4),
    Note::new(PitchClass::G, 4),
];

const HAPPY: [Note; 6] = [
    Note::new(PitchClass::C, 4),
    Note::new(PitchClass::C, 4),
    Note::new(PitchClass::D, 4),
    Note::new(PitchClass::C, 4),
    Note::new(PitchClass::F, 4),
    Note::new(PitchClass::E, 4),
];

const LULLABY: [Note; 10] = [
    Note::new(PitchClass::G, 4),
    Note::new(PitchClass::E, 4),
    Note::new(PitchClass::E, 4),
    Note::new(PitchClass::D, 4),
    Note::new(PitchClass::C, 4),
    Note::new(PitchClass::D, 4),
    Note::new(PitchClass::E, 4),
    Note::new(PitchClass::D, 4),
    Note::new(PitchClass::D, 4),
    Note::new(PitchClass::C, 4),
];

/// All built-in lessons, in menu order
pub const LESSONS: &[Lesson] = &[
    Lesson {
        name: "twinkle",
        notes: &TWINKLE,
    },
    Lesson {
        name: "happy",
        notes: &HAPPY,
    },
    Lesson {
        name: "lullaby",
        notes: &LULLABY,
    },
];

/// Look up a lesson by name (case-insensitive)
pub fn find(name: &str) -> Option<&'static Lesson> {
    LESSONS
        .iter()
        .find(|lesson| lesson.name.eq_ignore_ascii_case(name))
}
