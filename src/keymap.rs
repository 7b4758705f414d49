//! Physical-key to note bindings.
//!
//! The home row carries the white keys of one octave (A = C4 through K = C5)
//! and the row above carries the sharps, mirroring the usual tracker layout.

use winit::keyboard::KeyCode;

use crate::note::{Note, PitchClass};

/// Note bound to a physical key, if any.
///
/// This is a pure lookup: repeat suppression and the engine-present guard are
/// the caller's concern.
pub fn note_for(key: KeyCode) -> Option<Note> {
    let note = match key {
        KeyCode::KeyA => Note::new(PitchClass::C, 4),
        KeyCode::KeyW => Note::new(PitchClass::CSharp, 4),
        KeyCode::KeyS => Note::new(PitchClass::D, 4),
        KeyCode::KeyE => Note::new(PitchClass::DSharp, 4),
        KeyCode::KeyD => Note::new(PitchClass::E, 4),
        KeyCode::KeyF => Note::new(PitchClass::F, 4),
        KeyCode::KeyT => Note::new(PitchClass::FSharp, 4),
        KeyCode::KeyG => Note::new(PitchClass::G, 4),
        KeyCode::KeyY => Note::new(PitchClass::GSharp, 4),
        KeyCode::KeyH => Note::new(PitchClass::A, 4),
        KeyCode::KeyU => Note::new(PitchClass::ASharp, 4),
        KeyCode::KeyJ => Note::new(PitchClass::B, 4),
        KeyCode::KeyK => Note::new(PitchClass::C, 5),
        _ => return None,
    };
    Some(note)
}

/// All bound notes in keyboard order, for the key-row display.
pub fn bound_notes() -> Vec<Note> {
    const ROW: [KeyCode; 13] = [
        KeyCode::KeyA,
        KeyCode::KeyW,
        KeyCode::KeyS,
        KeyCode::KeyE,
        KeyCode::KeyD,
        KeyCode::KeyF,
        KeyCode::KeyT,
        KeyCode::KeyG,
        KeyCode::KeyY,
        KeyCode::KeyH,
        KeyCode::KeyU,
        KeyCode::KeyJ,
        KeyCode::KeyK,
    ];
    ROW.iter().filter_map(|&key| note_for(key)).collect()
}
