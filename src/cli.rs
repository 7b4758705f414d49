//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::lessons;
use crate::params::WavCapture;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Keywave")]
#[command(about = "A pocket piano with note recording and lessons", long_about = None)]
pub struct Args {
    /// Start a lesson immediately: twinkle, happy or lullaby
    #[arg(long, value_name = "NAME")]
    pub lesson: Option<String>,

    /// List the built-in lessons and exit
    #[arg(long)]
    pub list_lessons: bool,

    /// Label the keys with note names from the start
    #[arg(long)]
    pub show_notes: bool,

    /// Capture the audio output to a WAV file
    #[arg(long, value_name = "PATH")]
    pub record_wav: Option<PathBuf>,
}

impl Args {
    /// Resolve the requested startup lesson, warning on unknown names
    pub fn startup_lesson(&self) -> Option<&'static str> {
        let name = self.lesson.as_deref()?;
        match lessons::find(name) {
            Some(lesson) => Some(lesson.name),
            None => {
                eprintln!("Warning: unknown lesson '{}', ignoring", name);
                None
            }
        }
    }

    /// WAV capture configuration, if requested
    pub fn wav_capture(&self) -> Option<WavCapture> {
        self.record_wav.clone().map(WavCapture::new)
    }
}
