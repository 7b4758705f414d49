//! Parameter definitions with physical units and documented semantics.
//!
//! All timing and audio magic numbers live here with their units and
//! defaults; the CLI only ever overrides a handful of them.

use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

/// Audio constants (compile-time, match Glicol engine setup)
pub mod audio_constants {
    /// Audio block size (samples per Glicol buffer)
    pub const BLOCK_SIZE: usize = 128;
}

/// Audio output configuration
#[derive(Debug, Clone)]
pub struct AudioParams {
    /// Sample rate (Hz)
    pub sample_rate_hz: usize,

    /// Per-voice gain (linear, keeps a full chord under the limiter)
    pub voice_gain: f32,

    /// Low-pass cutoff applied to every voice (Hz)
    pub voice_lpf_hz: f32,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            voice_gain: 0.12,
            voice_lpf_hz: 1800.0,
        }
    }
}

/// Note and lesson timing
#[derive(Debug, Clone)]
pub struct TimingParams {
    /// Hold duration for replayed notes. The original key-hold length is not
    /// recorded; every replayed note gets this fixed length.
    pub playback_hold: Duration,

    /// Lesson step period (one note per step)
    pub lesson_step: Duration,

    /// Hold duration for lesson notes
    pub lesson_hold: Duration,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            playback_hold: Duration::from_millis(500),
            lesson_step: Duration::from_secs(1),
            lesson_hold: Duration::from_millis(500),
        }
    }
}

/// FFT analysis configuration with frequency band mappings
#[derive(Debug, Clone)]
pub struct FftParams {
    /// Audio sample rate (Hz)
    pub sample_rate_hz: usize,

    /// FFT window size (must be a power of 2)
    pub fft_size: usize,

    /// Analysis update interval (milliseconds)
    pub update_interval_ms: u64,

    /// Bass frequency range (Hz)
    pub bass_range_hz: (f32, f32),

    /// Mid frequency range (Hz)
    pub mid_range_hz: (f32, f32),

    /// High frequency range (Hz)
    pub high_range_hz: (f32, f32),
}

impl Default for FftParams {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44100,
            fft_size: 1024,
            update_interval_ms: 100,
            bass_range_hz: (20.0, 200.0),
            mid_range_hz: (200.0, 1000.0),
            high_range_hz: (1000.0, 4000.0),
        }
    }
}

impl FftParams {
    /// Convert frequency (Hz) to FFT bin index
    pub fn hz_to_bin(&self, hz: f32) -> usize {
        ((hz * self.fft_size as f32) / self.sample_rate_hz as f32) as usize
    }

    /// FFT bin range for bass frequencies
    pub fn bass_bins(&self) -> Range<usize> {
        self.hz_to_bin(self.bass_range_hz.0)..self.hz_to_bin(self.bass_range_hz.1)
    }

    /// FFT bin range for mid frequencies
    pub fn mid_bins(&self) -> Range<usize> {
        self.hz_to_bin(self.mid_range_hz.0)..self.hz_to_bin(self.mid_range_hz.1)
    }

    /// FFT bin range for high frequencies
    pub fn high_bins(&self) -> Range<usize> {
        self.hz_to_bin(self.high_range_hz.0)..self.hz_to_bin(self.high_range_hz.1)
    }

    /// Validate configuration (FFT size must be a power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be power of 2, got {}",
                self.fft_size
            ));
        }
        if self.sample_rate_hz == 0 {
            return Err("Sample rate must be > 0".to_string());
        }
        Ok(())
    }
}

/// WAV capture of the output signal
#[derive(Debug, Clone)]
pub struct WavCapture {
    /// Output file path
    pub path: PathBuf,
}

impl WavCapture {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}
