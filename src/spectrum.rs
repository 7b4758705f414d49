//! FFT spectrum analysis over the engine's sample tap.
//!
//! A background thread wakes on a fixed interval, Hann-windows the tapped
//! samples, runs a forward FFT and publishes averaged band energies. The
//! thread exits when the owning [`SpectrumAnalyser`] is dropped, so no
//! analysis work outlives the audio engine it taps.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rustfft::{num_complex::Complex, FftPlanner};
use tracing::debug;

use crate::params::FftParams;

/// Audio frequency band energies
#[derive(Clone, Copy, Debug, Default)]
pub struct Bands {
    pub low: f32,  // Bass (20-200 Hz)
    pub mid: f32,  // Mids (200-1000 Hz)
    pub high: f32, // Highs (1000-4000 Hz)
}

/// Handle to a running analysis thread
pub struct SpectrumAnalyser {
    bands: Arc<Mutex<Bands>>,
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SpectrumAnalyser {
    /// Start analysing `tap` with the given configuration
    pub fn spawn(params: FftParams, tap: Arc<Mutex<Vec<f32>>>) -> Result<Self, String> {
        params.validate()?;

        let bands = Arc::new(Mutex::new(Bands::default()));
        let running = Arc::new(AtomicBool::new(true));

        let thread = spawn_fft_thread(params, tap, Arc::clone(&bands), Arc::clone(&running));

        Ok(Self {
            bands,
            running,
            thread: Some(thread),
        })
    }

    /// Latest band energies (thread-safe)
    pub fn bands(&self) -> Bands {
        *self.bands.lock().unwrap()
    }
}

impl Drop for SpectrumAnalyser {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        debug!("spectrum analysis stopped");
    }
}

/// Spawn the FFT analysis thread
fn spawn_fft_thread(
    params: FftParams,
    tap: Arc<Mutex<Vec<f32>>>,
    bands: Arc<Mutex<Bands>>,
    running: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(params.fft_size);
        let mut fft_input = vec![Complex::new(0.0, 0.0); params.fft_size];
        let mut fft_output = vec![Complex::new(0.0, 0.0); params.fft_size];

        while running.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(params.update_interval_ms));

            let mut buf = tap.lock().unwrap();

            if buf.len() >= params.fft_size {
                // Apply Hann window
                for i in 0..params.fft_size {
                    let window = hann_window(i, params.fft_size);
                    fft_input[i] = Complex::new(buf[i] * window, 0.0);
                }

                fft_output.copy_from_slice(&fft_input);
                fft.process(&mut fft_output);

                *bands.lock().unwrap() = Bands {
                    low: band_energy(&fft_output, params.bass_bins()),
                    mid: band_energy(&fft_output, params.mid_bins()),
                    high: band_energy(&fft_output, params.high_bins()),
                };

                // 50% overlap (drain half the window)
                buf.drain(0..params.fft_size / 2);
            }
        }
    })
}

/// Average magnitude over a bin range
fn band_energy(spectrum: &[Complex<f32>], bins: std::ops::Range<usize>) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let len = bins.len() as f32;
    spectrum[bins].iter().map(|c| c.norm()).sum::<f32>() / len
}

/// Hann window function for FFT analysis
fn hann_window(index: usize, size: usize) -> f32 {
    0.5 * (1.0 - ((2.0 * PI * index as f32) / (size as f32 - 1.0)).cos())
}
