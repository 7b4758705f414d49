//! Audio synthesis engine.
//!
//! Synthesis is delegated to Glicol: every sounding note is one line in a
//! small Glicol graph which is rebuilt whenever a voice starts or stops, and
//! the graph is rendered block-by-block inside a cpal output callback. The
//! callback also feeds a sample tap consumed by the FFT analyser and, when
//! capture is enabled, a WAV writer.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::BufWriter;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use glicol::Engine;
use tracing::{debug, info, warn};

use crate::note::Note;
use crate::params::{audio_constants::BLOCK_SIZE, AudioParams, WavCapture};

/// Audio engine failures
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no audio output device found")]
    NoOutputDevice,
    #[error("failed to get audio config: {0}")]
    StreamConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("synth graph rejected: {0}")]
    Synth(String),
    #[error("failed to create WAV capture: {0}")]
    WavCapture(#[from] hound::Error),
}

/// Handle for one sounding voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

/// The synthesis collaborator: start a note, get a stoppable voice handle.
///
/// Implementations must support polyphony (concurrent voices mix) and treat
/// `note_off` for an unknown or already-stopped voice as a no-op.
pub trait AudioEngine {
    fn note_on(&mut self, note: Note) -> Result<VoiceId, EngineError>;
    fn note_off(&mut self, voice: VoiceId);
}

type SharedGraph = Arc<Mutex<Engine<BLOCK_SIZE>>>;
type SharedWavWriter = Arc<Mutex<hound::WavWriter<BufWriter<File>>>>;

/// Glicol graph rendered through a cpal output stream
pub struct GlicolEngine {
    graph: SharedGraph,
    voices: BTreeMap<u64, Note>,
    next_voice: u64,
    params: AudioParams,

    /// Mono sample tap for FFT analysis
    tap: Arc<Mutex<Vec<f32>>>,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,
}

impl GlicolEngine {
    /// Create the Glicol graph and start the output stream
    pub fn new(params: AudioParams, capture: Option<WavCapture>) -> Result<Self, EngineError> {
        let wav_writer: Option<SharedWavWriter> = match capture {
            Some(capture) => {
                let spec = hound::WavSpec {
                    channels: 2,
                    sample_rate: params.sample_rate_hz as u32,
                    bits_per_sample: 32,
                    sample_format: hound::SampleFormat::Float,
                };
                let writer = hound::WavWriter::create(&capture.path, spec)?;
                info!(path = %capture.path.display(), "capturing output to WAV");
                Some(Arc::new(Mutex::new(writer)))
            }
            None => None,
        };

        let mut graph = Engine::<BLOCK_SIZE>::new();
        graph.set_sr(params.sample_rate_hz);
        graph.update_with_code(SILENCE);
        graph
            .update()
            .map_err(|e| EngineError::Synth(format!("{:?}", e)))?;

        let graph = Arc::new(Mutex::new(graph));
        let graph_render = Arc::clone(&graph);

        let tap = Arc::new(Mutex::new(Vec::<f32>::new()));
        let tap_render = Arc::clone(&tap);

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;
        let config = device.default_output_config()?;

        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate = config.sample_rate().0,
            "audio output ready"
        );

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut graph = graph_render.lock().unwrap();
                let mut tap = tap_render.lock().unwrap();

                let frames_needed = data.len() / 2; // Stereo frames
                let mut frame_idx = 0;

                // Generate multiple blocks if needed to fill the entire buffer
                while frame_idx < frames_needed {
                    let (buffers, _) = graph.next_block(vec![]);

                    let samples_to_copy = (frames_needed - frame_idx).min(BLOCK_SIZE);

                    for i in 0..samples_to_copy {
                        // Safety limiter: hard clip to ±0.5
                        let left = buffers[0][i].clamp(-0.5, 0.5);
                        let right = buffers[1][i].clamp(-0.5, 0.5);

                        let out_idx = (frame_idx + i) * 2;
                        data[out_idx] = left;
                        data[out_idx + 1] = right;

                        tap.push(left); // Accumulate for FFT analysis

                        if let Some(ref writer) = wav_writer {
                            if let Ok(mut w) = writer.lock() {
                                let _ = w.write_sample(left);
                                let _ = w.write_sample(right);
                            }
                        }
                    }

                    frame_idx += samples_to_copy;
                }
            },
            |err| warn!("audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        Ok(Self {
            graph,
            voices: BTreeMap::new(),
            next_voice: 0,
            params,
            tap,
            _stream: stream,
        })
    }

    /// Shared sample tap for the FFT analyser
    pub fn tap(&self) -> Arc<Mutex<Vec<f32>>> {
        Arc::clone(&self.tap)
    }

    /// Push the current voice set into the running graph
    fn apply(&mut self) -> Result<(), EngineError> {
        let code = compose(&self.voices, &self.params);
        let mut graph = self.graph.lock().unwrap();
        graph.update_with_code(&code);
        graph
            .update()
            .map_err(|e| EngineError::Synth(format!("{:?}", e)))
    }
}

const SILENCE: &str = "o: constsig 0.0";

/// Glicol code for a voice set.
///
/// One chain per voice plus a mix line; an empty voice set degenerates to a
/// constant-zero output so the graph always has an `o` node.
fn compose(voices: &BTreeMap<u64, Note>, params: &AudioParams) -> String {
    if voices.is_empty() {
        return SILENCE.to_string();
    }

    let mut code = String::new();
    for (id, note) in voices {
        let _ = writeln!(
            code,
            "~v{}: saw {:.2} >> lpf {:.1} 1.0 >> mul {}",
            id,
            note.frequency_hz(),
            params.voice_lpf_hz,
            params.voice_gain,
        );
    }
    let refs: Vec<String> = voices.keys().map(|id| format!("~v{}", id)).collect();
    let _ = writeln!(code, "o: mix {} >> plate 0.1", refs.join(" "));
    code
}

impl AudioEngine for GlicolEngine {
    fn note_on(&mut self, note: Note) -> Result<VoiceId, EngineError> {
        let id = self.next_voice;
        self.next_voice += 1;
        self.voices.insert(id, note);

        if let Err(e) = self.apply() {
            // Roll the voice back so the map matches the running graph
            self.voices.remove(&id);
            return Err(e);
        }

        debug!(%note, voice = id, "note on");
        Ok(VoiceId(id))
    }

    fn note_off(&mut self, voice: VoiceId) {
        // Stopping an unknown voice is a no-op, so a stop timer that outlives
        // its voice is harmless.
        if self.voices.remove(&voice.0).is_none() {
            return;
        }

        debug!(voice = voice.0, "note off");
        if let Err(e) = self.apply() {
            warn!("failed to release voice {}: {}", voice.0, e);
        }
    }
}
