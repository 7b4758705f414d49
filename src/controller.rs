//! Session controller.
//!
//! One `Controller` owns the whole session: audio engine, keyboard display,
//! timer scheduler, recorder and lesson state. UI events arrive as method
//! calls; delayed work (replayed notes, note releases, lesson steps) arrives
//! back through [`Controller::tick`]. Record/playback flow is an explicit
//! state machine (Idle → Recording → Idle → Playing → Idle) and every
//! transition method validates the current mode before acting.

use std::time::Instant;

use tracing::{debug, info, warn};
use winit::keyboard::KeyCode;

use crate::display::KeyboardDisplay;
use crate::engine::{AudioEngine, VoiceId};
use crate::keymap;
use crate::lessons::{self, Lesson};
use crate::note::Note;
use crate::params::TimingParams;
use crate::recorder::Recorder;
use crate::scheduler::{Scheduler, TimerId};

/// Record/playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Recording,
    Playing,
}

/// Delayed work dispatched through the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    /// Sound one replayed note and schedule its release
    PlaybackNote(Note),
    /// Release a sounding voice
    StopVoice(VoiceId),
    /// Playback ran past its last note: re-enable the controls
    PlaybackDone,
    /// Sound the next lesson note and advance
    LessonStep,
}

/// A lesson in progress: position in the sequence plus the pending step timer
struct LessonRun {
    lesson: &'static Lesson,
    index: usize,
    step_timer: TimerId,
}

/// The session object: owns every piece of mutable session state
pub struct Controller {
    mode: Mode,
    engine: Option<Box<dyn AudioEngine>>,
    keyboard: Box<dyn KeyboardDisplay>,
    scheduler: Scheduler<TimerEvent>,
    recorder: Recorder,
    timing: TimingParams,

    /// Voice started by the most recent interactive key press
    current_voice: Option<VoiceId>,
    lesson: Option<LessonRun>,
}

impl Controller {
    pub fn new(keyboard: Box<dyn KeyboardDisplay>, timing: TimingParams) -> Self {
        Self {
            mode: Mode::Idle,
            engine: None,
            keyboard,
            scheduler: Scheduler::new(),
            recorder: Recorder::new(),
            timing,
            current_voice: None,
            lesson: None,
        }
    }

    /// Attach the audio engine; enables every sound-producing control
    pub fn attach_engine(&mut self, engine: Box<dyn AudioEngine>) {
        self.engine = Some(engine);
        info!("audio engine attached");
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Notes captured by the most recent recording session
    pub fn recorded_count(&self) -> usize {
        self.recorder.events().len()
    }

    // --- note interaction -------------------------------------------------

    /// A note interaction began (struck key on the visual keyboard or a bound
    /// physical key). Last-note priority: the previous interactive voice is
    /// released first.
    pub fn note_started(&mut self, note: Note, now: Instant) {
        self.note_ended(now);
        self.current_voice = self.strike(note, now);
    }

    /// The current note interaction ended
    pub fn note_ended(&mut self, _now: Instant) {
        if let Some(voice) = self.current_voice.take() {
            if let Some(engine) = self.engine.as_mut() {
                engine.note_off(voice);
            }
        }
    }

    /// Physical key pressed. Sounds a note only if the key is bound, the
    /// event is not an auto-repeat, and an engine is attached.
    pub fn key_down(&mut self, key: KeyCode, repeat: bool, now: Instant) {
        if self.engine.is_none() {
            return;
        }
        let Some(note) = keymap::note_for(key) else {
            return;
        };
        if repeat {
            return;
        }
        self.note_started(note, now);
    }

    /// Physical key released. The repeat state does not matter here.
    pub fn key_up(&mut self, key: KeyCode, now: Instant) {
        if self.engine.is_none() {
            return;
        }
        if keymap::note_for(key).is_some() {
            self.note_ended(now);
        }
    }

    // --- record / playback ------------------------------------------------

    /// Idle → Recording, or Recording → Idle. Rejected during playback.
    pub fn toggle_record(&mut self, now: Instant) {
        if self.engine.is_none() {
            warn!("cannot record without an audio engine");
            return;
        }
        match self.mode {
            Mode::Idle => {
                self.recorder.begin(now);
                self.mode = Mode::Recording;
                info!("recording started");
            }
            Mode::Recording => {
                self.recorder.end();
                self.mode = Mode::Idle;
                info!("recording stopped ({} notes)", self.recorder.events().len());
            }
            Mode::Playing => warn!("cannot toggle recording during playback"),
        }
    }

    /// Idle → Playing: schedule every recorded note at its stored offset,
    /// plus one completion timer past the last note. An empty recording is a
    /// no-op.
    pub fn start_playback(&mut self, now: Instant) {
        if self.engine.is_none() {
            warn!("cannot play back without an audio engine");
            return;
        }
        if self.mode != Mode::Idle {
            warn!("playback requested while {:?}", self.mode);
            return;
        }
        let events = self.recorder.events();
        let Some(last) = events.last() else {
            debug!("nothing recorded, playback skipped");
            return;
        };

        let done_at = now + last.offset + self.timing.playback_hold;
        let starts: Vec<_> = events.iter().map(|ev| (now + ev.offset, ev.note)).collect();
        for (deadline, note) in starts {
            self.scheduler
                .schedule_at(deadline, TimerEvent::PlaybackNote(note));
        }
        self.scheduler.schedule_at(done_at, TimerEvent::PlaybackDone);

        self.mode = Mode::Playing;
        info!("playback started");
    }

    // --- lessons ----------------------------------------------------------

    /// Select a lesson. Cancels the step timer of any lesson in progress, so
    /// exactly one lesson runs at a time. Allowed while recording (lesson
    /// notes are captured), rejected during playback.
    pub fn start_lesson(&mut self, name: &str, now: Instant) {
        if self.engine.is_none() {
            warn!("cannot start a lesson without an audio engine");
            return;
        }
        if self.mode == Mode::Playing {
            warn!("lesson requested during playback");
            return;
        }
        let Some(lesson) = lessons::find(name) else {
            warn!("unknown lesson {:?}", name);
            return;
        };

        if let Some(run) = self.lesson.take() {
            self.scheduler.cancel(run.step_timer);
            debug!("lesson {} cancelled", run.lesson.name);
        }

        let step_timer = self
            .scheduler
            .schedule_at(now + self.timing.lesson_step, TimerEvent::LessonStep);
        self.lesson = Some(LessonRun {
            lesson,
            index: 0,
            step_timer,
        });
        info!("lesson {} started ({} notes)", lesson.name, lesson.notes.len());
    }

    // --- display ----------------------------------------------------------

    /// Toggle note-name labels. Touches nothing on the audio side.
    pub fn set_show_notes(&mut self, show: bool) {
        self.keyboard.set_show_notes(show);
    }

    pub fn show_notes(&self) -> bool {
        self.keyboard.show_notes()
    }

    // --- lifecycle --------------------------------------------------------

    /// Tear down the audio engine. Every pending timer is cancelled first, so
    /// no callback can reach the dropped engine.
    pub fn shutdown_audio(&mut self) {
        if self.engine.is_none() {
            debug!("audio already shut down");
            return;
        }
        self.scheduler.cancel_all();
        self.lesson = None;
        self.current_voice = None;
        self.recorder.end();
        self.engine = None;
        self.mode = Mode::Idle;
        info!("audio engine shut down");
    }

    /// Fire every due timer and return the next pending deadline
    pub fn tick(&mut self, now: Instant) -> Option<Instant> {
        while let Some((_, event)) = self.scheduler.pop_due(now) {
            self.dispatch(event, now);
        }
        self.scheduler.next_deadline()
    }

    // --- internals --------------------------------------------------------

    /// Sound a note: mirror it on the keyboard display, start an engine
    /// voice, and capture it if a recording is active.
    fn strike(&mut self, note: Note, now: Instant) -> Option<VoiceId> {
        let engine = self.engine.as_mut()?;
        let voice = match engine.note_on(note) {
            Ok(voice) => voice,
            Err(e) => {
                warn!("failed to sound {}: {}", note, e);
                return None;
            }
        };
        self.keyboard.activate_key(note);
        self.recorder.capture(note, now);
        Some(voice)
    }

    fn dispatch(&mut self, event: TimerEvent, now: Instant) {
        match event {
            TimerEvent::PlaybackNote(note) => {
                if let Some(voice) = self.strike(note, now) {
                    self.scheduler.schedule_at(
                        now + self.timing.playback_hold,
                        TimerEvent::StopVoice(voice),
                    );
                }
            }
            TimerEvent::StopVoice(voice) => {
                if let Some(engine) = self.engine.as_mut() {
                    engine.note_off(voice);
                }
            }
            TimerEvent::PlaybackDone => {
                if self.mode == Mode::Playing {
                    self.mode = Mode::Idle;
                    info!("playback finished");
                } else {
                    debug!("stray playback-done in {:?}", self.mode);
                }
            }
            TimerEvent::LessonStep => self.lesson_step(now),
        }
    }

    fn lesson_step(&mut self, now: Instant) {
        let Some(mut run) = self.lesson.take() else {
            return;
        };

        // index < len is an invariant: the run is dropped instead of being
        // rescheduled once the sequence is exhausted
        let note = run.lesson.notes[run.index];
        if let Some(voice) = self.strike(note, now) {
            self.scheduler
                .schedule_at(now + self.timing.lesson_hold, TimerEvent::StopVoice(voice));
        }

        run.index += 1;
        if run.index < run.lesson.notes.len() {
            run.step_timer = self
                .scheduler
                .schedule_at(now + self.timing.lesson_step, TimerEvent::LessonStep);
            self.lesson = Some(run);
        } else {
            info!("lesson {} finished", run.lesson.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::note::PitchClass;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        On(Note, u64),
        Off(u64),
    }

    #[derive(Default)]
    struct MockEngine {
        calls: Rc<RefCell<Vec<Call>>>,
        next_voice: u64,
    }

    impl AudioEngine for MockEngine {
        fn note_on(&mut self, note: Note) -> Result<VoiceId, EngineError> {
            let id = self.next_voice;
            self.next_voice += 1;
            self.calls.borrow_mut().push(Call::On(note, id));
            Ok(VoiceId(id))
        }

        fn note_off(&mut self, voice: VoiceId) {
            self.calls.borrow_mut().push(Call::Off(voice.0));
        }
    }

    #[derive(Default)]
    struct MockKeyboard {
        activated: Rc<RefCell<Vec<Note>>>,
        show_notes: bool,
    }

    impl KeyboardDisplay for MockKeyboard {
        fn activate_key(&mut self, note: Note) {
            self.activated.borrow_mut().push(note);
        }

        fn set_show_notes(&mut self, show: bool) {
            self.show_notes = show;
        }

        fn show_notes(&self) -> bool {
            self.show_notes
        }
    }

    struct Rig {
        controller: Controller,
        calls: Rc<RefCell<Vec<Call>>>,
        activated: Rc<RefCell<Vec<Note>>>,
        t0: Instant,
    }

    fn rig() -> Rig {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let activated = Rc::new(RefCell::new(Vec::new()));

        let keyboard = MockKeyboard {
            activated: Rc::clone(&activated),
            show_notes: false,
        };
        let mut controller = Controller::new(Box::new(keyboard), TimingParams::default());
        controller.attach_engine(Box::new(MockEngine {
            calls: Rc::clone(&calls),
            next_voice: 0,
        }));

        Rig {
            controller,
            calls,
            activated,
            t0: Instant::now(),
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn c4() -> Note {
        Note::new(PitchClass::C, 4)
    }

    fn d4() -> Note {
        Note::new(PitchClass::D, 4)
    }

    fn g4() -> Note {
        Note::new(PitchClass::G, 4)
    }

    #[test]
    fn test_key_input_ignored_without_engine() {
        let activated = Rc::new(RefCell::new(Vec::new()));
        let keyboard = MockKeyboard {
            activated: Rc::clone(&activated),
            show_notes: false,
        };
        let mut controller = Controller::new(Box::new(keyboard), TimingParams::default());

        controller.key_down(KeyCode::KeyA, false, Instant::now());
        controller.key_up(KeyCode::KeyA, Instant::now());

        assert!(activated.borrow().is_empty());
    }

    #[test]
    fn test_auto_repeat_does_not_restrike() {
        let mut rig = rig();
        let t = rig.t0;

        rig.controller.key_down(KeyCode::KeyA, false, t);
        rig.controller.key_down(KeyCode::KeyA, true, t + ms(80));
        rig.controller.key_down(KeyCode::KeyA, true, t + ms(160));
        assert_eq!(&*rig.calls.borrow(), &[Call::On(c4(), 0)]);

        // Release then press again strikes a fresh voice
        rig.controller.key_up(KeyCode::KeyA, t + ms(200));
        rig.controller.key_down(KeyCode::KeyA, false, t + ms(300));
        assert_eq!(
            &*rig.calls.borrow(),
            &[Call::On(c4(), 0), Call::Off(0), Call::On(c4(), 1)]
        );
    }

    #[test]
    fn test_unbound_keys_do_nothing() {
        let mut rig = rig();
        rig.controller.key_down(KeyCode::KeyZ, false, rig.t0);
        rig.controller.key_up(KeyCode::KeyZ, rig.t0);
        assert!(rig.calls.borrow().is_empty());
    }

    #[test]
    fn test_new_key_releases_previous_voice() {
        let mut rig = rig();

        rig.controller.key_down(KeyCode::KeyA, false, rig.t0);
        rig.controller.key_down(KeyCode::KeyS, false, rig.t0 + ms(100));

        assert_eq!(
            &*rig.calls.borrow(),
            &[Call::On(c4(), 0), Call::Off(0), Call::On(d4(), 1)]
        );
    }

    #[test]
    fn test_recording_then_playback_reproduces_offsets() {
        let mut rig = rig();
        let t0 = rig.t0;

        rig.controller.toggle_record(t0);
        assert_eq!(rig.controller.mode(), Mode::Recording);

        rig.controller.note_started(c4(), t0);
        rig.controller.note_ended(t0 + ms(200));
        rig.controller.note_started(g4(), t0 + ms(500));
        rig.controller.note_ended(t0 + ms(700));

        rig.controller.toggle_record(t0 + ms(900));
        assert_eq!(rig.controller.mode(), Mode::Idle);
        assert_eq!(rig.controller.recorded_count(), 2);

        // Replay from a fresh epoch
        let t1 = t0 + Duration::from_secs(10);
        rig.calls.borrow_mut().clear();
        rig.controller.start_playback(t1);
        assert_eq!(rig.controller.mode(), Mode::Playing);

        // Nothing sounds before the first offset is due
        rig.controller.tick(t1 - ms(1));
        assert!(rig.calls.borrow().is_empty());

        // t1: first note starts
        rig.controller.tick(t1);
        assert_eq!(&*rig.calls.borrow(), &[Call::On(c4(), 2)]);

        // t1+500ms: second note starts, first stops after its fixed hold
        rig.controller.tick(t1 + ms(500));
        assert_eq!(
            &*rig.calls.borrow(),
            &[Call::On(c4(), 2), Call::On(g4(), 3), Call::Off(2)]
        );
        assert_eq!(rig.controller.mode(), Mode::Playing);

        // t1+1000ms: second note stops and the controls come back
        rig.controller.tick(t1 + ms(1000));
        assert_eq!(
            &*rig.calls.borrow(),
            &[
                Call::On(c4(), 2),
                Call::On(g4(), 3),
                Call::Off(2),
                Call::Off(3)
            ]
        );
        assert_eq!(rig.controller.mode(), Mode::Idle);
        assert!(rig.controller.tick(t1 + ms(1001)).is_none());
    }

    #[test]
    fn test_new_recording_discards_previous_take() {
        let mut rig = rig();
        let t0 = rig.t0;

        rig.controller.toggle_record(t0);
        rig.controller.note_started(c4(), t0 + ms(100));
        rig.controller.toggle_record(t0 + ms(200));
        assert_eq!(rig.controller.recorded_count(), 1);

        rig.controller.toggle_record(t0 + ms(300));
        assert_eq!(rig.controller.recorded_count(), 0);
    }

    #[test]
    fn test_empty_playback_is_noop() {
        let mut rig = rig();
        let t0 = rig.t0;

        rig.controller.toggle_record(t0);
        rig.controller.toggle_record(t0 + ms(100));
        rig.controller.start_playback(t0 + ms(200));

        assert_eq!(rig.controller.mode(), Mode::Idle);
        assert!(rig.controller.tick(t0 + Duration::from_secs(60)).is_none());
        assert!(rig.calls.borrow().is_empty());
    }

    #[test]
    fn test_transitions_rejected_during_playback() {
        let mut rig = rig();
        let t0 = rig.t0;

        rig.controller.toggle_record(t0);
        rig.controller.note_started(c4(), t0);
        rig.controller.note_ended(t0 + ms(100));
        rig.controller.toggle_record(t0 + ms(200));

        rig.controller.start_playback(t0 + ms(300));
        assert_eq!(rig.controller.mode(), Mode::Playing);

        // All rejected mid-playback, without disturbing the schedule
        rig.controller.toggle_record(t0 + ms(310));
        assert_eq!(rig.controller.mode(), Mode::Playing);
        rig.controller.start_playback(t0 + ms(320));
        rig.controller.start_lesson("twinkle", t0 + ms(330));

        rig.controller.tick(t0 + Duration::from_secs(5));
        assert_eq!(rig.controller.mode(), Mode::Idle);
        // One start, one stop: the rejected requests scheduled nothing
        assert_eq!(rig.calls.borrow().iter().filter(|c| matches!(c, Call::On(..))).count(), 2);
    }

    #[test]
    fn test_twinkle_runs_seven_steps_then_halts() {
        let mut rig = rig();
        let t0 = rig.t0;
        let second = Duration::from_secs(1);

        rig.controller.start_lesson("twinkle", t0);

        // Nothing before the first step is due
        rig.controller.tick(t0 + ms(999));
        assert!(rig.calls.borrow().is_empty());

        for step in 1..=7u32 {
            rig.controller.tick(t0 + second * step);
            let ons = rig
                .calls
                .borrow()
                .iter()
                .filter(|c| matches!(c, Call::On(..)))
                .count();
            assert_eq!(ons, step as usize);
        }

        // The last release is the only thing left; after it the queue is dry
        rig.controller.tick(t0 + second * 7 + ms(500));
        assert!(rig.controller.tick(t0 + second * 8).is_none());

        let calls = rig.calls.borrow();
        let played: Vec<Note> = calls
            .iter()
            .filter_map(|c| match c {
                Call::On(note, _) => Some(*note),
                _ => None,
            })
            .collect();
        let expected: Vec<Note> = lessons::find("twinkle").unwrap().notes.to_vec();
        assert_eq!(played, expected);

        // Every voice got its 500ms release
        let offs = calls.iter().filter(|c| matches!(c, Call::Off(_))).count();
        assert_eq!(offs, 7);
    }

    #[test]
    fn test_selecting_lesson_cancels_previous() {
        let mut rig = rig();
        let t0 = rig.t0;
        let second = Duration::from_secs(1);

        rig.controller.start_lesson("twinkle", t0);
        rig.controller.tick(t0 + second); // twinkle plays its first note

        // Switch mid-lesson; twinkle's pending step must not fire
        rig.controller.start_lesson("happy", t0 + second + ms(500));
        let mut cursor = t0 + second + ms(500);
        for _ in 0..12 {
            cursor += second;
            rig.controller.tick(cursor);
        }
        assert!(rig.controller.tick(cursor + second).is_none());

        let calls = rig.calls.borrow();
        let played: Vec<Note> = calls
            .iter()
            .filter_map(|c| match c {
                Call::On(note, _) => Some(*note),
                _ => None,
            })
            .collect();

        let mut expected = vec![c4()]; // first twinkle note
        expected.extend_from_slice(lessons::find("happy").unwrap().notes);
        assert_eq!(played, expected);
    }

    #[test]
    fn test_lesson_notes_are_captured_while_recording() {
        let mut rig = rig();
        let t0 = rig.t0;
        let second = Duration::from_secs(1);

        rig.controller.toggle_record(t0);
        rig.controller.start_lesson("happy", t0);
        rig.controller.tick(t0 + second);
        rig.controller.tick(t0 + second * 2);
        rig.controller.toggle_record(t0 + second * 2 + ms(100));

        assert_eq!(rig.controller.recorded_count(), 2);
    }

    #[test]
    fn test_show_notes_roundtrip_leaves_audio_alone() {
        let mut rig = rig();

        assert!(!rig.controller.show_notes());
        rig.controller.set_show_notes(true);
        assert!(rig.controller.show_notes());
        rig.controller.set_show_notes(false);
        assert!(!rig.controller.show_notes());

        assert!(rig.calls.borrow().is_empty());
        assert!(rig.activated.borrow().is_empty());
    }

    #[test]
    fn test_shutdown_cancels_all_pending_timers() {
        let mut rig = rig();
        let t0 = rig.t0;

        rig.controller.toggle_record(t0);
        rig.controller.note_started(c4(), t0);
        rig.controller.note_ended(t0 + ms(100));
        rig.controller.toggle_record(t0 + ms(200));
        rig.controller.start_playback(t0 + ms(300));
        rig.controller.start_lesson("twinkle", t0 + ms(300)); // rejected: Playing

        let before = rig.calls.borrow().len();
        rig.controller.shutdown_audio();
        assert_eq!(rig.controller.mode(), Mode::Idle);
        assert!(!rig.controller.has_engine());

        // Nothing fires after teardown: the schedule is empty and stays empty
        assert!(rig.controller.tick(t0 + Duration::from_secs(30)).is_none());
        assert_eq!(rig.calls.borrow().len(), before);

        // Input is gated off again
        rig.controller.key_down(KeyCode::KeyA, false, t0 + Duration::from_secs(31));
        assert_eq!(rig.calls.borrow().len(), before);
    }
}
