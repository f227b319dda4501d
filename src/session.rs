//! Session and device state: the single owned context that ties the speech
//! capability, transcript assembler, autosave coordinator, and note store
//! together. One note open, one recognition session active — the design
//! relies on this singleton assumption.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::autosave::{AutosaveCoordinator, SaveStatus, DEFAULT_DEBOUNCE};
use crate::note::{Language, Note};
use crate::speech::{CaptureConfig, RecognitionEvent, SpeechError, SpeechRecognizer};
use crate::store::{NoteStore, StorageError};
use crate::transcript::{DesktopHandler, EditorBuffer, MobileHandler, ResultHandler};

/// Delay before an auto-restart after the engine ends on its own; keeps a
/// permanently-failing engine from restart-storming
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_millis(250);

/// Capture-mode selection, detected once at session construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Continuous capture with interim results
    Desktop,
    /// Segmented capture, final results only
    Mobile,
}

impl DeviceClass {
    const MOBILE_MARKERS: [&'static str; 6] =
        ["android", "iphone", "ipad", "ipod", "mobile", "windows phone"];

    /// Heuristic string match against the platform's reported identity;
    /// evaluated once and never re-checked
    #[must_use]
    pub fn detect(platform_identity: &str) -> Self {
        let identity = platform_identity.to_lowercase();
        if Self::MOBILE_MARKERS.iter().any(|m| identity.contains(m)) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }
}

/// Recording lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// No capture active
    Stopped,
    /// Start requested, waiting for the engine's start notification
    Starting,
    /// Engine is capturing
    Listening,
}

/// Session construction parameters
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Platform identity string fed to the device-class heuristic
    pub platform_identity: String,
    /// Initial recognition language
    pub language: Language,
    /// Autosave debounce window
    pub autosave_delay: Duration,
    /// Delay before an engine auto-restart
    pub restart_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            platform_identity: std::env::consts::OS.to_owned(),
            language: Language::default(),
            autosave_delay: DEFAULT_DEBOUNCE,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }
}

/// The one owned session: current note, recording state machine, language,
/// connectivity flag, and the timers that coordinate autosave and engine
/// restart
pub struct Session {
    store: NoteStore,
    recognizer: Box<dyn SpeechRecognizer>,
    handler: Box<dyn ResultHandler>,
    autosave: AutosaveCoordinator,
    device: DeviceClass,
    language: Language,
    online: bool,
    recording: RecordingState,
    restart_at: Option<Instant>,
    restart_delay: Duration,
    no_speech_retried: bool,
    note: Note,
    editor: EditorBuffer,
    status: Option<String>,
}

impl Session {
    /// Build a session over an opened store and an injected speech engine
    ///
    /// Opens the most recently touched note, or a fresh blank one on first
    /// launch with zero existing notes. The result handler is chosen here,
    /// once, from the detected device class.
    ///
    /// # Errors
    /// Returns [`StorageError`] if the initial note listing fails.
    pub fn new(
        store: NoteStore,
        recognizer: Box<dyn SpeechRecognizer>,
        options: &SessionOptions,
    ) -> Result<Self, StorageError> {
        let device = DeviceClass::detect(&options.platform_identity);
        let handler: Box<dyn ResultHandler> = match device {
            DeviceClass::Desktop => Box::new(DesktopHandler::new()),
            DeviceClass::Mobile => Box::new(MobileHandler::new()),
        };

        let note = store
            .list()?
            .into_iter()
            .next()
            .unwrap_or_else(|| Note::new(options.language));
        let editor = EditorBuffer::from_text(&note.text);

        info!(?device, language = %options.language, "session created");
        Ok(Self {
            store,
            recognizer,
            handler,
            autosave: AutosaveCoordinator::new(options.autosave_delay),
            device,
            language: options.language,
            online: true,
            recording: RecordingState::Stopped,
            restart_at: None,
            restart_delay: options.restart_delay,
            no_speech_retried: false,
            note,
            editor,
            status: None,
        })
    }

    // --- recording state machine ---

    /// Request recording start
    ///
    /// Refused while offline (the engine is never invoked and the state
    /// stays `Stopped`); a start while already `Starting` or `Listening` is
    /// a no-op.
    pub fn start_recording(&mut self) {
        if !self.online {
            self.set_status("You're offline. Speech recognition needs a connection; you can still type your note.");
            return;
        }
        if self.recording != RecordingState::Stopped {
            debug!(state = ?self.recording, "start while active ignored");
            return;
        }

        self.no_speech_retried = false;
        self.restart_at = None;
        self.handler.reset();
        self.recording = RecordingState::Starting;
        if let Err(err) = self.recognizer.start(self.capture_config()) {
            self.fail_recording(&err);
        } else {
            info!(language = %self.language, device = ?self.device, "recording starting");
        }
    }

    /// Request recording stop; idempotent, and suppresses any pending
    /// auto-restart from the session being stopped
    pub fn stop_recording(&mut self) {
        self.restart_at = None;
        if self.recording == RecordingState::Stopped {
            return;
        }
        self.recording = RecordingState::Stopped;
        self.recognizer.stop();
        self.handler.reset();
        info!("recording stopped");
    }

    /// Engine confirmed the capture started
    pub fn on_engine_start(&mut self) {
        if self.recording == RecordingState::Starting {
            self.recording = RecordingState::Listening;
            self.set_status("Listening…");
        }
    }

    /// One recognition event arrived; events are processed strictly in
    /// arrival order
    pub fn on_engine_result(&mut self, event: &RecognitionEvent, now: Instant) {
        if self.recording == RecordingState::Stopped {
            debug!("result after stop ignored");
            return;
        }
        if self.handler.on_event(event, &mut self.editor) {
            self.note.text = self.editor.text().to_owned();
            self.autosave.note_mutation(now);
        }
    }

    /// The engine ended the capture on its own (silence timeout, fixed
    /// duration). If the user has not requested stop and we are online,
    /// schedule a transparent restart after a short delay; the guard in
    /// [`Session::tick`] re-validates state at fire time.
    pub fn on_engine_end(&mut self, now: Instant) {
        self.handler.reset();
        if self.recording == RecordingState::Listening && self.online {
            self.restart_at = Some(now + self.restart_delay);
            debug!(delay = ?self.restart_delay, "auto-restart scheduled");
        } else {
            self.recording = RecordingState::Stopped;
        }
    }

    /// A typed engine error arrived
    ///
    /// `NoSpeech` on mobile gets one restart attempt; `NotAllowed` and
    /// `Network` are terminal for this session; everything else stops the
    /// capture with a status message.
    pub fn on_engine_error(&mut self, err: &SpeechError, now: Instant) {
        warn!(%err, "speech engine error");
        match err {
            SpeechError::NoSpeech
                if self.device == DeviceClass::Mobile && !self.no_speech_retried =>
            {
                self.no_speech_retried = true;
                self.restart_at = Some(now + self.restart_delay);
            }
            SpeechError::Aborted => {
                // Fired when a capture is torn down intentionally; stop
                // quietly without a status message.
                self.recording = RecordingState::Stopped;
                self.restart_at = None;
                self.handler.reset();
            }
            _ => {
                // NotAllowed and Network are terminal for the session; the
                // remaining kinds also stop the capture and surface the
                // engine's message.
                self.fail_recording(err);
            }
        }
    }

    /// Connectivity change notification; going offline force-stops an
    /// active recording
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
        if !online && self.recording != RecordingState::Stopped {
            self.stop_recording();
            self.set_status("Connection lost; recording stopped.");
        }
    }

    /// Advance session timers: flush a due autosave and fire a due engine
    /// restart. Both guards re-validate state at the moment they act.
    pub fn tick(&mut self, now: Instant) {
        if self.autosave.take_due(now) {
            let ok = self.persist_current();
            self.autosave.record_result(ok);
        }

        if let Some(restart_at) = self.restart_at {
            if now >= restart_at {
                self.restart_at = None;
                // Re-validate: a stop during the delay window, or an offline
                // transition, prevents the restart entirely.
                if self.recording == RecordingState::Listening && self.online {
                    self.recording = RecordingState::Starting;
                    if let Err(err) = self.recognizer.start(self.capture_config()) {
                        self.fail_recording(&err);
                    } else {
                        debug!("engine restarted");
                    }
                }
            }
        }
    }

    // --- note lifecycle ---

    /// Replace the current note with a fresh, unsaved one in the session
    /// language
    pub fn new_note(&mut self) {
        self.autosave.cancel();
        self.note = Note::new(self.language);
        self.editor = EditorBuffer::default();
        debug!("new blank note");
    }

    /// Open a stored note
    ///
    /// # Errors
    /// Returns [`StorageError`] on read failure.
    pub fn open_note(&mut self, id: i64) -> Result<bool, StorageError> {
        match self.store.get(id)? {
            Some(note) => {
                self.autosave.cancel();
                self.editor = EditorBuffer::from_text(&note.text);
                self.note = note;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete a note permanently
    ///
    /// If it was the open note, fall back to the most-recently-modified
    /// remaining note, or a fresh blank one if none remain.
    ///
    /// # Errors
    /// Returns [`StorageError`] on delete or fallback-listing failure.
    pub fn delete_note(&mut self, id: i64) -> Result<(), StorageError> {
        self.store.delete(id)?;
        if self.note.id == Some(id) {
            self.autosave.cancel();
            self.note = self
                .store
                .list()?
                .into_iter()
                .next()
                .unwrap_or_else(|| Note::new(self.language));
            self.editor = EditorBuffer::from_text(&self.note.text);
        }
        Ok(())
    }

    // --- edits ---

    /// Manual title edit
    pub fn edit_title(&mut self, title: &str, now: Instant) {
        self.note.title = title.to_owned();
        self.autosave.note_mutation(now);
    }

    /// Manual body edit; cursor moves to the end of the new text
    pub fn edit_text(&mut self, text: &str, now: Instant) {
        self.editor.replace(text);
        self.note.text = text.to_owned();
        self.autosave.note_mutation(now);
    }

    /// Move the insertion cursor (clamped to a valid position)
    pub fn set_cursor(&mut self, offset: usize) {
        self.editor.set_cursor(offset);
    }

    /// Attach a generated summary to the current note
    pub fn set_summary(&mut self, summary: String, now: Instant) {
        self.note.summary = Some(summary);
        self.autosave.note_mutation(now);
    }

    /// Manual save: bypasses the debounce, canceling any pending deadline
    ///
    /// # Errors
    /// Returns [`StorageError`] on write failure.
    pub fn save_now(&mut self) -> Result<i64, StorageError> {
        self.autosave.cancel();
        let id = self.store.save(&mut self.note)?;
        self.autosave.record_result(true);
        Ok(id)
    }

    /// Change the recognition language; applies to new notes and, if a
    /// capture is active, to the engine by restarting it
    pub fn set_language(&mut self, language: Language) {
        if self.language == language {
            return;
        }
        self.language = language;
        if self.recording != RecordingState::Stopped {
            self.stop_recording();
            self.start_recording();
        }
    }

    // --- accessors ---

    /// Current note (may be unsaved)
    #[must_use]
    pub const fn note(&self) -> &Note {
        &self.note
    }

    /// Live interim transcript for display (desktop mode only)
    #[must_use]
    pub fn interim(&self) -> &str {
        self.handler.interim()
    }

    /// Recording state
    #[must_use]
    pub const fn recording(&self) -> RecordingState {
        self.recording
    }

    /// Detected device class
    #[must_use]
    pub const fn device(&self) -> DeviceClass {
        self.device
    }

    /// Current language selection
    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Connectivity flag
    #[must_use]
    pub const fn online(&self) -> bool {
        self.online
    }

    /// Autosave status signal
    #[must_use]
    pub const fn save_status(&self) -> SaveStatus {
        self.autosave.status()
    }

    /// Take the latest user-facing status message, if any
    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    /// Underlying note store (listing, export)
    #[must_use]
    pub const fn store(&self) -> &NoteStore {
        &self.store
    }

    // --- internals ---

    const fn capture_config(&self) -> CaptureConfig {
        let continuous = matches!(self.device, DeviceClass::Desktop);
        CaptureConfig {
            language: self.language,
            continuous,
            interim_results: continuous,
        }
    }

    fn persist_current(&mut self) -> bool {
        match self.store.save(&mut self.note) {
            Ok(id) => {
                debug!(id, "autosave committed");
                true
            }
            Err(err) => {
                warn!(%err, "autosave failed");
                self.set_status("Couldn't save your note. It will retry on your next edit.");
                false
            }
        }
    }

    fn fail_recording(&mut self, err: &SpeechError) {
        self.recording = RecordingState::Stopped;
        self.restart_at = None;
        self.recognizer.stop();
        self.handler.reset();
        self.set_status(&err.to_string());
    }

    fn set_status(&mut self, message: &str) {
        info!(message, "status");
        self.status = Some(message.to_owned());
    }
}
