//! Fire-and-forget sound cue dispatch. Playback lives on the presentation
//! side behind [`SoundSink`]; a failing sink never affects game state.

use super::state::SoundCue;

#[derive(Debug)]
pub struct PlaybackError(pub String);

pub trait SoundSink {
    fn play(&self, cue: SoundCue) -> Result<(), PlaybackError>;
}

/// Mute-gated channel the engines trigger cues through. The mute flag is
/// checked before every trigger; playback errors are swallowed.
#[derive(Default)]
pub struct AudioChannel {
    muted: bool,
    sink: Option<Box<dyn SoundSink>>,
}

impl AudioChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sink(&mut self, sink: Option<Box<dyn SoundSink>>) {
        self.sink = sink;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    pub fn play(&self, cue: SoundCue) {
        if self.muted {
            return;
        }
        if let Some(sink) = &self.sink {
            let _ = sink.play(cue);
        }
    }
}
