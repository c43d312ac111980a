//! Audio output backends
//!
//! The engine only talks to an [`AudioBackend`]. The browser build uses the
//! Web Audio implementation in `web.rs`; tests and the native binary use
//! [`OfflineBackend`], which keeps a clock and a command log instead of
//! making sound.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::graph::VoiceGraph;
use crate::error::AudioError;

/// Output context state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextState {
    /// Created but not yet allowed to play (or paused by the host)
    Suspended,
    Running,
    Closed,
}

impl ContextState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextState::Suspended => "suspended",
            ContextState::Running => "running",
            ContextState::Closed => "closed",
        }
    }
}

/// A playing voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoiceHandle(pub u32);

/// Something that can realize voice graphs
pub trait AudioBackend {
    fn state(&self) -> ContextState;

    /// Audio clock in seconds
    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> f32;

    /// Gain of the bus every voice feeds
    fn set_master_gain(&mut self, gain: f32);

    /// Build `graph` and start it now
    fn play(&mut self, graph: &VoiceGraph) -> Result<VoiceHandle, AudioError>;

    /// Ramp the voice's output linearly to silence over `fade` seconds,
    /// then stop every source in it
    fn release(&mut self, voice: VoiceHandle, fade: f64) -> Result<(), AudioError>;

    fn resume(&mut self) -> Result<(), AudioError>;

    fn suspend(&mut self) -> Result<(), AudioError>;

    fn close(&mut self) -> Result<(), AudioError>;
}

/// A recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play {
        voice: VoiceHandle,
        name: String,
        at: f64,
    },
    Release {
        voice: VoiceHandle,
        at: f64,
        fade: f64,
    },
    MasterGain(f32),
    Resume,
    Suspend,
    Close,
}

#[derive(Debug, Clone)]
struct OfflineVoice {
    name: String,
    /// When the last source stops, if known
    ends_at: Option<f64>,
}

/// Device-free backend with a manually advanced clock
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    state: ContextState,
    time: f64,
    sample_rate: f32,
    master_gain: f32,
    next_voice: u32,
    voices: HashMap<u32, OfflineVoice>,
    log: Vec<Command>,
    /// Make the next `play` fail (for exercising error paths)
    pub fail_next_play: bool,
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new(44_100.0)
    }
}

impl OfflineBackend {
    /// A suspended context, like a freshly created browser one
    pub fn new(sample_rate: f32) -> Self {
        Self {
            state: ContextState::Suspended,
            time: 0.0,
            sample_rate,
            master_gain: 1.0,
            next_voice: 1,
            voices: HashMap::new(),
            log: Vec::new(),
            fail_next_play: false,
        }
    }

    /// Move the clock forward, retiring voices that have finished
    pub fn advance(&mut self, secs: f64) {
        if self.state != ContextState::Running {
            return;
        }
        self.time += secs;
        let now = self.time;
        self.voices.retain(|_, v| v.ends_at.is_none_or(|end| end > now));
    }

    /// Voices still sounding
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Names of sounding voices, sorted
    pub fn active_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.voices.values().map(|v| v.name.clone()).collect();
        names.sort();
        names
    }

    pub fn is_playing(&self, voice: VoiceHandle) -> bool {
        self.voices.contains_key(&voice.0)
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn commands(&self) -> &[Command] {
        &self.log
    }

    /// Names of every voice ever started, in order
    pub fn played(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter_map(|c| match c {
                Command::Play { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl AudioBackend for OfflineBackend {
    fn state(&self) -> ContextState {
        self.state
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain;
        self.log.push(Command::MasterGain(gain));
    }

    fn play(&mut self, graph: &VoiceGraph) -> Result<VoiceHandle, AudioError> {
        if self.state == ContextState::Closed {
            return Err(AudioError::Locked(self.state.as_str()));
        }
        if std::mem::take(&mut self.fail_next_play) {
            return Err(AudioError::NodeCreation {
                node: "oscillator",
                reason: "injected failure".to_string(),
            });
        }
        graph.validate()?;

        let voice = VoiceHandle(self.next_voice);
        self.next_voice += 1;
        self.voices.insert(
            voice.0,
            OfflineVoice {
                name: graph.name.clone(),
                ends_at: graph.duration().map(|d| self.time + d),
            },
        );
        self.log.push(Command::Play {
            voice,
            name: graph.name.clone(),
            at: self.time,
        });
        Ok(voice)
    }

    fn release(&mut self, voice: VoiceHandle, fade: f64) -> Result<(), AudioError> {
        let Some(v) = self.voices.get_mut(&voice.0) else {
            return Err(AudioError::UnknownVoice(voice.0));
        };
        let end = self.time + fade;
        v.ends_at = Some(v.ends_at.map_or(end, |e| e.min(end)));
        self.log.push(Command::Release {
            voice,
            at: self.time,
            fade,
        });
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.state == ContextState::Closed {
            return Err(AudioError::Locked(self.state.as_str()));
        }
        self.state = ContextState::Running;
        self.log.push(Command::Resume);
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        if self.state == ContextState::Closed {
            return Err(AudioError::Locked(self.state.as_str()));
        }
        self.state = ContextState::Suspended;
        self.log.push(Command::Suspend);
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        self.state = ContextState::Closed;
        self.voices.clear();
        self.log.push(Command::Close);
        Ok(())
    }
}
