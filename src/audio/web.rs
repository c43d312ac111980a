//! Web Audio backend
//!
//! Realizes [`VoiceGraph`]s as `web_sys` nodes. Every voice gets its own
//! bus gain feeding the master gain, so a release only has to ramp one
//! parameter.

use std::collections::HashMap;

use wasm_bindgen::JsValue;
use web_sys::{
    AudioBuffer, AudioContext, AudioContextState, AudioNode, AudioParam, AudioScheduledSourceNode,
    BiquadFilterType, GainNode, OscillatorType,
};

use super::backend::{AudioBackend, ContextState, VoiceHandle};
use super::graph::{Automation, FilterKind, NodeSpec, SampleBuffer, Target, VoiceGraph, Waveform};
use crate::error::AudioError;

/// Longest delay line any recipe asks for
const MAX_DELAY_SECS: f64 = 2.0;

struct WebVoice {
    bus: GainNode,
    sources: Vec<AudioScheduledSourceNode>,
    ends_at: Option<f64>,
}

/// A built node: its input/output and, for oscillators, the frequency
/// parameter
struct BuiltNode {
    node: AudioNode,
    frequency: Option<AudioParam>,
}

pub struct WebAudioBackend {
    ctx: AudioContext,
    master: GainNode,
    voices: HashMap<u32, WebVoice>,
    next_voice: u32,
    /// `resume()` resolves asynchronously; report running once asked
    resume_requested: bool,
}

fn js_err(e: JsValue) -> String {
    format!("{:?}", e)
}

fn node_err(node: &'static str) -> impl Fn(JsValue) -> AudioError {
    move |e| AudioError::NodeCreation {
        node,
        reason: js_err(e),
    }
}

impl WebAudioBackend {
    /// Create the context and master bus. Fails outside a secure context or
    /// when the browser has no audio support.
    pub fn new() -> Result<Self, AudioError> {
        let ctx = AudioContext::new().map_err(|e| {
            log::warn!("Failed to create AudioContext: {}", js_err(e));
            AudioError::Unavailable
        })?;
        let master = ctx.create_gain().map_err(node_err("gain"))?;
        master
            .connect_with_audio_node(&ctx.destination())
            .map_err(|e| AudioError::Connect(js_err(e)))?;
        Ok(Self {
            ctx,
            master,
            voices: HashMap::new(),
            next_voice: 1,
            resume_requested: false,
        })
    }

    fn retire_finished(&mut self) {
        let now = self.ctx.current_time();
        self.voices.retain(|_, v| v.ends_at.is_none_or(|end| end > now));
    }

    fn make_buffer(&self, samples: &SampleBuffer) -> Result<AudioBuffer, AudioError> {
        let length = samples.len().max(1) as u32;
        let buffer = self
            .ctx
            .create_buffer(samples.channels.len().max(1) as u32, length, samples.sample_rate)
            .map_err(node_err("buffer"))?;
        for (i, channel) in samples.channels.iter().enumerate() {
            let mut data = channel.clone();
            buffer
                .copy_to_channel(&mut data, i as i32)
                .map_err(|e| AudioError::Scheduling(js_err(e)))?;
        }
        Ok(buffer)
    }

    fn build_node(
        &self,
        spec: &NodeSpec,
        t0: f64,
        sources: &mut Vec<AudioScheduledSourceNode>,
    ) -> Result<BuiltNode, AudioError> {
        let sched = |e: JsValue| AudioError::Scheduling(js_err(e));
        match spec {
            NodeSpec::Oscillator {
                waveform,
                frequency,
                start,
                stop,
            } => {
                let osc = self.ctx.create_oscillator().map_err(node_err("oscillator"))?;
                osc.set_type(match waveform {
                    Waveform::Sine => OscillatorType::Sine,
                    Waveform::Square => OscillatorType::Square,
                    Waveform::Sawtooth => OscillatorType::Sawtooth,
                    Waveform::Triangle => OscillatorType::Triangle,
                });
                osc.frequency().set_value(*frequency);
                let source: AudioScheduledSourceNode = osc.clone().into();
                source.start_with_when(t0 + start).map_err(sched)?;
                if let Some(stop) = stop {
                    source.stop_with_when(t0 + stop).map_err(sched)?;
                }
                sources.push(source);
                Ok(BuiltNode {
                    frequency: Some(osc.frequency()),
                    node: osc.into(),
                })
            }
            NodeSpec::Noise { buffer, start, stop } => {
                let src = self
                    .ctx
                    .create_buffer_source()
                    .map_err(node_err("buffer source"))?;
                src.set_buffer(Some(&self.make_buffer(buffer)?));
                let source: AudioScheduledSourceNode = src.clone().into();
                source.start_with_when(t0 + start).map_err(sched)?;
                if let Some(stop) = stop {
                    source.stop_with_when(t0 + stop).map_err(sched)?;
                }
                sources.push(source);
                Ok(BuiltNode {
                    node: src.into(),
                    frequency: None,
                })
            }
            NodeSpec::Filter { kind, frequency, q } => {
                let filter = self
                    .ctx
                    .create_biquad_filter()
                    .map_err(node_err("filter"))?;
                filter.set_type(match kind {
                    FilterKind::Lowpass => BiquadFilterType::Lowpass,
                    FilterKind::Highpass => BiquadFilterType::Highpass,
                    FilterKind::Bandpass => BiquadFilterType::Bandpass,
                });
                filter.frequency().set_value(*frequency);
                filter.q().set_value(*q);
                Ok(BuiltNode {
                    node: filter.into(),
                    frequency: None,
                })
            }
            NodeSpec::Gain { envelope } => {
                let gain = self.ctx.create_gain().map_err(node_err("gain"))?;
                let param = gain.gain();
                for step in &envelope.steps {
                    let r = match *step {
                        Automation::Set { value, at } => param.set_value_at_time(value, t0 + at),
                        Automation::Linear { value, at } => {
                            param.linear_ramp_to_value_at_time(value, t0 + at)
                        }
                        Automation::Exponential { value, at } => {
                            param.exponential_ramp_to_value_at_time(value, t0 + at)
                        }
                    };
                    r.map_err(sched)?;
                }
                Ok(BuiltNode {
                    node: gain.into(),
                    frequency: None,
                })
            }
            NodeSpec::Delay { time } => {
                let delay = self
                    .ctx
                    .create_delay_with_max_delay_time(MAX_DELAY_SECS)
                    .map_err(node_err("delay"))?;
                delay.delay_time().set_value(*time as f32);
                Ok(BuiltNode {
                    node: delay.into(),
                    frequency: None,
                })
            }
            NodeSpec::Convolver { impulse } => {
                let convolver = self.ctx.create_convolver().map_err(node_err("convolver"))?;
                convolver.set_buffer(Some(&self.make_buffer(impulse)?));
                Ok(BuiltNode {
                    node: convolver.into(),
                    frequency: None,
                })
            }
        }
    }
}

impl AudioBackend for WebAudioBackend {
    fn state(&self) -> ContextState {
        match self.ctx.state() {
            AudioContextState::Running => ContextState::Running,
            AudioContextState::Closed => ContextState::Closed,
            _ if self.resume_requested => ContextState::Running,
            _ => ContextState::Suspended,
        }
    }

    fn current_time(&self) -> f64 {
        self.ctx.current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.ctx.sample_rate()
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.master.gain().set_value(gain);
    }

    fn play(&mut self, graph: &VoiceGraph) -> Result<VoiceHandle, AudioError> {
        if self.ctx.state() == AudioContextState::Closed {
            return Err(AudioError::Locked("closed"));
        }
        graph.validate()?;
        self.retire_finished();

        let t0 = self.ctx.current_time();
        let bus = self.ctx.create_gain().map_err(node_err("gain"))?;
        bus.connect_with_audio_node(&self.master)
            .map_err(|e| AudioError::Connect(js_err(e)))?;

        let mut sources = Vec::new();
        let built = graph
            .nodes
            .iter()
            .map(|spec| self.build_node(spec, t0, &mut sources))
            .collect::<Result<Vec<_>, _>>()?;

        for conn in &graph.connections {
            let from = &built[conn.from].node;
            let result = match conn.to {
                Target::Node(to) => from.connect_with_audio_node(&built[to].node).map(|_| ()),
                Target::Frequency(to) => match &built[to].frequency {
                    Some(param) => from.connect_with_audio_param(param),
                    None => {
                        return Err(AudioError::InvalidGraph(format!(
                            "node {} has no frequency",
                            to
                        )));
                    }
                },
                Target::Output => from.connect_with_audio_node(&bus).map(|_| ()),
            };
            result.map_err(|e| AudioError::Connect(js_err(e)))?;
        }

        let voice = VoiceHandle(self.next_voice);
        self.next_voice += 1;
        self.voices.insert(
            voice.0,
            WebVoice {
                bus,
                sources,
                ends_at: graph.duration().map(|d| t0 + d),
            },
        );
        Ok(voice)
    }

    fn release(&mut self, voice: VoiceHandle, fade: f64) -> Result<(), AudioError> {
        let v = self
            .voices
            .remove(&voice.0)
            .ok_or(AudioError::UnknownVoice(voice.0))?;
        let now = self.ctx.current_time();
        let end = now + fade;
        let param = v.bus.gain();
        let level = param.value();
        param.cancel_scheduled_values(now).ok();
        param.set_value_at_time(level, now).ok();
        param.linear_ramp_to_value_at_time(0.0, end).ok();
        for source in &v.sources {
            source.stop_with_when(end).ok();
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.ctx
            .resume()
            .map_err(|e| AudioError::Scheduling(js_err(e)))?;
        self.resume_requested = true;
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), AudioError> {
        self.ctx
            .suspend()
            .map_err(|e| AudioError::Scheduling(js_err(e)))?;
        self.resume_requested = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        for (_, v) in self.voices.drain() {
            v.bus.disconnect().ok();
        }
        self.resume_requested = false;
        self.ctx
            .close()
            .map(|_| ())
            .map_err(|e| AudioError::Scheduling(js_err(e)))
    }
}
