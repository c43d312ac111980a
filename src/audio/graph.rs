//! Declarative voice graphs
//!
//! A sound is described as a small graph of nodes (sources, filters,
//! gains, delays, convolvers) plus the edges between them. A backend turns
//! the description into real nodes; nothing here touches an audio device.
//! All times are seconds relative to the moment the voice starts.

use serde::{Deserialize, Serialize};

use crate::error::AudioError;

/// Index of a node inside its graph
pub type NodeId = usize;

/// Oscillator shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Biquad filter modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
}

/// One parameter automation event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Automation {
    /// Jump to `value` at `at`
    Set { value: f32, at: f64 },
    /// Linear ramp ending at `value` at `at`
    Linear { value: f32, at: f64 },
    /// Exponential ramp ending at `value` at `at` (value must be > 0)
    Exponential { value: f32, at: f64 },
}

impl Automation {
    pub fn at(&self) -> f64 {
        match *self {
            Automation::Set { at, .. }
            | Automation::Linear { at, .. }
            | Automation::Exponential { at, .. } => at,
        }
    }

    pub fn value(&self) -> f32 {
        match *self {
            Automation::Set { value, .. }
            | Automation::Linear { value, .. }
            | Automation::Exponential { value, .. } => value,
        }
    }
}

/// Ordered automation for a gain parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub steps: Vec<Automation>,
}

impl Envelope {
    /// A gain held at `value` from the start
    pub fn constant(value: f32) -> Self {
        Self::default().set(value, 0.0)
    }

    pub fn set(mut self, value: f32, at: f64) -> Self {
        self.steps.push(Automation::Set { value, at });
        self
    }

    pub fn linear(mut self, value: f32, at: f64) -> Self {
        self.steps.push(Automation::Linear { value, at });
        self
    }

    pub fn exponential(mut self, value: f32, at: f64) -> Self {
        self.steps.push(Automation::Exponential { value, at });
        self
    }

    /// Silent start, linear attack to `peak`
    pub fn attack(peak: f32, attack: f64) -> Self {
        Self::default().set(0.0, 0.0).linear(peak, attack)
    }

    /// Highest value reached anywhere in the envelope
    pub fn peak(&self) -> f32 {
        self.steps
            .iter()
            .map(Automation::value)
            .fold(0.0, f32::max)
    }

    /// Time of the last automation event
    pub fn end(&self) -> f64 {
        self.steps.iter().map(Automation::at).fold(0.0, f64::max)
    }
}

/// Raw sample data for noise sources and convolution impulses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBuffer {
    pub sample_rate: f32,
    /// One `Vec` per channel, all the same length
    pub channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }
}

/// A graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeSpec {
    Oscillator {
        waveform: Waveform,
        frequency: f32,
        start: f64,
        /// `None` runs until the voice is released
        stop: Option<f64>,
    },
    /// One-shot buffer playback
    Noise {
        buffer: SampleBuffer,
        start: f64,
        stop: Option<f64>,
    },
    Filter {
        kind: FilterKind,
        frequency: f32,
        q: f32,
    },
    Gain {
        envelope: Envelope,
    },
    Delay {
        time: f64,
    },
    Convolver {
        impulse: SampleBuffer,
    },
}

impl NodeSpec {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeSpec::Oscillator { .. } => "oscillator",
            NodeSpec::Noise { .. } => "noise",
            NodeSpec::Filter { .. } => "filter",
            NodeSpec::Gain { .. } => "gain",
            NodeSpec::Delay { .. } => "delay",
            NodeSpec::Convolver { .. } => "convolver",
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, NodeSpec::Oscillator { .. } | NodeSpec::Noise { .. })
    }

    /// Scheduled stop time of a source
    pub fn stop_time(&self) -> Option<f64> {
        match self {
            NodeSpec::Oscillator { stop, .. } | NodeSpec::Noise { stop, .. } => *stop,
            _ => None,
        }
    }
}

/// Where an edge lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// The input of another node
    Node(NodeId),
    /// The frequency parameter of an oscillator (FM from an LFO chain)
    Frequency(NodeId),
    /// The voice output bus
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeId,
    pub to: Target,
}

/// A complete voice description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceGraph {
    pub name: String,
    pub nodes: Vec<NodeSpec>,
    pub connections: Vec<Connection>,
}

impl VoiceGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn add(&mut self, node: NodeSpec) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        self.connections.push(Connection {
            from,
            to: Target::Node(to),
        });
    }

    pub fn to_output(&mut self, from: NodeId) {
        self.connections.push(Connection {
            from,
            to: Target::Output,
        });
    }

    /// Chain `nodes` in order
    pub fn chain(&mut self, nodes: &[NodeId]) {
        for pair in nodes.windows(2) {
            self.connect(pair[0], pair[1]);
        }
    }

    pub fn oscillator(&mut self, waveform: Waveform, frequency: f32, stop: Option<f64>) -> NodeId {
        self.add(NodeSpec::Oscillator {
            waveform,
            frequency,
            start: 0.0,
            stop,
        })
    }

    pub fn gain(&mut self, envelope: Envelope) -> NodeId {
        self.add(NodeSpec::Gain { envelope })
    }

    pub fn filter(&mut self, kind: FilterKind, frequency: f32, q: f32) -> NodeId {
        self.add(NodeSpec::Filter { kind, frequency, q })
    }

    /// Add an LFO (oscillator into a depth gain) driving `carrier`'s
    /// frequency. Returns the LFO oscillator.
    pub fn modulate(&mut self, carrier: NodeId, waveform: Waveform, rate: f32, depth: f32) -> NodeId {
        let stop = self.nodes.get(carrier).and_then(NodeSpec::stop_time);
        let lfo = self.oscillator(waveform, rate, stop);
        let depth = self.gain(Envelope::constant(depth));
        self.connect(lfo, depth);
        self.connections.push(Connection {
            from: depth,
            to: Target::Frequency(carrier),
        });
        lfo
    }

    /// Feedback delay: `input` feeds a delay whose output returns to the
    /// bus at `wet` and to itself at `feedback`.
    pub fn feedback_delay(&mut self, input: NodeId, time: f64, wet: f32, feedback: Option<f32>) {
        let delay = self.add(NodeSpec::Delay { time });
        let wet_gain = self.gain(Envelope::constant(wet));
        self.connect(input, delay);
        self.connect(delay, wet_gain);
        self.to_output(wet_gain);
        if let Some(amount) = feedback {
            let loop_gain = self.gain(Envelope::constant(amount));
            self.connect(delay, loop_gain);
            self.connect(loop_gain, delay);
        }
    }

    /// Convolution reverb send from `input`
    pub fn reverb_send(&mut self, input: NodeId, impulse: SampleBuffer, wet: f32) {
        let convolver = self.add(NodeSpec::Convolver { impulse });
        let wet_gain = self.gain(Envelope::constant(wet));
        self.connect(input, convolver);
        self.connect(convolver, wet_gain);
        self.to_output(wet_gain);
    }

    pub fn sources(&self) -> impl Iterator<Item = (NodeId, &NodeSpec)> {
        self.nodes.iter().enumerate().filter(|(_, n)| n.is_source())
    }

    /// Latest scheduled stop among sources, `None` if any source runs
    /// until released
    pub fn duration(&self) -> Option<f64> {
        let mut longest = 0.0f64;
        for (_, node) in self.sources() {
            longest = longest.max(node.stop_time()?);
        }
        Some(longest)
    }

    /// Number of oscillators with the given waveform and frequency
    pub fn count_oscillators(&self, waveform: Waveform, frequency: f32) -> usize {
        self.nodes
            .iter()
            .filter(|n| {
                matches!(n, NodeSpec::Oscillator { waveform: w, frequency: f, .. }
                    if *w == waveform && (*f - frequency).abs() < 1e-3)
            })
            .count()
    }

    /// Check that every edge references real nodes, frequency targets are
    /// oscillators, and the graph reaches the output
    pub fn validate(&self) -> Result<(), AudioError> {
        let n = self.nodes.len();
        let mut reaches_output = false;
        for c in &self.connections {
            if c.from >= n {
                return Err(AudioError::InvalidGraph(format!(
                    "{}: edge from missing node {}",
                    self.name, c.from
                )));
            }
            match c.to {
                Target::Node(id) if id >= n => {
                    return Err(AudioError::InvalidGraph(format!(
                        "{}: edge to missing node {}",
                        self.name, id
                    )));
                }
                Target::Frequency(id) => {
                    if !matches!(self.nodes.get(id), Some(NodeSpec::Oscillator { .. })) {
                        return Err(AudioError::InvalidGraph(format!(
                            "{}: frequency target {} is not an oscillator",
                            self.name, id
                        )));
                    }
                }
                Target::Output => reaches_output = true,
                Target::Node(_) => {}
            }
        }
        if !reaches_output {
            return Err(AudioError::InvalidGraph(format!(
                "{}: nothing reaches the output",
                self.name
            )));
        }
        Ok(())
    }
}
