//! Sound recipes
//!
//! Every sound the game makes, as a [`VoiceGraph`]. Recipes that need
//! noise or an impulse response take the output sample rate and an RNG.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::graph::{Envelope, FilterKind, NodeId, NodeSpec, VoiceGraph, Waveform};
use super::impulse::{reverb_impulse, white_noise};

/// E minor pentatonic, E4 to D6
pub const SHOOT_NOTES: [f32; 10] = [
    329.63, 392.00, 440.00, 493.88, 587.33, 659.25, 783.99, 880.00, 987.77, 1174.66,
];

/// C major arpeggio, C4 E4 G4 C5
pub const FANFARE_NOTES: [f32; 4] = [261.63, 329.63, 392.00, 523.25];

const SHOOT_DURATION: f64 = 0.4;
const SHOOT_ATTACK: f64 = 0.005;
const SHOOT_DECAY: f64 = 0.08;
const PICK_NOISE_SECS: f64 = 0.02;
/// Envelopes fall to this level rather than to zero (exponential ramps)
const FLOOR: f32 = 0.01;

const FANFARE_SPACING: f64 = 0.15;
const FANFARE_NOTE_SECS: f64 = 0.8;

/// Biquad default Q
const DEFAULT_Q: f32 = 1.0;

/// Engine timbres for vertical movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineTimbre {
    Aircraft,
    Car,
    Tractor,
    Train,
    Motorcycle,
}

impl EngineTimbre {
    pub const ALL: [EngineTimbre; 5] = [
        EngineTimbre::Aircraft,
        EngineTimbre::Car,
        EngineTimbre::Tractor,
        EngineTimbre::Train,
        EngineTimbre::Motorcycle,
    ];

    /// Uniform pick
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineTimbre::Aircraft => "aircraft",
            EngineTimbre::Car => "car",
            EngineTimbre::Tractor => "tractor",
            EngineTimbre::Train => "train",
            EngineTimbre::Motorcycle => "motorcycle",
        }
    }
}

/// Plucked-string shot: fundamental, three partials, a pick transient and
/// a sub-octave layer
pub fn shoot<R: Rng + ?Sized>(frequency: f32, sample_rate: f32, rng: &mut R) -> VoiceGraph {
    let mut g = VoiceGraph::new(format!("shoot {frequency:.2}Hz"));
    let d = SHOOT_DURATION;
    let knee = SHOOT_ATTACK + SHOOT_DECAY;

    // (waveform, multiple, peak, sustain, length)
    let partials = [
        (Waveform::Triangle, 1.0, 0.25, 0.12, d),
        (Waveform::Sine, 2.0, 0.12, 0.06, d),
        (Waveform::Sine, 3.0, 0.08, 0.04, d * 0.8),
        (Waveform::Sine, 4.0, 0.05, 0.025, d * 0.7),
    ];
    for (waveform, multiple, peak, sustain, length) in partials {
        let osc = g.oscillator(waveform, frequency * multiple, Some(length));
        let env = Envelope::attack(peak, SHOOT_ATTACK)
            .exponential(sustain, knee)
            .exponential(FLOOR, length);
        let gain = g.gain(env);
        g.connect(osc, gain);
        g.to_output(gain);
    }

    let noise = g.add(NodeSpec::Noise {
        buffer: white_noise(rng, sample_rate, PICK_NOISE_SECS),
        start: 0.0,
        stop: Some(PICK_NOISE_SECS),
    });
    let band = g.filter(FilterKind::Bandpass, frequency * 2.0, 5.0);
    let noise_gain = g.gain(Envelope::constant(0.08).exponential(FLOOR, PICK_NOISE_SECS));
    g.chain(&[noise, band, noise_gain]);
    g.to_output(noise_gain);

    let low_len = d * 0.6;
    let low = g.oscillator(Waveform::Sawtooth, frequency * 0.5, Some(low_len));
    let low_filter = g.filter(FilterKind::Lowpass, 300.0, DEFAULT_Q);
    let low_gain = g.gain(
        Envelope::attack(0.06, SHOOT_ATTACK)
            .exponential(0.03, knee)
            .exponential(FLOOR, low_len),
    );
    g.chain(&[low, low_filter, low_gain]);
    g.to_output(low_gain);

    g
}

/// Rising arpeggio played when a session starts
pub fn game_start() -> VoiceGraph {
    let mut g = VoiceGraph::new("game start");
    for (i, &freq) in FANFARE_NOTES.iter().enumerate() {
        let start = i as f64 * FANFARE_SPACING;
        let end = start + FANFARE_NOTE_SECS;
        let osc = g.add(NodeSpec::Oscillator {
            waveform: Waveform::Sine,
            frequency: freq,
            start,
            stop: Some(end),
        });
        let gain = g.gain(
            Envelope::default()
                .set(0.0, start)
                .linear(0.15, start + 0.05)
                .exponential(0.08, start + 0.2)
                .exponential(FLOOR, end),
        );
        g.connect(osc, gain);
        g.to_output(gain);
    }
    g
}

/// Clicking gear loop for horizontal movement
pub fn gear() -> VoiceGraph {
    let mut g = VoiceGraph::new("gear");
    let osc = g.oscillator(Waveform::Square, 150.0, None);
    g.modulate(osc, Waveform::Square, 15.0, 80.0);
    let gain = g.gain(Envelope::attack(0.08, 0.05));
    g.connect(osc, gain);
    g.to_output(gain);
    g
}

/// Main engine body shared by every timbre: carrier with LFO wobble into a
/// filter and an attack envelope. Returns the envelope gain.
fn engine_body(
    g: &mut VoiceGraph,
    waveform: Waveform,
    frequency: f32,
    lfo: (Waveform, f32, f32),
    filter: (FilterKind, f32, f32),
    level: f32,
    attack: f64,
) -> NodeId {
    let osc = g.oscillator(waveform, frequency, None);
    g.modulate(osc, lfo.0, lfo.1, lfo.2);
    let f = g.filter(filter.0, filter.1, filter.2);
    let gain = g.gain(Envelope::attack(level, attack));
    g.chain(&[osc, f, gain]);
    g.to_output(gain);
    gain
}

/// Looping engine for vertical movement
pub fn engine<R: Rng + ?Sized>(timbre: EngineTimbre, sample_rate: f32, rng: &mut R) -> VoiceGraph {
    let mut g = VoiceGraph::new(format!("engine {}", timbre.as_str()));
    match timbre {
        EngineTimbre::Aircraft => {
            let body = engine_body(
                &mut g,
                Waveform::Sawtooth,
                150.0,
                (Waveform::Sine, 8.0, 25.0),
                (FilterKind::Bandpass, 800.0, 2.0),
                0.12,
                0.15,
            );
            g.feedback_delay(body, 0.15, 0.4, Some(0.3));
        }
        EngineTimbre::Car => {
            let body = engine_body(
                &mut g,
                Waveform::Square,
                100.0,
                (Waveform::Triangle, 12.0, 30.0),
                (FilterKind::Lowpass, 400.0, 5.0),
                0.15,
                0.12,
            );
            g.reverb_send(body, reverb_impulse(rng, sample_rate, 1.5, 0.6), 0.5);
        }
        EngineTimbre::Tractor => {
            let body = engine_body(
                &mut g,
                Waveform::Sawtooth,
                60.0,
                (Waveform::Square, 4.0, 20.0),
                (FilterKind::Lowpass, 200.0, 8.0),
                0.18,
                0.2,
            );
            let bass = g.oscillator(Waveform::Sine, 40.0, None);
            let bass_filter = g.filter(FilterKind::Lowpass, 120.0, DEFAULT_Q);
            let bass_gain = g.gain(Envelope::attack(0.12, 0.2));
            g.chain(&[bass, bass_filter, bass_gain]);
            g.to_output(bass_gain);
            g.feedback_delay(body, 0.25, 0.3, None);
        }
        EngineTimbre::Train => {
            let body = engine_body(
                &mut g,
                Waveform::Sawtooth,
                45.0,
                (Waveform::Sine, 2.5, 12.0),
                (FilterKind::Lowpass, 150.0, 10.0),
                0.2,
                0.25,
            );
            let sub = g.oscillator(Waveform::Sine, 30.0, None);
            let sub_gain = g.gain(Envelope::attack(0.15, 0.25));
            g.connect(sub, sub_gain);
            g.to_output(sub_gain);
            g.reverb_send(body, reverb_impulse(rng, sample_rate, 3.0, 0.7), 0.6);
        }
        EngineTimbre::Motorcycle => {
            let body = engine_body(
                &mut g,
                Waveform::Sawtooth,
                120.0,
                (Waveform::Square, 15.0, 40.0),
                (FilterKind::Bandpass, 600.0, 4.0),
                0.14,
                0.08,
            );
            let harmonic = g.oscillator(Waveform::Square, 240.0, None);
            let harmonic_filter = g.filter(FilterKind::Highpass, 1000.0, DEFAULT_Q);
            let harmonic_gain = g.gain(Envelope::attack(0.08, 0.08));
            g.chain(&[harmonic, harmonic_filter, harmonic_gain]);
            g.to_output(harmonic_gain);
            g.feedback_delay(body, 0.1, 0.35, None);
            g.feedback_delay(body, 0.18, 0.25, None);
        }
    }
    g
}

/// Steady background bed: low tone, wobbling lead, soft pad
pub fn background_bed() -> VoiceGraph {
    let mut g = VoiceGraph::new("background bed");

    let kick = g.oscillator(Waveform::Sine, 150.0, None);
    let kick_gain = g.gain(Envelope::constant(0.3));
    g.connect(kick, kick_gain);
    g.to_output(kick_gain);

    let lead = g.oscillator(Waveform::Sawtooth, 440.0, None);
    g.modulate(lead, Waveform::Sine, 0.5, 100.0);
    let lead_gain = g.gain(Envelope::constant(0.08));
    g.connect(lead, lead_gain);
    g.to_output(lead_gain);

    let pad = g.oscillator(Waveform::Triangle, 220.0, None);
    let pad_gain = g.gain(Envelope::constant(0.05));
    g.connect(pad, pad_gain);
    g.to_output(pad_gain);

    g
}

/// Short confirmation blip played when audio unlocks
pub fn unlock_chirp() -> VoiceGraph {
    tone("unlock chirp", 800.0, 0.15, 0.01, 0.2)
}

/// Diagnostic A4 tone
pub fn test_tone() -> VoiceGraph {
    tone("test tone", 440.0, 0.4, 0.05, 0.5)
}

fn tone(name: &str, frequency: f32, peak: f32, attack: f64, length: f64) -> VoiceGraph {
    let mut g = VoiceGraph::new(name);
    let osc = g.oscillator(Waveform::Sine, frequency, Some(length));
    let gain = g.gain(Envelope::attack(peak, attack).exponential(FLOOR, length));
    g.connect(osc, gain);
    g.to_output(gain);
    g
}
