// Shared tuning constants for the sound engine. Times are seconds on the
// audio clock, levels are linear gain, frequencies are Hz.

// Master bus
pub const MASTER_LEVEL: f32 = 0.6; // full (unmuted) master gain
pub const MUTE_RAMP_SECS: f64 = 0.15; // fade window for mute/unmute

// Exponential ramps cannot reach zero; envelopes decay to this instead
pub const SILENCE: f32 = 0.0001;

// Drone
pub const DRONE_MIDI: f32 = 45.0; // A2
pub const DRONE_LEVEL: f32 = 0.05;
pub const DRONE_FADE_IN_SECS: f64 = 4.0;
pub const DRONE_LFO_HZ: f32 = 0.08; // ~12 s wobble period
pub const DRONE_LFO_DEPTH_HZ: f32 = 1.5;
pub const DRONE_RELEASE_SECS: f64 = 0.15;

// Melody
pub const MELODY_ROOT_MIDI: i32 = 57; // A3
pub const MELODY_OCTAVES: i32 = 3;
pub const MELODY_NOTE_MIN_SECS: f64 = 2.0;
pub const MELODY_NOTE_MAX_SECS: f64 = 5.0;
pub const MELODY_INTERVAL_MIN_SECS: f64 = 2.5;
pub const MELODY_INTERVAL_MAX_SECS: f64 = 5.0;
pub const MELODY_LEVEL: f32 = 0.06;
pub const MELODY_VIBRATO_HZ: f32 = 4.5;
pub const MELODY_VIBRATO_DEPTH_HZ: f32 = 2.0;
pub const ECHO_DELAY_SECS: f64 = 0.35;
pub const ECHO_LEVEL_RATIO: f32 = 0.35; // echo level relative to the note

// Scheduling lead so nodes never start in the past
pub const SCHEDULE_LEAD_SECS: f64 = 0.005;

// A natural minor pentatonic, in semitones from the root
pub const MINOR_PENTATONIC: &[i32] = &[0, 3, 5, 7, 10];
