// Purpose: parameters, the monophonic voice and what drives it.
// Sits between the DSP primitives and the audio engine thread.

pub mod controller;
pub mod message;
pub mod params;
pub mod store;
pub mod voice;

pub use controller::VoiceController;
pub use message::{InputEventSource, Key, KeyEvent, ScriptedInput};
pub use params::{DelaySettings, SynthParameters};
pub use store::{ParamSnapshot, ParameterStore};
pub use voice::{Voice, VoiceState};
