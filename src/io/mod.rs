// Purpose - key layout in, audio out

pub mod keys;
pub mod output;

pub use keys::KeyScanner;
pub use output::{AudioSink, BufferSink, DeviceOutput};
