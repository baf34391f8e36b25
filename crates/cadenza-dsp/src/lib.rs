#![deny(unsafe_op_in_unsafe_fn)]

pub mod buffer;
pub mod delay;
pub mod filter;
pub mod gain;
pub mod pan;
pub mod reverb;
pub mod utils;

pub use buffer::SampleBuffer;
pub use delay::DelayLine;
pub use filter::OnePole;
pub use reverb::{AllpassFilter, CombFilter};
