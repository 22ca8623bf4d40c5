pub mod buffer;
pub mod loudness;
pub mod sampler;
pub mod transport;
pub mod visualizer;
pub mod worker;
