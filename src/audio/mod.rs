pub mod analysis;
pub mod clip;
pub mod decode;
pub mod features;
