#![doc = "Monotonic FILETIME tick source: platform wall clocks and a strictly increasing generator."]

pub mod clock;
pub mod generator;

pub use clock::*;
pub use generator::*;
