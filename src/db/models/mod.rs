pub mod reading;

pub use reading::{Acceleration, Reading, Rgb};
