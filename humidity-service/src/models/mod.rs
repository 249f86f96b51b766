pub mod reading;

pub use reading::{HumidityReading, HumidityResponse};
