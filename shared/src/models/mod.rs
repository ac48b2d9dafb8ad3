//! Domain models for the Weather Dashboard

mod forecast;
mod location;
mod notification;
mod weather;

pub use forecast::*;
pub use location::*;
pub use notification::*;
pub use weather::*;
