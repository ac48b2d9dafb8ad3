//! HTTP handlers

pub mod alerts;
pub mod favorites;
pub mod health;
pub mod notification;
pub mod weather;

pub use alerts::*;
pub use favorites::*;
pub use health::*;
pub use notification::*;
pub use weather::*;
