#![doc = include_str!("../README.md")]

mod shared;
pub use shared::*;

mod message;
pub use message::*;

mod collector;
pub use collector::*;
