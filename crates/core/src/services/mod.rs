mod classifier;
mod collector;

pub use classifier::*;
pub use collector::*;
