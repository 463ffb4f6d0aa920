mod metric_sink;
mod tx_source;

pub use metric_sink::*;
pub use tx_source::*;
