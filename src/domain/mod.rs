// Domain layer: booking models and the store ports. No I/O here.

pub mod model;
pub mod ports;
