// Domain layer: models and ports. No process or network code lives here.

pub mod model;
pub mod ports;
