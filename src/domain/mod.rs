// Domain layer: data models, recipe registry and ports (interfaces).

pub mod model;
pub mod ports;
pub mod recipe;
