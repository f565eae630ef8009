pub mod geom;
pub mod sim;
pub mod vecutils;

// Prelude
pub use geom::point::Point;
pub use geom::vector::Vector;
pub use geom::wireframe::Wireframe;
pub use sim::config::SbtConfig;
pub use sim::error::{SbtError, SimWarning};
pub use sim::reservoir::{ReservoirGeometry, SbtReservoir, SimulationResult};
