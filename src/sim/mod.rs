pub mod config;
pub mod discretization;
pub mod error;
pub mod fluid;
pub mod hydraulics;
pub mod kernel;
pub mod linalg;
pub mod output;
pub mod profile;
pub mod reservoir;
pub mod solver;
pub mod special;
pub mod timegrid;
