pub mod generation;
pub mod simulation;
