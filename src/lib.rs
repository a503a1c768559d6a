//! City Traffic Simulation Library
//!
//! A grid-based city traffic simulation: vehicles route with A*, obey
//! one-way lanes and traffic lights, and are retired when they arrive.

pub mod simulation;
