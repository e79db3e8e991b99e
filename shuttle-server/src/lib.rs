//! Campus shuttle trip planner server.
//!
//! A web application that answers: "which shuttle do I take from here to
//! there, and when does the next one reach my stop?"

pub mod cache;
pub mod domain;
pub mod eta;
pub mod geo;
pub mod graph;
pub mod gtfs;
pub mod passio;
pub mod planner;
pub mod reconcile;
pub mod shape;
pub mod web;
