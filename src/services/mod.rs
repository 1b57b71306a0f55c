//! Business logic services

pub mod osrm;
