// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

pub mod catalog;
pub mod location;
pub mod locations;
pub mod patch;
pub mod tables;
