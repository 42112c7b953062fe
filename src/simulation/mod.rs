pub mod config;
pub mod controller;
pub mod engines;
pub mod events;
pub mod id;
pub mod logging;
pub mod network;
pub mod parking;
pub mod random;
pub mod vehicles;
