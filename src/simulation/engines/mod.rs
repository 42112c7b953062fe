pub mod network_engine;
