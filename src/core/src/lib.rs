pub mod capture;
pub mod configuration;
pub mod controller;
pub mod delivery;
pub mod error_handling;
pub mod network;
pub mod session_management;
pub mod storage;
