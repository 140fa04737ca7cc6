pub mod capture;
pub mod config;
pub mod context;
pub mod cycle;
pub mod encounter;
pub mod error;
pub mod farming;
pub mod gateway;
pub mod inventory;
pub mod movement;
pub mod pacing;
pub mod progress;
pub mod session;
pub mod state;
pub mod stats;
pub mod supervisor;
pub mod sweeps;
pub mod types;
