pub mod config_file;
pub mod connection;
pub mod state;
