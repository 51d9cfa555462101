pub mod connection;
pub mod initiation;
pub mod provisioning;
pub mod views;
