//! Status dashboard

pub mod server;

pub use server::DashboardServer;
