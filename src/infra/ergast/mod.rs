pub mod client;

pub use client::ErgastClient;
