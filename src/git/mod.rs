mod client;

pub use client::GitClient;
