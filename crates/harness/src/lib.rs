pub mod client;
pub mod flaky;
pub mod network;

pub use client::TestClient;
pub use flaky::{FlakyStore, JournalEntry};
pub use network::TestNetwork;
