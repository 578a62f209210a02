pub mod client;
pub mod error;
pub mod poller;
pub mod terminal;
pub mod view;

pub use client::{LogClient, LogSource};
pub use error::MonitorError;
pub use poller::{Poller, PollerHandle};
pub use view::LogView;
