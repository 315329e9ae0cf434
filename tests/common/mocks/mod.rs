pub mod mock_network;
pub mod mock_notifier;
pub mod mock_remote;

pub use mock_network::*;
pub use mock_notifier::*;
pub use mock_remote::*;
