pub mod contract;
pub mod error;
pub mod local;
pub mod remote;
pub mod transport;
pub mod wrapper;

pub use local::LocalBlackboard;
pub use remote::RemoteBlackboard;
pub use transport::InProcessTransport;
pub use wrapper::BlackboardWrapper;
