/// Registry that matches responses to the calls waiting for them
pub mod correlator;
/// TCP connection plus the task that frames its receive side
pub mod endpoint;
/// Callbacks for connection state changes
pub mod listener;
/// Typed request API built on a framer, a correlator and an endpoint
pub mod master;

pub use correlator::{Correlator, Delivery, PendingCall};
pub use endpoint::{Endpoint, EndpointHandler};
pub use listener::{ConnectionState, Listener, NullListener};
pub use master::{AsciiMaster, Master, MasterConfig, Reply, RtuMaster, TcpMaster};
