pub mod poller;
pub mod rpc;
