pub mod config;
pub mod logging;

pub mod dispatcher;
pub mod executor;
pub mod intake;
pub mod notify;
pub mod request;
pub mod tools;
