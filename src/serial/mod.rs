// Serial transport and its mock counterpart

pub mod comm;
pub mod mock;

pub use comm::{list_ports, SerialConfig, SerialError, SerialPort};
pub use mock::MockTransport;
