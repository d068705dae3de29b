//! Mock devices, transports and encoders shared by the workspace's tests.
//!

pub mod encoder;
pub mod graphics;
pub mod logger;
pub mod transport;
