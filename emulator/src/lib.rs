//! Host-side board emulation shared by the interactive emulator and the
//! transcript capture tool.

pub mod sensor;
pub mod session;
