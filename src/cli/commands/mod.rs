//! CLI command implementations.

pub mod init;
pub mod installation;
pub mod push;
pub mod resync;
pub mod status;
pub mod worker;
