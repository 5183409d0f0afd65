pub mod address;
pub mod breakpoint;
pub mod control;
pub mod debugger;
pub mod handler;
pub mod line;
pub mod module;
pub mod session;
pub mod thread;
