#[path = "common/mod.rs"]
mod common;

#[path = "build/approvals.rs"]
mod approvals;
#[path = "build/bus.rs"]
mod bus;
#[path = "build/drc.rs"]
mod drc;
#[path = "build/planes.rs"]
mod planes;
