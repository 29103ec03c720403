#[path = "common/mod.rs"]
mod common;

#[path = "tools/capabilities.rs"]
mod capabilities;
#[path = "tools/fsm.rs"]
mod fsm;
#[path = "tools/wire.rs"]
mod wire;
#[path = "tools/draw_area.rs"]
mod draw_area;
#[path = "tools/edits.rs"]
mod edits;
#[path = "tools/placement.rs"]
mod placement;
#[path = "tools/select.rs"]
mod select;
