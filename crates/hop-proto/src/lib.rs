pub mod command;
pub mod geom;
pub mod telemetry;

pub use command::{Command, Direction, ParseCommandError};
pub use geom::{Offset, Position};
