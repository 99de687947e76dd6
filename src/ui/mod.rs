pub mod canvas;
pub mod rate;
pub mod terminal;

pub use canvas::FieldCanvas;
pub use rate::RateMeter;
pub use terminal::TerminalUI;
