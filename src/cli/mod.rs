//! Terminal front end
//!
//! - `Console` - colored terminal output and line input
//! - `ToolSession` - REPL, script runner and the tool-call trace

mod console;
mod session;

pub use console::Console;
pub use session::{envelope, parse_args, parse_line, preview, ReplCommand, ToolSession};
