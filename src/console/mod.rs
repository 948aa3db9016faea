mod command;
mod console;

pub use console::run_console;
