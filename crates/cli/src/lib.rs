//! Console front end for the dual-edition AFK bot.

pub mod app;
pub mod cli;
pub mod console;
pub mod logging;
pub mod signal;
pub mod styles;
