//! Cube arena match server
//!
//! Runs turn-based matches between remote bots inside a cubic grid. Each
//! tick every live bot is asked over HTTP for its decisions, the moves and
//! bombs are applied, and collisions, bombs and boundary exits eliminate
//! players until one or none is left.

pub mod app;
pub mod bot;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
