//! Integration tests for the timetabler schedule generation system

mod cli_route;
mod config_integration;
mod generation_flow;
mod test_utils;
