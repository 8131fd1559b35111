pub mod builder;
pub mod cli;
pub mod config;
pub mod consts;
pub mod crds;
pub mod defaults;
pub mod main_actions;
pub mod merge;
pub mod operator;
pub mod reconciler;
pub mod registry;
pub mod store;
pub mod utils;
