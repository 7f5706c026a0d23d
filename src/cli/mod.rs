pub mod app;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod logs;
pub mod output;
pub mod predict;
pub mod runtime;
pub mod status;
pub mod watch;
