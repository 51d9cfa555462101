pub mod admin_log;
pub mod logging;
pub mod path_resolver;
