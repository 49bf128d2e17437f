pub mod config;
pub mod describe;
pub mod exec;
pub mod import_db;
pub mod import_files;
pub mod list;
pub mod logs;
pub mod offline;
pub mod remove;
pub mod restart;
pub mod start;
pub mod stop;
