pub mod add;
pub mod backup;
pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod log;
pub mod migrate;
pub mod normalize_techs;
pub mod project;
pub mod rename;
pub mod stats;
pub mod techs;
pub mod update;
