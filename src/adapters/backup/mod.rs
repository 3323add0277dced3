pub mod backup_manager;
