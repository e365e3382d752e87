pub mod backup_run_repo;
pub mod table_dump_repo;

pub use backup_run_repo::BackupRunRepo;
pub use table_dump_repo::TableDumpRepo;
