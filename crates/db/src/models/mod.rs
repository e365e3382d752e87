pub mod backup_run;
