pub mod report_importer;
