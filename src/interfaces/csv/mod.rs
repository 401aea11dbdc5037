pub mod catalog_reader;
pub mod script_reader;
