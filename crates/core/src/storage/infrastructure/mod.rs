pub mod file_blob_store;
pub mod sqlite_result_store;
