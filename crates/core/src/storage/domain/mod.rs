pub mod blob_store;
pub mod result_store;
