pub mod threaded_classification_executor;
