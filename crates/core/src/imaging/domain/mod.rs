pub mod image_normalizer;
