pub mod exif_image_normalizer;
