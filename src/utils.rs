//! Utility functions for path manipulation

use std::path::Path;

/// Create an image id from the path a frame is stored under in CVAT
///
/// The last dot-delimited extension is removed; directories are kept so the id stays
/// unique across tasks as long as the stored paths are. A path without any dot is
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use cvat_dl::utils::image_path_to_image_id;
///
/// assert_eq!(image_path_to_image_id("dir/img.png"), "dir/img");
/// assert_eq!(image_path_to_image_id("scan.v2.tar.jpg"), "scan.v2.tar");
/// ```
pub fn image_path_to_image_id(image_path: &str) -> &str {
    match image_path.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => image_path,
    }
}

/// Final `/`-separated segment of a stored frame path
///
/// # Examples
///
/// ```
/// use cvat_dl::utils::file_name_from_path;
///
/// assert_eq!(file_name_from_path("dir/img.png"), "img.png");
/// assert_eq!(file_name_from_path("img.png"), "img.png");
/// ```
pub fn file_name_from_path(image_path: &str) -> &str {
    image_path.rsplit('/').next().unwrap_or(image_path)
}

/// Check if an archive member is an image based on its extension
///
/// # Arguments
/// * `path` - Member name or file path to check
/// * `image_extensions` - Extensions treated as images (without dots, any case)
///
/// # Returns
/// `true` if the extension matches one of the configured image extensions.
/// Directory entries (trailing `/`) never match.
pub fn is_image(path: &str, image_extensions: &[String]) -> bool {
    if path.ends_with('/') {
        return false;
    }
    match Path::new(path).extension() {
        Some(ext) => {
            let ext_str = ext.to_string_lossy().to_lowercase();
            image_extensions
                .iter()
                .any(|ie| ie.to_lowercase() == ext_str)
        }
        None => false,
    }
}
