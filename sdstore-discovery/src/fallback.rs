//! Built-in image to check mapping, used when no user template exists.

/// Known container images and the check that monitors them.
pub const IMAGE_AND_CHECK: &[(&str, &str)] = &[
    ("redis", "redisdb"),
    ("nginx", "nginx"),
    ("mongo", "mongo"),
];

/// Default check name for an image, if the image is known.
pub fn check_for_image(image: &str) -> Option<&'static str> {
    IMAGE_AND_CHECK
        .iter()
        .find(|(known, _)| *known == image)
        .map(|(_, check)| *check)
}
