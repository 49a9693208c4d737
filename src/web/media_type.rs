/// Fallback for bytes we cannot identify; results are stored with a `.jpg` name.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Picks a `Content-Type` for stored image bytes by sniffing their magic number.
/// The service may hand back PNG even though results are saved as `.jpg`.
pub fn sniff_image_mime(data: &[u8]) -> &'static str {
    image::guess_format(data)
        .map(|format| format.to_mime_type())
        .unwrap_or(DEFAULT_IMAGE_MIME)
}
