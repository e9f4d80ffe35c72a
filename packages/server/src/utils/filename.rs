/// Image extensions accepted for uploaded media.
const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Extract a lowercase file extension from an upload's original filename.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 16 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Validate that an upload looks like an accepted image.
///
/// Checked by extension and by content sniffing of the magic bytes; both must
/// agree the payload is a JPEG or PNG.
pub fn validate_image_upload(filename: Option<&str>, data: &[u8]) -> Result<String, &'static str> {
    let ext = filename
        .and_then(extension_of)
        .ok_or("file must have a jpeg, jpg, or png extension")?;

    if !ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err("only jpeg, jpg, and png images are supported");
    }

    let sniffed_png = data.starts_with(&[0x89, b'P', b'N', b'G']);
    let sniffed_jpeg = data.starts_with(&[0xFF, 0xD8, 0xFF]);

    match ext.as_str() {
        "png" if sniffed_png => Ok(ext),
        "jpg" | "jpeg" if sniffed_jpeg => Ok(ext),
        _ => Err("file content does not match its extension"),
    }
}
