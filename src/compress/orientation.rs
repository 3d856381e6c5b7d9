use image::DynamicImage;
use std::io::Cursor;

/// EXIFのOrientationタグを読む（1〜8、なければ None）
pub fn read_orientation(bytes: &[u8]) -> Option<u32> {
    let exif_reader = exif::Reader::new();
    let exif = exif_reader.read_from_container(&mut Cursor::new(bytes)).ok()?;

    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0).filter(|v| (1..=8).contains(v))
}

/// Orientationに従って正立させる
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// EXIFがあれば適用
pub fn upright(image: DynamicImage, bytes: &[u8]) -> DynamicImage {
    match read_orientation(bytes) {
        Some(o) if o != 1 => {
            log::debug!("EXIF orientation {} を適用", o);
            apply_orientation(image, o)
        }
        _ => image,
    }
}
