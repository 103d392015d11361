use crate::error::AppError;
use crate::metadata::{
    AssetHandle, AssetKind, AssetMetadata, ContainerMetadata, PrimaryAsset, UNRESOLVED,
};
use exif::{In, Reader, Tag, Value};
use std::io::Cursor;

pub const MAKER_KEYS: &[&str] = &["com.apple.quicktime.make", "\u{a9}mak"];
pub const MODEL_KEYS: &[&str] = &["com.apple.quicktime.model", "\u{a9}mod"];

/// Maker inferred for an edited, composable native clip.
const EDITED_CLIP_MAKER: &str = "Apple";

const HEIF_BRANDS: &[&[u8]] = &[
    b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1", b"avif",
];
const QUICKTIME_TOP_LEVEL_ATOMS: &[&[u8]] = &[b"moov", b"mdat", b"wide", b"free", b"skip", b"pnot"];
const EBML_MAGIC: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3];
const MPEG_PS_PACK: &[u8] = &[0x00, 0x00, 0x01, 0xBA];
const ASF_GUID_PREFIX: &[u8] = &[0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoded {
    Still { header_dimensions: Option<(u32, u32)> },
    Video,
}

#[derive(Debug, Default)]
struct ExifFields {
    lens_model: Option<String>,
    lens_maker: Option<String>,
    exif_date: Option<String>,
    offset_time: Option<String>,
    pixel_width: Option<i32>,
    pixel_height: Option<i32>,
}

pub fn extract(
    handle: &AssetHandle,
    album_name: &str,
    primary: &PrimaryAsset,
    container: &ContainerMetadata,
) -> Result<AssetMetadata, AppError> {
    let decoded = decode(&primary.data).ok_or_else(|| AppError::AssetDecode {
        id: handle.id.clone(),
        reason: "not a recognised still-image or video container".to_string(),
    })?;
    log::trace!("Decoded {} as {:?}", handle.id, decoded);

    let (kind, exif, header_dimensions) = match decoded {
        Decoded::Still { header_dimensions } => {
            (AssetKind::Photo, read_exif(&primary.data), header_dimensions)
        }
        Decoded::Video => (AssetKind::Video, None, None),
    };

    let (container_maker, container_model) = container_lens(container);
    let exif = match exif {
        Some(exif) => exif,
        None => {
            log::debug!("No EXIF data found for {}, using container metadata", handle.id);
            ExifFields::default()
        }
    };

    let lens_maker = exif.lens_maker.or(container_maker);
    let lens_model = exif.lens_model.or(container_model);
    let (header_width, header_height) = match header_dimensions {
        Some((width, height)) => (i32::try_from(width).ok(), i32::try_from(height).ok()),
        None => (None, None),
    };

    let resource = primary.resources.first();
    let filename = resource
        .map(|r| r.original_filename.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let metadata = AssetMetadata {
        id: handle.id.clone(),
        filename: or_unresolved(filename),
        kind,
        creation_date: handle.creation_date,
        exif_date: or_unresolved(exif.exif_date),
        offset_time: or_unresolved(exif.offset_time),
        lens_model: or_unresolved(lens_model),
        lens_maker: or_unresolved(lens_maker),
        pixel_width: exif.pixel_width.or(header_width).unwrap_or(0),
        pixel_height: exif.pixel_height.or(header_height).unwrap_or(0),
        size_bytes: resource.map(|r| r.file_size).unwrap_or(0),
        is_favorite: handle.is_favorite,
        album_name: album_name.to_string(),
        content_hash: String::new(),
    };
    log::trace!("Extracted metadata for {}: {:?}", handle.id, metadata);
    Ok(metadata)
}

fn or_unresolved(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNRESOLVED.to_string())
}

fn decode(data: &[u8]) -> Option<Decoded> {
    if let Some(dimensions) = still_image_dimensions(data) {
        return Some(Decoded::Still {
            header_dimensions: Some(dimensions),
        });
    }
    if ftyp_brand(data).map_or(false, |brand| HEIF_BRANDS.contains(&brand)) {
        return Some(Decoded::Still {
            header_dimensions: None,
        });
    }
    if is_video_container(data) {
        return Some(Decoded::Video);
    }
    None
}

fn still_image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn ftyp_brand(data: &[u8]) -> Option<&[u8]> {
    if data.len() >= 12 && &data[4..8] == b"ftyp" {
        Some(&data[8..12])
    } else {
        None
    }
}

fn is_video_container(data: &[u8]) -> bool {
    if ftyp_brand(data).is_some() {
        return true;
    }
    if data.len() >= 8 && QUICKTIME_TOP_LEVEL_ATOMS.contains(&&data[4..8]) {
        return true;
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"AVI " {
        return true;
    }
    data.starts_with(EBML_MAGIC) || data.starts_with(MPEG_PS_PACK) || data.starts_with(ASF_GUID_PREFIX)
}

fn read_exif(data: &[u8]) -> Option<ExifFields> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;
    Some(ExifFields {
        lens_model: string_field(&exif, Tag::LensModel),
        lens_maker: string_field(&exif, Tag::LensMake),
        exif_date: string_field(&exif, Tag::DateTimeOriginal),
        offset_time: string_field(&exif, Tag::OffsetTime),
        pixel_width: dimension_field(&exif, Tag::PixelXDimension),
        pixel_height: dimension_field(&exif, Tag::PixelYDimension),
    })
}

fn string_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => values
            .first()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .map(|s| s.trim_end_matches('\0').trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn dimension_field(exif: &exif::Exif, tag: Tag) -> Option<i32> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Long(values) => values.first().and_then(|&v| i32::try_from(v).ok()),
        Value::Short(values) => values.first().map(|&v| i32::from(v)),
        _ => None,
    }
}

/// Maker and model from container tags. An edited composable clip counts as
/// captured by the device unless an explicit maker tag says otherwise.
fn container_lens(container: &ContainerMetadata) -> (Option<String>, Option<String>) {
    let mut maker = None;
    if container.composable && container.adjusted {
        maker = Some(EDITED_CLIP_MAKER.to_string());
    }
    if let Some(value) = container.value_of(MAKER_KEYS) {
        maker = Some(value.to_string());
    }
    let model = container.value_of(MODEL_KEYS).map(str::to_string);
    (maker, model)
}
