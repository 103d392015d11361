use crate::metadata::MetadataItem;
use std::io::{self, Read, Seek, SeekFrom};

const DATA_TYPE_UTF8: u32 = 1;
const MAX_MOOV_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QuickTimeMetadata {
    pub items: Vec<MetadataItem>,
    pub track_count: usize,
}

struct Atom<'a> {
    kind: [u8; 4],
    body: &'a [u8],
}

struct Atoms<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for Atoms<'a> {
    type Item = Atom<'a>;

    fn next(&mut self) -> Option<Atom<'a>> {
        if self.data.len() < 8 {
            return None;
        }
        let declared = read_u32(self.data, 0)? as u64;
        let kind = [self.data[4], self.data[5], self.data[6], self.data[7]];
        let (header, size) = match declared {
            0 => (8, self.data.len() as u64),
            1 => (16, read_u64(self.data, 8)?),
            size => (8, size),
        };
        if size < header as u64 || size > self.data.len() as u64 {
            self.data = &[];
            return None;
        }
        let size = size as usize;
        let body = &self.data[header..size];
        self.data = &self.data[size..];
        Some(Atom { kind, body })
    }
}

fn atoms(data: &[u8]) -> Atoms<'_> {
    Atoms { data }
}

fn child<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<&'a [u8]> {
    atoms(data).find(|atom| &atom.kind == kind).map(|atom| atom.body)
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}

/// Walks the top-level atom headers and reads only the `moov` body.
/// Returns `None` when there is no complete `moov` atom.
pub fn read_metadata<R: Read + Seek>(reader: &mut R) -> io::Result<Option<QuickTimeMetadata>> {
    Ok(find_moov(reader)?.map(|moov| read_movie(&moov)))
}

fn find_moov<R: Read + Seek>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let end = reader.seek(SeekFrom::End(0))?;
    let mut offset = reader.seek(SeekFrom::Start(0))?;

    while end - offset >= 8 {
        let mut header = [0u8; 8];
        reader.read_exact(&mut header)?;
        let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let kind = [header[4], header[5], header[6], header[7]];
        let (header_len, size) = match declared {
            0 => (8, end - offset),
            1 => {
                if end - offset < 16 {
                    return Ok(None);
                }
                let mut large = [0u8; 8];
                reader.read_exact(&mut large)?;
                (16, u64::from_be_bytes(large))
            }
            size => (8, size),
        };
        if size < header_len || size > end - offset {
            return Ok(None);
        }

        if &kind == b"moov" {
            let body_len = size - header_len;
            if body_len > MAX_MOOV_SIZE {
                log::warn!("Skipping oversized moov atom of {} bytes", body_len);
                return Ok(None);
            }
            let mut body = vec![0u8; body_len as usize];
            reader.read_exact(&mut body)?;
            return Ok(Some(body));
        }
        offset = reader.seek(SeekFrom::Start(offset + size))?;
    }
    Ok(None)
}

fn read_movie(moov: &[u8]) -> QuickTimeMetadata {
    let mut metadata = QuickTimeMetadata {
        track_count: atoms(moov).filter(|atom| &atom.kind == b"trak").count(),
        ..Default::default()
    };

    if let Some(meta) = child(moov, b"meta") {
        metadata.items.extend(read_meta(meta));
    }
    if let Some(udta) = child(moov, b"udta") {
        metadata.items.extend(read_user_data_text(udta));
        if let Some(meta) = child(udta, b"meta") {
            metadata.items.extend(read_meta(meta));
        }
    }
    log::trace!(
        "QuickTime metadata: {} items, {} tracks",
        metadata.items.len(),
        metadata.track_count
    );
    metadata
}

/// QuickTime `meta` atoms start straight with children, ISO ones carry a
/// version/flags word first.
fn meta_children(meta: &[u8]) -> &[u8] {
    if meta.len() >= 8 && &meta[4..8] == b"hdlr" {
        meta
    } else {
        meta.get(4..).unwrap_or(&[])
    }
}

fn read_meta(meta: &[u8]) -> Vec<MetadataItem> {
    let children = meta_children(meta);
    let keys = match child(children, b"keys") {
        Some(keys) => read_keys(keys),
        None => return Vec::new(),
    };
    let ilst = match child(children, b"ilst") {
        Some(ilst) => ilst,
        None => return Vec::new(),
    };

    atoms(ilst)
        .filter_map(|entry| {
            let index = u32::from_be_bytes(entry.kind) as usize;
            let key = keys.get(index.checked_sub(1)?)?;
            let value = read_data_value(entry.body)?;
            Some(MetadataItem::new(key.clone(), value))
        })
        .collect()
}

fn read_keys(keys: &[u8]) -> Vec<String> {
    let count = read_u32(keys, 4).unwrap_or(0) as usize;
    let mut entries = keys.get(8..).unwrap_or(&[]);
    let mut out = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        let size = match read_u32(entries, 0) {
            Some(size) if size >= 8 && size as usize <= entries.len() => size as usize,
            _ => break,
        };
        out.push(String::from_utf8_lossy(&entries[8..size]).into_owned());
        entries = &entries[size..];
    }
    out
}

fn read_data_value(item: &[u8]) -> Option<String> {
    let data = child(item, b"data")?;
    let data_type = read_u32(data, 0)? & 0x00FF_FFFF;
    if data_type != DATA_TYPE_UTF8 {
        return None;
    }
    let value = std::str::from_utf8(data.get(8..)?).ok()?;
    Some(value.trim_end_matches('\0').to_string())
}

/// Classic user-data text atoms: `©mak`, `©mod`, ... holding
/// `[u16 length][u16 language][text]`.
fn read_user_data_text(udta: &[u8]) -> Vec<MetadataItem> {
    atoms(udta)
        .filter(|atom| atom.kind[0] == 0xA9)
        .filter_map(|atom| {
            let length = u16::from_be_bytes([*atom.body.first()?, *atom.body.get(1)?]) as usize;
            let text = atom.body.get(4..4 + length)?;
            let key: String = std::iter::once('\u{a9}')
                .chain(atom.kind[1..].iter().map(|&b| b as char))
                .collect();
            Some(MetadataItem::new(key, String::from_utf8_lossy(text).into_owned()))
        })
        .collect()
}
