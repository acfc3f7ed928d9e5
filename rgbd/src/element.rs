//! Minimal EBML element codec: the element IDs a recording uses, variable
//! length integers, element headers read from a stream, child iteration over
//! in-memory payloads, and element serialization.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Result, RgbdError};

// EBML header
pub const ID_EBML: u32 = 0x1A45DFA3;
pub const ID_EBML_VERSION: u32 = 0x4286;
pub const ID_EBML_READ_VERSION: u32 = 0x42F7;
pub const ID_EBML_MAX_ID_LENGTH: u32 = 0x42F2;
pub const ID_EBML_MAX_SIZE_LENGTH: u32 = 0x42F3;
pub const ID_DOC_TYPE: u32 = 0x4282;
pub const ID_DOC_TYPE_VERSION: u32 = 0x4287;
pub const ID_DOC_TYPE_READ_VERSION: u32 = 0x4285;

// Global elements
pub const ID_VOID: u32 = 0xEC;
pub const ID_CRC32: u32 = 0xBF;

pub const ID_SEGMENT: u32 = 0x18538067;

// Seek head
pub const ID_SEEK_HEAD: u32 = 0x114D9B74;
pub const ID_SEEK: u32 = 0x4DBB;
pub const ID_SEEK_ID: u32 = 0x53AB;
pub const ID_SEEK_POSITION: u32 = 0x53AC;

// Segment info
pub const ID_INFO: u32 = 0x1549A966;
pub const ID_TIMECODE_SCALE: u32 = 0x2AD7B1;
pub const ID_DURATION: u32 = 0x4489;
pub const ID_MUXING_APP: u32 = 0x4D80;
pub const ID_WRITING_APP: u32 = 0x5741;
pub const ID_DATE_UTC: u32 = 0x4461;
pub const ID_TITLE: u32 = 0x7BA9;

// Tracks
pub const ID_TRACKS: u32 = 0x1654AE6B;
pub const ID_TRACK_ENTRY: u32 = 0xAE;
pub const ID_TRACK_NUMBER: u32 = 0xD7;
pub const ID_TRACK_UID: u32 = 0x73C5;
pub const ID_TRACK_TYPE: u32 = 0x83;
pub const ID_NAME: u32 = 0x536E;
pub const ID_CODEC_ID: u32 = 0x86;
pub const ID_CODEC_PRIVATE: u32 = 0x63A2;
pub const ID_DEFAULT_DURATION: u32 = 0x23E383;
pub const ID_SEEK_PRE_ROLL: u32 = 0x56BB;
pub const ID_VIDEO: u32 = 0xE0;
pub const ID_PIXEL_WIDTH: u32 = 0xB0;
pub const ID_PIXEL_HEIGHT: u32 = 0xBA;
pub const ID_AUDIO: u32 = 0xE1;
pub const ID_SAMPLING_FREQUENCY: u32 = 0xB5;
pub const ID_OUTPUT_SAMPLING_FREQUENCY: u32 = 0x78B5;
pub const ID_CHANNELS: u32 = 0x9F;
pub const ID_BIT_DEPTH: u32 = 0x6264;

// Attachments
pub const ID_ATTACHMENTS: u32 = 0x1941A469;
pub const ID_ATTACHED_FILE: u32 = 0x61A7;
pub const ID_FILE_NAME: u32 = 0x466E;
pub const ID_FILE_MIME_TYPE: u32 = 0x4660;
pub const ID_FILE_DATA: u32 = 0x465C;
pub const ID_FILE_UID: u32 = 0x46AE;

// Cues
pub const ID_CUES: u32 = 0x1C53BB6B;
pub const ID_CUE_POINT: u32 = 0xBB;
pub const ID_CUE_TIME: u32 = 0xB3;
pub const ID_CUE_TRACK_POSITIONS: u32 = 0xB7;
pub const ID_CUE_TRACK: u32 = 0xF7;
pub const ID_CUE_CLUSTER_POSITION: u32 = 0xF1;

// Clusters
pub const ID_CLUSTER: u32 = 0x1F43B675;
pub const ID_TIMECODE: u32 = 0xE7;
pub const ID_SIMPLE_BLOCK: u32 = 0xA3;
pub const ID_BLOCK_GROUP: u32 = 0xA0;
pub const ID_BLOCK: u32 = 0xA1;
pub const ID_REFERENCE_BLOCK: u32 = 0xFB;

/// Largest size encodable in an 8-byte vint (all-ones is reserved for "unknown").
pub const MAX_ELEMENT_SIZE: u64 = (1 << 56) - 2;

/// Header of an element read from a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    pub id: u32,
    /// Absolute offset of the element's first ID byte.
    pub offset: u64,
    /// Absolute offset of the element's payload.
    pub data_offset: u64,
    /// Payload size, None when the element declares an unknown size.
    pub size: Option<u64>,
}

impl ElementHeader {
    /// Payload size, failing for unknown-size elements.
    pub fn known_size(&self) -> Result<u64> {
        self.size.ok_or(RgbdError::UnknownSize {
            offset: self.offset,
        })
    }

    /// Offset one past the payload's last byte.
    pub fn end(&self) -> Result<u64> {
        Ok(self.data_offset + self.known_size()?)
    }
}

/// Decode a vint at `pos`, returning its value with the length marker removed
/// and the number of bytes it occupies.
pub fn vint_at(buf: &[u8], pos: usize) -> Option<(u64, usize)> {
    let first = *buf.get(pos)?;
    let len = first.leading_zeros() as usize + 1;
    if len > 8 {
        return None;
    }
    let bytes = buf.get(pos..pos + len)?;
    let marker_mask = if len == 8 { 0 } else { 0xFFu8 >> len };
    let value = bytes[1..]
        .iter()
        .fold((first & marker_mask) as u64, |acc, &b| (acc << 8) | b as u64);
    Some((value, len))
}

/// Decode an element ID at `pos`. IDs keep their length marker bits.
pub fn id_at(buf: &[u8], pos: usize) -> Option<(u32, usize)> {
    let first = *buf.get(pos)?;
    let len = first.leading_zeros() as usize + 1;
    if len > 4 {
        return None;
    }
    let bytes = buf.get(pos..pos + len)?;
    let id = bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
    Some((id, len))
}

fn is_unknown_size(value: u64, len: usize) -> bool {
    value == (1u64 << (7 * len)) - 1
}

/// Read the next element header from `reader`. Returns None at EOF.
pub fn read_element_header<R: Read + Seek>(reader: &mut R) -> Result<Option<ElementHeader>> {
    let offset = reader.stream_position().map_err(RgbdError::Io)?;

    let mut head = [0u8; 12];
    match reader.read_exact(&mut head[..1]) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => {
            return Err(RgbdError::IoAtOffset {
                offset,
                context: "element id",
                source: e,
            });
        }
    }

    let eof = |_| RgbdError::UnexpectedEof { offset };

    let id_len = head[0].leading_zeros() as usize + 1;
    if id_len > 4 {
        return Err(RgbdError::InvalidVint { offset });
    }
    reader.read_exact(&mut head[1..id_len + 1]).map_err(eof)?;

    let size_len = head[id_len].leading_zeros() as usize + 1;
    if size_len > 8 {
        return Err(RgbdError::InvalidVint {
            offset: offset + id_len as u64,
        });
    }
    reader
        .read_exact(&mut head[id_len + 1..id_len + size_len])
        .map_err(eof)?;

    let (id, _) = id_at(&head, 0).ok_or(RgbdError::InvalidVint { offset })?;
    let (size, _) = vint_at(&head, id_len).ok_or(RgbdError::InvalidVint { offset })?;

    Ok(Some(ElementHeader {
        id,
        offset,
        data_offset: offset + (id_len + size_len) as u64,
        size: (!is_unknown_size(size, size_len)).then_some(size),
    }))
}

/// Read the element header at `offset`, failing if it is missing or not `expected`.
pub fn read_element_header_at<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    expected: u32,
) -> Result<ElementHeader> {
    reader.seek(SeekFrom::Start(offset)).map_err(RgbdError::Io)?;
    let header = read_element_header(reader)?.ok_or(RgbdError::UnexpectedEof { offset })?;
    if header.id != expected {
        return Err(RgbdError::UnexpectedElement {
            offset,
            expected,
            got: header.id,
        });
    }
    Ok(header)
}

/// Read an element's whole payload into memory.
pub fn read_element_data<R: Read + Seek>(
    reader: &mut R,
    header: &ElementHeader,
) -> Result<Vec<u8>> {
    let size = header.known_size()?;
    reader
        .seek(SeekFrom::Start(header.data_offset))
        .map_err(RgbdError::Io)?;
    // The declared size is untrusted; only buffer what the stream holds.
    let mut data = Vec::new();
    reader
        .by_ref()
        .take(size)
        .read_to_end(&mut data)
        .map_err(|e| RgbdError::IoAtOffset {
            offset: header.offset,
            context: "element payload",
            source: e,
        })?;
    if (data.len() as u64) < size {
        return Err(RgbdError::UnexpectedEof {
            offset: header.offset,
        });
    }
    Ok(data)
}

/// Seek past an element's payload.
pub fn skip_element<R: Read + Seek>(reader: &mut R, header: &ElementHeader) -> Result<()> {
    reader
        .seek(SeekFrom::Start(header.end()?))
        .map_err(RgbdError::Io)?;
    Ok(())
}

/// A child element borrowed from an in-memory payload.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub id: u32,
    /// Absolute offset of the element's first ID byte.
    pub offset: u64,
    pub data: &'a [u8],
    header_len: usize,
}

impl<'a> Element<'a> {
    /// Absolute offset of the element's payload.
    pub fn data_offset(&self) -> u64 {
        self.offset + self.header_len as u64
    }

    pub fn children(&self) -> Children<'a> {
        children(self.data, self.data_offset())
    }

    pub fn uint(&self) -> Result<u64> {
        if self.data.len() > 8 {
            return Err(self.invalid("unsigned integer"));
        }
        Ok(self.data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }

    /// Signed integer, sign-extended from the payload width.
    pub fn int(&self) -> Result<i64> {
        let unsigned = self.uint()?;
        Ok(match self.data.len() {
            0 | 8 => unsigned as i64,
            len => {
                let shift = 64 - 8 * len as u32;
                ((unsigned << shift) as i64) >> shift
            }
        })
    }

    pub fn float(&self) -> Result<f64> {
        match self.data.len() {
            0 => Ok(0.0),
            4 => Ok(f32::from_be_bytes([self.data[0], self.data[1], self.data[2], self.data[3]]) as f64),
            8 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(self.data);
                Ok(f64::from_be_bytes(bytes))
            }
            _ => Err(self.invalid("float")),
        }
    }

    /// String payload with trailing NUL padding removed.
    pub fn string(&self) -> Result<String> {
        let end = self
            .data
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8(self.data[..end].to_vec()).map_err(|_| self.invalid("UTF-8 string"))
    }

    fn invalid(&self, what: &'static str) -> RgbdError {
        RgbdError::InvalidPayload {
            offset: self.offset,
            what,
        }
    }
}

/// Iterator over the elements packed in a payload buffer.
#[derive(Debug, Clone)]
pub struct Children<'a> {
    buf: &'a [u8],
    pos: usize,
    base_offset: u64,
}

/// Iterate the elements in `buf`, whose first byte sits at `base_offset` in the file.
pub fn children(buf: &[u8], base_offset: u64) -> Children<'_> {
    Children {
        buf,
        pos: 0,
        base_offset,
    }
}

fn parse_child(buf: &[u8], pos: usize, base_offset: u64) -> Result<Element<'_>> {
    let offset = base_offset + pos as u64;
    let (id, id_len) = id_at(buf, pos).ok_or(RgbdError::InvalidVint { offset })?;
    let (size, size_len) =
        vint_at(buf, pos + id_len).ok_or(RgbdError::InvalidVint { offset })?;
    if is_unknown_size(size, size_len) {
        return Err(RgbdError::UnknownSize { offset });
    }
    let start = pos + id_len + size_len;
    let data = usize::try_from(size)
        .ok()
        .and_then(|size| buf.get(start..start.checked_add(size)?))
        .ok_or(RgbdError::UnexpectedEof { offset })?;
    Ok(Element {
        id,
        offset,
        data,
        header_len: id_len + size_len,
    })
}

impl<'a> Iterator for Children<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        match parse_child(self.buf, self.pos, self.base_offset) {
            Ok(element) => {
                self.pos += element.header_len + element.data.len();
                Some(Ok(element))
            }
            Err(e) => {
                // Nothing after a malformed child can be located.
                self.pos = self.buf.len();
                Some(Err(e))
            }
        }
    }
}

/// Number of bytes the minimal vint encoding of `size` takes.
pub fn vint_width(size: u64) -> usize {
    (1..=8)
        .find(|&len| size < (1u64 << (7 * len)) - 1)
        .unwrap_or(8)
}

/// Append `size` as a vint exactly `width` bytes wide.
pub fn write_vint(buf: &mut Vec<u8>, size: u64, width: usize) {
    let marked = size | (1u64 << (7 * width));
    buf.extend_from_slice(&marked.to_be_bytes()[8 - width..]);
}

pub fn write_id(buf: &mut Vec<u8>, id: u32) {
    let len = (4 - id.leading_zeros() as usize / 8).max(1);
    buf.extend_from_slice(&id.to_be_bytes()[4 - len..]);
}

/// Serialize one element. `size_width` forces a wider size field than needed.
pub fn encode_element(id: u32, payload: &[u8], size_width: Option<usize>) -> Vec<u8> {
    let size = payload.len() as u64;
    let width = size_width.unwrap_or_else(|| vint_width(size)).max(vint_width(size));
    let mut buf = Vec::with_capacity(4 + width + payload.len());
    write_id(&mut buf, id);
    write_vint(&mut buf, size, width);
    buf.extend_from_slice(payload);
    buf
}

/// A Void element occupying exactly `total_len` bytes. Needs at least 2 bytes.
pub fn void_element(total_len: usize) -> Option<Vec<u8>> {
    if total_len < 2 {
        return None;
    }
    // A wider size field shrinks the payload, so settle on the first width that fits.
    let width = (1..=8).find(|&w| {
        total_len > w && vint_width((total_len - 1 - w) as u64) <= w
    })?;
    let payload = vec![0u8; total_len - 1 - width];
    Some(encode_element(ID_VOID, &payload, Some(width)))
}

/// Builder for a sequence of child elements.
#[derive(Debug, Default, Clone)]
pub struct ElementBuf {
    buf: Vec<u8>,
}

impl ElementBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uint(&mut self, id: u32, value: u64) -> &mut Self {
        let bytes = value.to_be_bytes();
        let skip = (value.leading_zeros() as usize / 8).min(7);
        self.binary(id, &bytes[skip..])
    }

    pub fn float(&mut self, id: u32, value: f64) -> &mut Self {
        self.binary(id, &value.to_be_bytes())
    }

    pub fn string(&mut self, id: u32, value: &str) -> &mut Self {
        self.binary(id, value.as_bytes())
    }

    pub fn binary(&mut self, id: u32, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(&encode_element(id, data, None));
        self
    }

    /// Append a master element whose children are built by `build`.
    pub fn master(&mut self, id: u32, build: impl FnOnce(&mut ElementBuf)) -> &mut Self {
        let mut child = ElementBuf::new();
        build(&mut child);
        self.binary(id, &child.buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
