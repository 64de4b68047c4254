//! Audio container probing.
//!
//! Only the metadata an `AudioClip` needs is extracted: channel count, sample rate,
//! bit depth and duration. Payload bytes are never decoded or transcoded.
//!
//! Supported containers:
//!
//! - **WAV**: RIFF `fmt ` and `data` chunks
//! - **Ogg Vorbis**: identification header plus the granule position of the last page
//! - **MP3**: MPEG frame header after an optional ID3v2 tag, with the Xing/Info
//!   frame count when present and a constant-bitrate estimate otherwise
//! - **M4A**: `mdhd` duration and the `mp4a` sample entry of the audio track

use crate::error::{Error, Result};
use byteorder::{ReadBytesExt, BE, LE};
use std::io::Cursor;

/// Bit depth reported for compressed formats.
const COMPRESSED_BITS_PER_SAMPLE: u32 = 16;

/// Unity `AudioCompressionFormat` values for the supported containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Pcm,
    Vorbis,
    Mp3,
    Aac,
}

impl AudioFormat {
    pub fn compression_format(self) -> i32 {
        match self {
            AudioFormat::Pcm => 0,
            AudioFormat::Vorbis => 1,
            AudioFormat::Mp3 => 3,
            AudioFormat::Aac => 7,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(AudioFormat::Pcm),
            "ogg" => Some(AudioFormat::Vorbis),
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" => Some(AudioFormat::Aac),
            _ => None,
        }
    }

    /// Identify the container from its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(&b"WAVE"[..]) {
            Some(AudioFormat::Pcm)
        } else if bytes.starts_with(b"OggS") {
            Some(AudioFormat::Vorbis)
        } else if bytes.get(4..8) == Some(&b"ftyp"[..]) {
            Some(AudioFormat::Aac)
        } else if bytes.starts_with(b"ID3")
            || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
        {
            Some(AudioFormat::Mp3)
        } else {
            None
        }
    }
}

/// Metadata extracted from an audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub channels: u32,
    pub frequency: u32,
    pub bits_per_sample: u32,
    pub length_seconds: f64,
    pub format: AudioFormat,
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::Audio(reason.into())
}

/// Inspect `bytes`, identifying the container from its contents.
pub fn inspect(bytes: &[u8]) -> Result<AudioInfo> {
    let format =
        AudioFormat::sniff(bytes).ok_or_else(|| invalid("unrecognized audio container"))?;
    inspect_as(bytes, format)
}

pub fn inspect_as(bytes: &[u8], format: AudioFormat) -> Result<AudioInfo> {
    let info = match format {
        AudioFormat::Pcm => inspect_wav(bytes)?,
        AudioFormat::Vorbis => inspect_ogg(bytes)?,
        AudioFormat::Mp3 => inspect_mp3(bytes)?,
        AudioFormat::Aac => inspect_m4a(bytes)?,
    };
    if info.channels == 0 || info.frequency == 0 {
        return Err(invalid(format!(
            "{format:?} stream reports {} channels at {} Hz",
            info.channels, info.frequency
        )));
    }
    tracing::debug!(
        "Inspected audio format={:?} channels={} frequency={} length={:.3}s",
        info.format,
        info.channels,
        info.frequency,
        info.length_seconds
    );
    Ok(info)
}

pub fn inspect_wav(bytes: &[u8]) -> Result<AudioInfo> {
    if !bytes.starts_with(b"RIFF") || bytes.get(8..12) != Some(&b"WAVE"[..]) {
        return Err(invalid("missing RIFF/WAVE header"));
    }
    let mut fmt = None;
    let mut data_len = None;
    let mut pos = 12usize;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = Cursor::new(&bytes[pos + 4..pos + 8]).read_u32::<LE>()? as usize;
        let body_start = pos + 8;
        let body_end = body_start.saturating_add(size).min(bytes.len());
        match id {
            b"fmt " => {
                let mut c = Cursor::new(&bytes[body_start..body_end]);
                let _audio_format = c.read_u16::<LE>()?;
                let channels = c.read_u16::<LE>()?;
                let rate = c.read_u32::<LE>()?;
                let byte_rate = c.read_u32::<LE>()?;
                let _block_align = c.read_u16::<LE>()?;
                let bits = c.read_u16::<LE>()?;
                fmt = Some((channels, rate, byte_rate, bits));
            }
            // A truncated data chunk still counts what is present.
            b"data" => data_len = Some((body_end - body_start) as u64),
            _ => {}
        }
        // Chunks are word aligned.
        pos = body_start.saturating_add(size).saturating_add(size & 1);
    }

    let (channels, frequency, byte_rate, bits) =
        fmt.ok_or_else(|| invalid("WAV has no fmt chunk"))?;
    let data_len = data_len.ok_or_else(|| invalid("WAV has no data chunk"))?;
    let length_seconds = if byte_rate > 0 {
        data_len as f64 / byte_rate as f64
    } else {
        0.0
    };
    Ok(AudioInfo {
        channels: channels as u32,
        frequency,
        bits_per_sample: bits as u32,
        length_seconds,
        format: AudioFormat::Pcm,
    })
}

pub fn inspect_ogg(bytes: &[u8]) -> Result<AudioInfo> {
    if !bytes.starts_with(b"OggS") || bytes.len() < 27 {
        return Err(invalid("missing Ogg page header"));
    }
    let segments = bytes[26] as usize;
    let packet_start = 27 + segments;
    let packet = bytes
        .get(packet_start..)
        .ok_or_else(|| invalid("truncated first Ogg page"))?;
    if packet.len() < 16 || packet[0] != 1 || &packet[1..7] != b"vorbis" {
        return Err(invalid("first Ogg packet is not a Vorbis identification header"));
    }
    let channels = packet[11] as u32;
    let frequency = Cursor::new(&packet[12..16]).read_u32::<LE>()?;

    // Duration comes from the granule position (total samples) of the last page.
    let mut granule = 0i64;
    let mut search_end = bytes.len();
    while let Some(pos) = find_last(&bytes[..search_end], b"OggS") {
        if let Some(raw) = bytes.get(pos + 6..pos + 14) {
            let value = Cursor::new(raw).read_i64::<LE>()?;
            if value > 0 {
                granule = value;
                break;
            }
        }
        search_end = pos;
    }
    let length_seconds = if frequency > 0 {
        granule as f64 / frequency as f64
    } else {
        0.0
    };

    Ok(AudioInfo {
        channels,
        frequency,
        bits_per_sample: COMPRESSED_BITS_PER_SAMPLE,
        length_seconds,
        format: AudioFormat::Vorbis,
    })
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

const MP3_BITRATES_V1: [[u32; 15]; 3] = [
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
];
const MP3_BITRATES_V2: [[u32; 15]; 2] = [
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256],
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
];

struct MpegFrame {
    version_1: bool,
    layer: u8,
    bitrate_kbps: u32,
    frequency: u32,
    channels: u32,
}

impl MpegFrame {
    fn parse(header: [u8; 4]) -> Option<Self> {
        if header[0] != 0xFF || header[1] & 0xE0 != 0xE0 {
            return None;
        }
        let version = (header[1] >> 3) & 0x03;
        let layer = match (header[1] >> 1) & 0x03 {
            3 => 1,
            2 => 2,
            1 => 3,
            _ => return None,
        };
        let bitrate_index = (header[2] >> 4) as usize;
        let rate_index = ((header[2] >> 2) & 0x03) as usize;
        if version == 1 || bitrate_index == 0 || bitrate_index == 15 || rate_index == 3 {
            return None;
        }
        let version_1 = version == 3;
        let bitrate_kbps = if version_1 {
            MP3_BITRATES_V1[layer as usize - 1][bitrate_index]
        } else {
            MP3_BITRATES_V2[usize::from(layer != 1)][bitrate_index]
        };
        let base = [44100, 48000, 32000][rate_index];
        let frequency = match version {
            3 => base,
            2 => base / 2,
            _ => base / 4,
        };
        let channels = if header[3] >> 6 == 3 { 1 } else { 2 };
        Some(Self {
            version_1,
            layer,
            bitrate_kbps,
            frequency,
            channels,
        })
    }

    fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version_1) {
            (1, _) => 384,
            (2, _) | (3, true) => 1152,
            _ => 576,
        }
    }

    /// Offset of a Xing/Info tag from the frame start (Layer III side info size).
    fn xing_offset(&self) -> usize {
        4 + match (self.version_1, self.channels) {
            (true, 1) => 17,
            (true, _) => 32,
            (false, 1) => 9,
            (false, _) => 17,
        }
    }
}

fn id3v2_len(bytes: &[u8]) -> usize {
    if bytes.len() < 10 || !bytes.starts_with(b"ID3") {
        return 0;
    }
    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | (*b as usize & 0x7F));
    let footer = if bytes[5] & 0x10 != 0 { 10 } else { 0 };
    10 + size + footer
}

pub fn inspect_mp3(bytes: &[u8]) -> Result<AudioInfo> {
    let start = id3v2_len(bytes);
    let (frame_start, frame) = (start..bytes.len().saturating_sub(3))
        .find_map(|i| {
            let header = [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
            MpegFrame::parse(header).map(|f| (i, f))
        })
        .ok_or_else(|| invalid("no MPEG audio frame found"))?;

    let xing = frame_start + frame.xing_offset();
    let vbr_frames = match bytes.get(xing..xing + 12) {
        Some(tag) if &tag[..4] == b"Xing" || &tag[..4] == b"Info" => {
            let flags = Cursor::new(&tag[4..8]).read_u32::<BE>()?;
            if flags & 0x01 != 0 {
                Some(Cursor::new(&tag[8..12]).read_u32::<BE>()?)
            } else {
                None
            }
        }
        _ => None,
    };

    let length_seconds = match vbr_frames {
        Some(frames) => frames as f64 * frame.samples_per_frame() as f64 / frame.frequency as f64,
        None => {
            let audio_bytes = (bytes.len() - frame_start) as f64;
            audio_bytes * 8.0 / (frame.bitrate_kbps as f64 * 1000.0)
        }
    };

    Ok(AudioInfo {
        channels: frame.channels,
        frequency: frame.frequency,
        bits_per_sample: COMPRESSED_BITS_PER_SAMPLE,
        length_seconds,
        format: AudioFormat::Mp3,
    })
}

/// Iterate the boxes directly inside `data` as `(type, body)`.
fn mp4_boxes(data: &[u8]) -> impl Iterator<Item = ([u8; 4], &[u8])> {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        let header = data.get(pos..pos + 8)?;
        let size32 = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let kind = [header[4], header[5], header[6], header[7]];
        let (header_len, size) = match size32 {
            0 => (8, data.len() - pos),
            1 => {
                let large = data.get(pos + 8..pos + 16)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(large);
                (16, u64::from_be_bytes(raw) as usize)
            }
            n => (8, n),
        };
        if size < header_len || pos.checked_add(size)? > data.len() {
            return None;
        }
        let body = &data[pos + header_len..pos + size];
        pos += size;
        Some((kind, body))
    })
}

fn mp4_child<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<&'a [u8]> {
    mp4_boxes(data).find(|(k, _)| k == kind).map(|(_, body)| body)
}

/// `(timescale, duration)` from an `mdhd` body.
fn parse_mdhd(body: &[u8]) -> Result<(u32, u64)> {
    let mut c = Cursor::new(body);
    let version = c.read_u8()?;
    if version == 1 {
        c.set_position(4 + 16);
        let timescale = c.read_u32::<BE>()?;
        Ok((timescale, c.read_u64::<BE>()?))
    } else {
        c.set_position(4 + 8);
        let timescale = c.read_u32::<BE>()?;
        Ok((timescale, c.read_u32::<BE>()? as u64))
    }
}

/// `(channels, sample size, sample rate)` from an `stsd` body holding `mp4a`.
fn parse_mp4a(stsd: &[u8]) -> Result<Option<(u32, u32, u32)>> {
    // Full box header (4) and entry count (4) precede the sample entries.
    let Some(entries) = stsd.get(8..) else {
        return Ok(None);
    };
    let Some(entry) = mp4_child(entries, b"mp4a") else {
        return Ok(None);
    };
    // reserved(6) data_reference_index(2) version(2) revision(2) vendor(4)
    let mut c = Cursor::new(entry);
    c.set_position(16);
    let channels = c.read_u16::<BE>()? as u32;
    let sample_size = c.read_u16::<BE>()? as u32;
    c.set_position(24);
    let rate = c.read_u32::<BE>()? >> 16;
    Ok(Some((channels, sample_size, rate)))
}

pub fn inspect_m4a(bytes: &[u8]) -> Result<AudioInfo> {
    let moov = mp4_child(bytes, b"moov").ok_or_else(|| invalid("M4A has no moov box"))?;
    for (kind, trak) in mp4_boxes(moov) {
        if &kind != b"trak" {
            continue;
        }
        let Some(mdia) = mp4_child(trak, b"mdia") else {
            continue;
        };
        let Some(stsd) = mp4_child(mdia, b"minf")
            .and_then(|minf| mp4_child(minf, b"stbl"))
            .and_then(|stbl| mp4_child(stbl, b"stsd"))
        else {
            continue;
        };
        let Some((channels, sample_size, rate)) = parse_mp4a(stsd)? else {
            continue;
        };
        let mdhd = mp4_child(mdia, b"mdhd").ok_or_else(|| invalid("audio track has no mdhd"))?;
        let (timescale, duration) = parse_mdhd(mdhd)?;
        let frequency = if rate > 0 { rate } else { timescale };
        let length_seconds = if timescale > 0 {
            duration as f64 / timescale as f64
        } else {
            0.0
        };
        return Ok(AudioInfo {
            channels,
            frequency,
            bits_per_sample: if sample_size > 0 {
                sample_size
            } else {
                COMPRESSED_BITS_PER_SAMPLE
            },
            length_seconds,
            format: AudioFormat::Aac,
        });
    }
    Err(invalid("M4A has no mp4a audio track"))
}
