//! Intel HEX reader producing a flat flash image.

use anyhow::{bail, ensure, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Data,
    EndOfFile,
    ExtendedSegmentAddress,
    StartSegmentAddress,
    ExtendedLinearAddress,
    StartLinearAddress,
}

impl RecordKind {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => Self::Data,
            0x01 => Self::EndOfFile,
            0x02 => Self::ExtendedSegmentAddress,
            0x03 => Self::StartSegmentAddress,
            0x04 => Self::ExtendedLinearAddress,
            0x05 => Self::StartLinearAddress,
            _ => return None,
        })
    }
}

#[derive(Debug)]
struct Record {
    kind: RecordKind,
    offset: u16,
    data: Vec<u8>,
}

impl Record {
    /// Decode one `:LLAAAATT<data>CC` line.
    fn parse(line: &str) -> Result<Self> {
        let body = line
            .strip_prefix(':')
            .context("missing start code ':'")?;
        ensure!(body.is_ascii(), "non-ASCII characters in record");
        ensure!(body.len() % 2 == 0, "odd number of hex digits");

        let bytes = (0..body.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&body[i..i + 2], 16)
                    .with_context(|| format!("invalid hex digits at column {}", i + 2))
            })
            .collect::<Result<Vec<u8>>>()?;

        ensure!(bytes.len() >= 5, "record too short");
        let len = bytes[0] as usize;
        ensure!(
            bytes.len() == len + 5,
            "length field says {} data bytes, record has {}",
            len,
            bytes.len() - 5
        );
        ensure!(
            bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0,
            "checksum mismatch"
        );

        let code = bytes[3];
        let kind = RecordKind::from_code(code)
            .with_context(|| format!("unsupported record type 0x{:02X}", code))?;

        Ok(Self {
            kind,
            offset: u16::from_be_bytes([bytes[1], bytes[2]]),
            data: bytes[4..4 + len].to_vec(),
        })
    }

    fn upper_address(&self) -> Result<u32> {
        ensure!(self.data.len() == 2, "address record must carry 2 bytes");
        Ok(u16::from_be_bytes([self.data[0], self.data[1]]) as u32)
    }
}

/// Firmware bytes laid out from `base`. Gaps between data records are
/// filled with 0xFF, the erased-flash value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    pub base: u32,
    pub data: Vec<u8>,
}

impl FirmwareImage {
    pub fn parse(input: &str) -> Result<Self> {
        let mut chunks: Vec<(u32, Vec<u8>)> = Vec::new();
        let mut upper: u32 = 0;

        for (idx, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = Record::parse(line).with_context(|| format!("line {}", idx + 1))?;

            match record.kind {
                RecordKind::Data => {
                    let address = upper + record.offset as u32;
                    match chunks.last_mut() {
                        Some((start, bytes)) if *start + bytes.len() as u32 == address => {
                            bytes.extend_from_slice(&record.data)
                        }
                        _ => chunks.push((address, record.data)),
                    }
                }
                RecordKind::EndOfFile => break,
                RecordKind::ExtendedSegmentAddress => {
                    upper = record.upper_address().with_context(|| format!("line {}", idx + 1))? << 4;
                }
                RecordKind::ExtendedLinearAddress => {
                    upper = record.upper_address().with_context(|| format!("line {}", idx + 1))? << 16;
                }
                // Entry points mean nothing to the bootloader.
                RecordKind::StartSegmentAddress | RecordKind::StartLinearAddress => {}
            }
        }

        let Some(base) = chunks.iter().map(|(start, _)| *start).min() else {
            bail!("no data records in HEX file");
        };
        let end = chunks
            .iter()
            .map(|(start, bytes)| start + bytes.len() as u32)
            .max()
            .unwrap_or(base);

        let mut data = vec![0xFF; (end - base) as usize];
        for (start, bytes) in &chunks {
            let at = (start - base) as usize;
            data[at..at + bytes.len()].copy_from_slice(bytes);
        }

        Ok(Self { base, data })
    }

    pub fn end(&self) -> u32 {
        self.base + self.data.len() as u32
    }

    /// Split into `(address, bytes)` pages of `page_size`, skipping pages
    /// that are entirely erased. The last page may be short.
    pub fn pages(&self, page_size: usize) -> impl Iterator<Item = (u32, &[u8])> + '_ {
        self.data
            .chunks(page_size)
            .enumerate()
            .map(move |(i, chunk)| (self.base + (i * page_size) as u32, chunk))
            .filter(|(_, chunk)| chunk.iter().any(|&b| b != 0xFF))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_image() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F78\n\
                   :00000001FF\n";
        let image = FirmwareImage::parse(hex).unwrap();
        assert_eq!(image.base, 0);
        assert_eq!(image.data, (0u8..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_extended_segment_address() {
        let hex = ":020000020100FB\n\
                   :10000000112233445566778899AABBCCDDEEFF00F8\n\
                   :00000001FF\n";
        let image = FirmwareImage::parse(hex).unwrap();
        assert_eq!(image.base, 0x1000);
        assert_eq!(image.end(), 0x1010);
    }

    #[test]
    fn test_extended_linear_address() {
        let hex = ":020000040001F9\n\
                   :04000000AABBCCDDEE\n\
                   :00000001FF\n";
        let image = FirmwareImage::parse(hex).unwrap();
        assert_eq!(image.base, 0x1_0000);
        assert_eq!(image.data, vec![0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn test_start_address_ignored() {
        let hex = ":04000003000000C039\n\
                   :04000000AABBCCDDEE\n\
                   :00000001FF\n";
        let image = FirmwareImage::parse(hex).unwrap();
        assert_eq!(image.data.len(), 4);
    }

    #[test]
    fn test_checksum_error() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F00\n\
                   :00000001FF\n";
        let err = FirmwareImage::parse(hex).unwrap_err();
        assert!(format!("{:#}", err).contains("line 1"));
    }

    #[test]
    fn test_missing_start_code() {
        assert!(FirmwareImage::parse("00000001FF\n").is_err());
    }

    #[test]
    fn test_non_ascii_rejected() {
        assert!(FirmwareImage::parse(":0é0\n").is_err());
        assert!(FirmwareImage::parse(":00000001FÿF\n").is_err());
    }

    #[test]
    fn test_no_data() {
        assert!(FirmwareImage::parse(":00000001FF\n").is_err());
    }

    #[test]
    fn test_contiguous_records_merge() {
        let hex = ":04000000AABBCCDDEE\n\
                   :04000400112233444E\n\
                   :00000001FF\n";
        let image = FirmwareImage::parse(hex).unwrap();
        assert_eq!(image.data, vec![0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_gap_filled_with_erased_bytes() {
        let hex = ":02010000AABB98\n\
                   :02011000CCDD44\n\
                   :00000001FF\n";
        let image = FirmwareImage::parse(hex).unwrap();
        assert_eq!(image.base, 0x100);
        assert_eq!(image.data.len(), 0x12);
        assert_eq!(&image.data[..2], &[0xAA, 0xBB]);
        assert!(image.data[2..0x10].iter().all(|&b| b == 0xFF));
        assert_eq!(&image.data[0x10..], &[0xCC, 0xDD]);
    }

    #[test]
    fn test_pages_skip_erased() {
        let mut data = vec![0xFF; 300];
        data[0] = 1;
        data[260] = 2;
        let image = FirmwareImage { base: 0, data };
        let pages: Vec<(u32, usize)> = image.pages(128).map(|(a, p)| (a, p.len())).collect();
        assert_eq!(pages, vec![(0, 128), (256, 44)]);
    }
}
