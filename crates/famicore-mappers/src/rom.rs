//! .nes ROM image parsing (iNES 1.0 and NES 2.0).

use crate::mapper::MirrorMode;

/// Errors produced while parsing a ROM image.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RomError {
    /// The file is shorter than the 16-byte header.
    #[error("ROM file too small: expected at least 16 bytes, got {0}")]
    FileTooSmall(usize),

    /// The header does not start with "NES\x1A".
    #[error("bad iNES signature: expected [4E 45 53 1A], got {0:02X?}")]
    BadSignature([u8; 4]),

    /// The payload is shorter than the header promises.
    #[error("ROM file truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the header promises.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// The header declares zero PRG banks.
    #[error("ROM declares no PRG-ROM banks")]
    NoPrgRom,

    /// No mapper implementation exists for this id.
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u16),
}

/// Parsed 16-byte iNES/NES 2.0 header.
///
/// ```text
/// Byte 0-3: "NES\x1A"
/// Byte 4:   PRG-ROM banks (16 KiB units; NES 2.0 low byte)
/// Byte 5:   CHR-ROM banks (8 KiB units; 0 = CHR-RAM)
/// Byte 6:   flags6  - mirroring, battery, trainer, four-screen, mapper low nibble
/// Byte 7:   flags7  - NES 2.0 marker (bits 3:2 = 0b10), mapper high nibble
/// Byte 8:   NES 2.0 mapper bits 8-11 and submapper
/// Byte 9+:  NES 2.0 size extensions or padding
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomHeader {
    /// PRG-ROM size in 16 KiB banks.
    pub prg_banks: u16,
    /// CHR-ROM size in 8 KiB banks (0 means the cart carries CHR-RAM).
    pub chr_banks: u16,
    /// Mapper number (8-bit for iNES 1.0, 12-bit for NES 2.0).
    pub mapper: u16,
    /// Fixed mirroring arrangement wired on the board.
    pub mirroring: MirrorMode,
    /// Battery-backed PRG-RAM present.
    pub has_battery: bool,
    /// 512-byte trainer present before PRG-ROM (skipped on load).
    pub has_trainer: bool,
    /// True when the header is NES 2.0.
    pub nes2: bool,
}

impl RomHeader {
    const SIGNATURE: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];

    /// Parse the first 16 bytes of a ROM image.
    ///
    /// # Errors
    ///
    /// [`RomError::FileTooSmall`] and [`RomError::BadSignature`] on malformed
    /// input, [`RomError::NoPrgRom`] when the header declares no program ROM.
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < 16 {
            return Err(RomError::FileTooSmall(data.len()));
        }

        let signature = [data[0], data[1], data[2], data[3]];
        if signature != Self::SIGNATURE {
            return Err(RomError::BadSignature(signature));
        }

        let flags6 = data[6];
        let flags7 = data[7];
        let nes2 = flags7 & 0x0C == 0x08;

        let mut prg_banks = u16::from(data[4]);
        let mut chr_banks = u16::from(data[5]);
        let mut mapper = u16::from((flags7 & 0xF0) | (flags6 >> 4));
        if nes2 {
            // NES 2.0 extends the mapper number and the bank counts.
            mapper |= u16::from(data[8] & 0x0F) << 8;
            prg_banks |= u16::from(data[9] & 0x0F) << 8;
            chr_banks |= u16::from(data[9] >> 4) << 8;
        }

        if prg_banks == 0 {
            return Err(RomError::NoPrgRom);
        }

        let mirroring = if flags6 & 0x08 != 0 {
            MirrorMode::FourScreen
        } else if flags6 & 0x01 != 0 {
            MirrorMode::Vertical
        } else {
            MirrorMode::Horizontal
        };

        Ok(Self {
            prg_banks,
            chr_banks,
            mapper,
            mirroring,
            has_battery: flags6 & 0x02 != 0,
            has_trainer: flags6 & 0x04 != 0,
            nes2,
        })
    }
}

/// A parsed ROM image: header plus the PRG and CHR payloads.
#[derive(Debug, Clone)]
pub struct Rom {
    /// Parsed header.
    pub header: RomHeader,
    /// PRG-ROM bytes (16 KiB x banks).
    pub prg_rom: Vec<u8>,
    /// CHR-ROM bytes (8 KiB x banks), empty when the cart uses CHR-RAM.
    pub chr_rom: Vec<u8>,
}

impl Rom {
    /// Parse a complete .nes file. The optional 512-byte trainer is skipped.
    ///
    /// # Errors
    ///
    /// Header errors from [`RomHeader::parse`], or [`RomError::Truncated`]
    /// when the payload is shorter than the declared bank counts.
    pub fn load(data: &[u8]) -> Result<Self, RomError> {
        let header = RomHeader::parse(data)?;

        let mut offset = 16;
        if header.has_trainer {
            offset += 512;
        }

        let prg_len = usize::from(header.prg_banks) * 16 * 1024;
        let chr_len = usize::from(header.chr_banks) * 8 * 1024;
        let expected = offset + prg_len + chr_len;
        if data.len() < expected {
            return Err(RomError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let prg_rom = data[offset..offset + prg_len].to_vec();
        offset += prg_len;
        let chr_rom = data[offset..offset + chr_len].to_vec();

        Ok(Self {
            header,
            prg_rom,
            chr_rom,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn build_rom(prg_banks: u8, chr_banks: u8, mapper: u8, flags6_low: u8) -> Vec<u8> {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A];
        data.push(prg_banks);
        data.push(chr_banks);
        data.push(((mapper & 0x0F) << 4) | flags6_low);
        data.push(mapper & 0xF0);
        data.extend_from_slice(&[0; 8]);
        data.extend(std::iter::repeat(0u8).take(usize::from(prg_banks) * 16384));
        data.extend(std::iter::repeat(0u8).take(usize::from(chr_banks) * 8192));
        data
    }

    #[test]
    fn parses_ines_header() {
        let data = build_rom(2, 1, 0, 0x01);
        let rom = Rom::load(&data).unwrap();
        assert_eq!(rom.header.prg_banks, 2);
        assert_eq!(rom.header.chr_banks, 1);
        assert_eq!(rom.header.mapper, 0);
        assert_eq!(rom.header.mirroring, MirrorMode::Vertical);
        assert_eq!(rom.prg_rom.len(), 32768);
        assert_eq!(rom.chr_rom.len(), 8192);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut data = build_rom(1, 1, 0, 0);
        data[0] = 0x4D;
        assert!(matches!(Rom::load(&data), Err(RomError::BadSignature(_))));
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut data = build_rom(2, 1, 0, 0);
        data.truncate(16 + 1024);
        assert!(matches!(Rom::load(&data), Err(RomError::Truncated { .. })));
    }

    #[test]
    fn mapper_number_spans_both_nibbles() {
        let data = build_rom(1, 1, 0x42, 0);
        let header = RomHeader::parse(&data).unwrap();
        assert_eq!(header.mapper, 0x42);
    }

    #[test]
    fn nes2_extends_mapper_number() {
        let mut data = build_rom(1, 1, 0x21, 0);
        data[7] |= 0x08; // NES 2.0 marker
        data[8] = 0x03; // mapper bits 8-11
        let header = RomHeader::parse(&data).unwrap();
        assert!(header.nes2);
        assert_eq!(header.mapper, 0x321);
    }

    #[test]
    fn trainer_is_skipped() {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 0, 0x04, 0];
        data.extend_from_slice(&[0; 8]);
        data.extend(std::iter::repeat(0xFFu8).take(512)); // trainer
        let mut prg = vec![0u8; 16384];
        prg[0] = 0xA9;
        data.extend_from_slice(&prg);

        let rom = Rom::load(&data).unwrap();
        assert!(rom.header.has_trainer);
        assert_eq!(rom.prg_rom[0], 0xA9);
    }

    #[test]
    fn four_screen_beats_vertical_bit() {
        let data = build_rom(1, 1, 0, 0x09);
        let header = RomHeader::parse(&data).unwrap();
        assert_eq!(header.mirroring, MirrorMode::FourScreen);
    }

    #[test]
    fn zero_prg_banks_rejected() {
        let data = build_rom(0, 1, 0, 0);
        assert!(matches!(RomHeader::parse(&data), Err(RomError::NoPrgRom)));
    }

    proptest::proptest! {
        /// The mapper number reassembles from the two header nibbles for
        /// every 8-bit id.
        #[test]
        fn mapper_nibbles_round_trip(mapper in 0u8..=0xFF) {
            let data = build_rom(1, 0, mapper, 0);
            let header = RomHeader::parse(&data).unwrap();
            proptest::prop_assert_eq!(header.mapper, u16::from(mapper));
        }
    }
}
