//! Shared helpers for building in-memory .nes images.
#![allow(dead_code)] // not every test file uses every helper

/// Build a one-bank NROM image with `program` placed at $8000 and the
/// reset vector pointing at it. The rest of PRG is NOP-filled.
#[must_use]
pub fn nrom_with_program(program: &[u8]) -> Vec<u8> {
    nrom_with_vectors(program, 0x8000, 0x8000)
}

/// Like [`nrom_with_program`] but with explicit reset and NMI vectors.
#[must_use]
pub fn nrom_with_vectors(program: &[u8], reset: u16, nmi: u16) -> Vec<u8> {
    let mut prg = vec![0xEA; 16 * 1024];
    prg[..program.len()].copy_from_slice(program);
    prg[0x3FFA] = (nmi & 0xFF) as u8;
    prg[0x3FFB] = (nmi >> 8) as u8;
    prg[0x3FFC] = (reset & 0xFF) as u8;
    prg[0x3FFD] = (reset >> 8) as u8;
    prg[0x3FFE] = (reset & 0xFF) as u8; // IRQ/BRK falls back to the entry
    prg[0x3FFF] = (reset >> 8) as u8;

    let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, 0x00, 0x00];
    data.extend_from_slice(&[0; 8]);
    data.extend_from_slice(&prg);
    data.extend(std::iter::repeat(0u8).take(8 * 1024)); // blank CHR
    data
}

/// Build an MMC1 image with sixteen 16 KiB PRG banks. Every bank is filled
/// with its own index; `program` is overlaid at the start of the last bank
/// (the fixed $C000 window) with the vectors pointing at $C000.
#[must_use]
pub fn mmc1_banked_with_program(program: &[u8]) -> Vec<u8> {
    const BANKS: usize = 16;
    let mut prg = Vec::with_capacity(BANKS * 16 * 1024);
    for bank in 0..BANKS {
        prg.extend(std::iter::repeat(bank as u8).take(16 * 1024));
    }

    let last = (BANKS - 1) * 16 * 1024;
    prg[last..last + program.len()].copy_from_slice(program);
    prg[last + 0x3FFC] = 0x00;
    prg[last + 0x3FFD] = 0xC0;

    let mut data = vec![0x4E, 0x45, 0x53, 0x1A, BANKS as u8, 0, 0x10, 0x00];
    data.extend_from_slice(&[0; 8]);
    data.extend_from_slice(&prg);
    data
}
