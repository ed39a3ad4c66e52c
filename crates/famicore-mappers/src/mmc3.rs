//! MMC3 (mapper 4).
//!
//! Eight bank registers written through a select/data pair at $8000/$8001.
//! Register 0-5 drive CHR (two 2 KiB + four 1 KiB windows, swappable halves
//! via the inversion bit), 6-7 drive PRG (8 KiB banks; the mode bit swaps
//! which of $8000/$C000 is fixed to the second-to-last bank). Mirroring is
//! latched through $A000 and a scanline counter drives the IRQ line:
//! $C000 sets the reload value, $C001 forces a reload, $E000/$E001
//! disable/enable. The PPU calls [`Mapper::scanline`] once per rendered
//! line; a decrement to zero with IRQ enabled asserts the line until
//! [`Mapper::irq_clear`].

use crate::mapper::{CpuMapRead, CpuMapWrite, Mapper, MapperState, MirrorMode};
use crate::rom::Rom;

const PRG_RAM_SIZE: usize = 8 * 1024;

/// MMC3 mapper.
#[derive(Debug, Clone)]
pub struct Mmc3 {
    prg_banks: u16,
    chr_banks: u16,

    target_register: u8,
    prg_mode: bool,
    chr_inversion: bool,

    registers: [u8; 8],
    /// Byte offsets into CHR for each 1 KiB window.
    chr_offsets: [u32; 8],
    /// Byte offsets into PRG for each 8 KiB window.
    prg_offsets: [u32; 4],

    mirroring: MirrorMode,

    irq_counter: u16,
    irq_reload: u16,
    irq_enabled: bool,
    irq_active: bool,

    prg_ram: Vec<u8>,
}

impl Mmc3 {
    /// Build from a parsed ROM.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let mut mapper = Self {
            prg_banks: rom.header.prg_banks,
            chr_banks: rom.header.chr_banks,
            target_register: 0,
            prg_mode: false,
            chr_inversion: false,
            registers: [0; 8],
            chr_offsets: [0; 8],
            prg_offsets: [0; 4],
            mirroring: MirrorMode::Hardware,
            irq_counter: 0,
            irq_reload: 0,
            irq_enabled: false,
            irq_active: false,
            prg_ram: vec![0; PRG_RAM_SIZE],
        };
        mapper.reset();
        mapper
    }

    /// Number of 8 KiB PRG banks.
    fn prg_bank_count(&self) -> u32 {
        u32::from(self.prg_banks) * 2
    }

    /// Rebuild the window offsets after a bank-data write.
    fn update_offsets(&mut self) {
        let r = &self.registers;
        if self.chr_inversion {
            self.chr_offsets[0] = u32::from(r[2]) * 0x0400;
            self.chr_offsets[1] = u32::from(r[3]) * 0x0400;
            self.chr_offsets[2] = u32::from(r[4]) * 0x0400;
            self.chr_offsets[3] = u32::from(r[5]) * 0x0400;
            self.chr_offsets[4] = u32::from(r[0] & 0xFE) * 0x0400;
            self.chr_offsets[5] = u32::from(r[0] & 0xFE) * 0x0400 + 0x0400;
            self.chr_offsets[6] = u32::from(r[1] & 0xFE) * 0x0400;
            self.chr_offsets[7] = u32::from(r[1] & 0xFE) * 0x0400 + 0x0400;
        } else {
            self.chr_offsets[0] = u32::from(r[0] & 0xFE) * 0x0400;
            self.chr_offsets[1] = u32::from(r[0] & 0xFE) * 0x0400 + 0x0400;
            self.chr_offsets[2] = u32::from(r[1] & 0xFE) * 0x0400;
            self.chr_offsets[3] = u32::from(r[1] & 0xFE) * 0x0400 + 0x0400;
            self.chr_offsets[4] = u32::from(r[2]) * 0x0400;
            self.chr_offsets[5] = u32::from(r[3]) * 0x0400;
            self.chr_offsets[6] = u32::from(r[4]) * 0x0400;
            self.chr_offsets[7] = u32::from(r[5]) * 0x0400;
        }

        let banks = self.prg_bank_count();
        let bank6 = u32::from(r[6] & 0x3F) % banks.max(1);
        let bank7 = u32::from(r[7] & 0x3F) % banks.max(1);
        if self.prg_mode {
            self.prg_offsets[0] = (banks - 2) * 0x2000;
            self.prg_offsets[2] = bank6 * 0x2000;
        } else {
            self.prg_offsets[0] = bank6 * 0x2000;
            self.prg_offsets[2] = (banks - 2) * 0x2000;
        }
        self.prg_offsets[1] = bank7 * 0x2000;
        self.prg_offsets[3] = (banks - 1) * 0x2000;
    }
}

impl Mapper for Mmc3 {
    fn map_cpu_read(&self, addr: u16) -> CpuMapRead {
        match addr {
            0x6000..=0x7FFF => CpuMapRead::Data(self.prg_ram[usize::from(addr & 0x1FFF)]),
            0x8000..=0xFFFF => {
                let window = usize::from((addr - 0x8000) >> 13);
                CpuMapRead::Prg(self.prg_offsets[window] + u32::from(addr & 0x1FFF))
            }
            _ => CpuMapRead::Miss,
        }
    }

    fn map_cpu_write(&mut self, addr: u16, data: u8) -> CpuMapWrite {
        match addr {
            0x6000..=0x7FFF => {
                self.prg_ram[usize::from(addr & 0x1FFF)] = data;
                CpuMapWrite::Handled
            }
            0x8000..=0x9FFF => {
                if addr & 1 == 0 {
                    self.target_register = data & 0x07;
                    self.prg_mode = data & 0x40 != 0;
                    self.chr_inversion = data & 0x80 != 0;
                } else {
                    self.registers[usize::from(self.target_register)] = data;
                }
                self.update_offsets();
                CpuMapWrite::Handled
            }
            0xA000..=0xBFFF => {
                if addr & 1 == 0 {
                    self.mirroring = if data & 1 != 0 {
                        MirrorMode::Horizontal
                    } else {
                        MirrorMode::Vertical
                    };
                }
                // $A001 (RAM protect) intentionally ignored: work RAM stays
                // enabled, which is what the shipped games expect.
                CpuMapWrite::Handled
            }
            0xC000..=0xDFFF => {
                if addr & 1 == 0 {
                    self.irq_reload = u16::from(data);
                } else {
                    self.irq_counter = 0;
                }
                CpuMapWrite::Handled
            }
            0xE000..=0xFFFF => {
                if addr & 1 == 0 {
                    self.irq_enabled = false;
                    self.irq_active = false;
                } else {
                    self.irq_enabled = true;
                }
                CpuMapWrite::Handled
            }
            _ => CpuMapWrite::Miss,
        }
    }

    fn map_ppu_read(&self, addr: u16) -> Option<u32> {
        if addr >= 0x2000 {
            return None;
        }
        let window = usize::from(addr >> 10);
        Some(self.chr_offsets[window] + u32::from(addr & 0x03FF))
    }

    fn map_ppu_write(&self, addr: u16) -> Option<u32> {
        if addr < 0x2000 && self.chr_banks == 0 {
            let window = usize::from(addr >> 10);
            Some(self.chr_offsets[window] + u32::from(addr & 0x03FF))
        } else {
            None
        }
    }

    fn mirroring(&self) -> MirrorMode {
        self.mirroring
    }

    fn irq_pending(&self) -> bool {
        self.irq_active
    }

    fn irq_clear(&mut self) {
        self.irq_active = false;
    }

    fn scanline(&mut self) {
        if self.irq_counter == 0 {
            self.irq_counter = self.irq_reload;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_active = true;
        }
    }

    fn reset(&mut self) {
        self.target_register = 0;
        self.prg_mode = false;
        self.chr_inversion = false;
        self.mirroring = MirrorMode::Hardware;
        self.registers = [0; 8];
        self.chr_offsets = [0; 8];
        self.irq_counter = 0;
        self.irq_reload = 0;
        self.irq_enabled = false;
        self.irq_active = false;

        let banks = self.prg_bank_count();
        self.prg_offsets = [
            0,
            0x2000,
            (banks.max(2) - 2) * 0x2000,
            (banks.max(1) - 1) * 0x2000,
        ];
    }

    fn id(&self) -> u16 {
        4
    }

    fn name(&self) -> &'static str {
        "MMC3"
    }

    fn state(&self) -> MapperState {
        MapperState::Mmc3 {
            target_register: self.target_register,
            prg_mode: self.prg_mode,
            chr_inversion: self.chr_inversion,
            registers: self.registers,
            chr_offsets: self.chr_offsets,
            prg_offsets: self.prg_offsets,
            mirroring: self.mirroring,
            irq_counter: self.irq_counter,
            irq_reload: self.irq_reload,
            irq_enabled: self.irq_enabled,
            irq_active: self.irq_active,
            prg_ram: self.prg_ram.clone(),
        }
    }

    fn restore(&mut self, state: &MapperState) {
        if let MapperState::Mmc3 {
            target_register,
            prg_mode,
            chr_inversion,
            registers,
            chr_offsets,
            prg_offsets,
            mirroring,
            irq_counter,
            irq_reload,
            irq_enabled,
            irq_active,
            prg_ram,
        } = state
        {
            self.target_register = *target_register;
            self.prg_mode = *prg_mode;
            self.chr_inversion = *chr_inversion;
            self.registers = *registers;
            self.chr_offsets = *chr_offsets;
            self.prg_offsets = *prg_offsets;
            self.mirroring = *mirroring;
            self.irq_counter = *irq_counter;
            self.irq_reload = *irq_reload;
            self.irq_enabled = *irq_enabled;
            self.irq_active = *irq_active;
            self.prg_ram.copy_from_slice(prg_ram);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::RomHeader;

    fn make(prg_banks: u16, chr_banks: u16) -> Mmc3 {
        let rom = Rom {
            header: RomHeader {
                prg_banks,
                chr_banks,
                mapper: 4,
                mirroring: MirrorMode::Vertical,
                has_battery: true,
                has_trainer: false,
                nes2: false,
            },
            prg_rom: vec![0; usize::from(prg_banks) * 16384],
            chr_rom: vec![0; usize::from(chr_banks) * 8192],
        };
        Mmc3::new(&rom)
    }

    #[test]
    fn power_up_prg_windows() {
        let mapper = make(16, 4); // 32 x 8 KiB PRG banks
        assert_eq!(mapper.map_cpu_read(0x8000), CpuMapRead::Prg(0));
        assert_eq!(mapper.map_cpu_read(0xA000), CpuMapRead::Prg(0x2000));
        assert_eq!(mapper.map_cpu_read(0xC000), CpuMapRead::Prg(30 * 0x2000));
        assert_eq!(mapper.map_cpu_read(0xE000), CpuMapRead::Prg(31 * 0x2000));
    }

    #[test]
    fn prg_bank_switch_and_mode_swap() {
        let mut mapper = make(16, 4);
        mapper.map_cpu_write(0x8000, 6);
        mapper.map_cpu_write(0x8001, 5);
        assert_eq!(mapper.map_cpu_read(0x8000), CpuMapRead::Prg(5 * 0x2000));

        // Mode 1 swaps the switchable window with the fixed one.
        mapper.map_cpu_write(0x8000, 0x46);
        assert_eq!(mapper.map_cpu_read(0x8000), CpuMapRead::Prg(30 * 0x2000));
        assert_eq!(mapper.map_cpu_read(0xC000), CpuMapRead::Prg(5 * 0x2000));
    }

    #[test]
    fn chr_inversion_swaps_pattern_halves() {
        let mut mapper = make(16, 4);
        mapper.map_cpu_write(0x8000, 0); // R0: 2 KiB bank at $0000
        mapper.map_cpu_write(0x8001, 6);
        assert_eq!(mapper.map_ppu_read(0x0000), Some(6 * 0x0400));
        assert_eq!(mapper.map_ppu_read(0x0400), Some(7 * 0x0400));

        // With inversion the 2 KiB windows move to $1000.
        mapper.map_cpu_write(0x8000, 0x80);
        assert_eq!(mapper.map_ppu_read(0x1000), Some(6 * 0x0400));
    }

    #[test]
    fn mirroring_latch() {
        let mut mapper = make(16, 4);
        mapper.map_cpu_write(0xA000, 0x01);
        assert_eq!(mapper.mirroring(), MirrorMode::Horizontal);
        mapper.map_cpu_write(0xA000, 0x00);
        assert_eq!(mapper.mirroring(), MirrorMode::Vertical);
    }

    #[test]
    fn scanline_irq_counts_down() {
        let mut mapper = make(16, 4);
        mapper.map_cpu_write(0xC000, 3); // reload value
        mapper.map_cpu_write(0xC001, 0); // force reload
        mapper.map_cpu_write(0xE001, 0); // enable

        // First notification reloads; the next three count 3 -> 0.
        for _ in 0..3 {
            mapper.scanline();
            assert!(!mapper.irq_pending());
        }
        mapper.scanline();
        assert!(mapper.irq_pending());

        mapper.irq_clear();
        assert!(!mapper.irq_pending());
    }

    #[test]
    fn irq_disable_clears_pending() {
        let mut mapper = make(16, 4);
        mapper.map_cpu_write(0xC000, 1);
        mapper.map_cpu_write(0xC001, 0);
        mapper.map_cpu_write(0xE001, 0);
        mapper.scanline();
        mapper.scanline();
        assert!(mapper.irq_pending());

        mapper.map_cpu_write(0xE000, 0);
        assert!(!mapper.irq_pending());
    }

    #[test]
    fn work_ram_round_trips() {
        let mut mapper = make(16, 4);
        mapper.map_cpu_write(0x7123, 0x99);
        assert_eq!(mapper.map_cpu_read(0x7123), CpuMapRead::Data(0x99));
    }
}
