//! Cartridge: owns the ROM/RAM arrays and delegates addressing to a mapper.

use serde::{Deserialize, Serialize};

use crate::mapper::{CpuMapRead, CpuMapWrite, Mapper, MapperState, MirrorMode};
use crate::rom::{Rom, RomError};
use crate::create_mapper;

const CHR_RAM_SIZE: usize = 8 * 1024;

/// Mutable cartridge contents captured in save states: CHR-RAM (when the
/// board has any) and the mapper register file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartridgeState {
    /// CHR-RAM contents, `None` for CHR-ROM boards.
    pub chr_ram: Option<Vec<u8>>,
    /// Mapper registers and work RAM.
    pub mapper: MapperState,
}

/// A loaded cartridge.
///
/// Owns PRG-ROM, CHR-ROM or CHR-RAM, and exactly one mapper instance. All
/// bus accesses funnel through the mapper's address translation before
/// touching the owned arrays.
pub struct Cartridge {
    prg: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    hardware_mirroring: MirrorMode,
    has_battery: bool,
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    /// Parse a .nes image and construct the matching mapper.
    ///
    /// # Errors
    ///
    /// Propagates [`RomError`] for malformed images and unsupported mappers.
    pub fn from_bytes(data: &[u8]) -> Result<Self, RomError> {
        let rom = Rom::load(data)?;
        let mapper = create_mapper(&rom)?;
        log::debug!(
            "loaded cartridge: mapper {} ({}), {} x 16K PRG, {} x 8K CHR",
            mapper.id(),
            mapper.name(),
            rom.header.prg_banks,
            rom.header.chr_banks,
        );

        let chr_is_ram = rom.chr_rom.is_empty();
        let chr = if chr_is_ram {
            vec![0; CHR_RAM_SIZE]
        } else {
            rom.chr_rom
        };

        Ok(Self {
            prg: rom.prg_rom,
            chr,
            chr_is_ram,
            hardware_mirroring: rom.header.mirroring,
            has_battery: rom.header.has_battery,
            mapper,
        })
    }

    /// CPU read. `None` when the mapper leaves the address unmapped (the
    /// bus then supplies open-bus data).
    #[must_use]
    pub fn read_cpu(&self, addr: u16) -> Option<u8> {
        match self.mapper.map_cpu_read(addr) {
            CpuMapRead::Prg(offset) => Some(self.prg_at(offset)),
            CpuMapRead::Data(value) => Some(value),
            CpuMapRead::Miss => None,
        }
    }

    /// CPU write. Returns true when the cartridge claimed the address.
    pub fn write_cpu(&mut self, addr: u16, data: u8) -> bool {
        match self.mapper.map_cpu_write(addr, data) {
            CpuMapWrite::Prg(offset) => {
                let len = self.prg.len();
                debug_assert!((offset as usize) < len, "mapper PRG offset out of range");
                self.prg[offset as usize % len] = data;
                true
            }
            CpuMapWrite::Handled => true,
            CpuMapWrite::Miss => false,
        }
    }

    /// PPU pattern-table read ($0000-$1FFF).
    #[must_use]
    pub fn read_ppu(&self, addr: u16) -> Option<u8> {
        self.mapper.map_ppu_read(addr).map(|offset| {
            let len = self.chr.len();
            debug_assert!((offset as usize) < len, "mapper CHR offset out of range");
            self.chr[offset as usize % len]
        })
    }

    /// PPU pattern-table write; lands only in CHR-RAM.
    pub fn write_ppu(&mut self, addr: u16, data: u8) -> bool {
        match self.mapper.map_ppu_write(addr) {
            Some(offset) => {
                let len = self.chr.len();
                debug_assert!((offset as usize) < len, "mapper CHR offset out of range");
                self.chr[offset as usize % len] = data;
                true
            }
            None => false,
        }
    }

    /// Effective nametable arrangement: the mapper's choice, falling back
    /// to the arrangement soldered on the board.
    #[must_use]
    pub fn mirroring(&self) -> MirrorMode {
        match self.mapper.mirroring() {
            MirrorMode::Hardware => self.hardware_mirroring,
            mode => mode,
        }
    }

    /// Scanline notification from the PPU.
    pub fn scanline(&mut self) {
        self.mapper.scanline();
    }

    /// Whether the mapper is asserting IRQ.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.mapper.irq_pending()
    }

    /// Release the mapper IRQ line.
    pub fn irq_clear(&mut self) {
        self.mapper.irq_clear();
    }

    /// Restore mapper power-up state. ROM and RAM contents are untouched.
    pub fn reset(&mut self) {
        self.mapper.reset();
    }

    /// iNES mapper number.
    #[must_use]
    pub fn mapper_id(&self) -> u16 {
        self.mapper.id()
    }

    /// Conventional board name.
    #[must_use]
    pub fn mapper_name(&self) -> &'static str {
        self.mapper.name()
    }

    /// Whether the board carries battery-backed RAM.
    #[must_use]
    pub fn has_battery(&self) -> bool {
        self.has_battery
    }

    /// Snapshot the mutable cartridge contents.
    #[must_use]
    pub fn state(&self) -> CartridgeState {
        CartridgeState {
            chr_ram: self.chr_is_ram.then(|| self.chr.clone()),
            mapper: self.mapper.state(),
        }
    }

    /// Restore a snapshot taken by [`Cartridge::state`].
    pub fn restore(&mut self, state: &CartridgeState) {
        if let (true, Some(chr)) = (self.chr_is_ram, state.chr_ram.as_ref()) {
            self.chr.copy_from_slice(chr);
        }
        self.mapper.restore(&state.mapper);
    }

    fn prg_at(&self, offset: u32) -> u8 {
        let len = self.prg.len();
        debug_assert!((offset as usize) < len, "mapper PRG offset out of range");
        self.prg[offset as usize % len]
    }
}

impl std::fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cartridge")
            .field("prg_len", &self.prg.len())
            .field("chr_len", &self.chr.len())
            .field("chr_is_ram", &self.chr_is_ram)
            .field("mapper", &self.mapper.name())
            .finish_non_exhaustive()
    }
}
