//! 2C02 PPU core.
//!
//! One call to [`Ppu::clock`] is one dot. A frame is 262 scanlines
//! (numbered -1 to 260, -1 being the pre-render line) of 341 dots, with the
//! last dot of the pre-render line skipped on odd frames while rendering is
//! enabled. The PPU owns its nametable and palette RAM and reaches pattern
//! data through a borrowed [`Cartridge`], which also supplies the effective
//! nametable mirroring.
//!
//! Output is a 256x240 frame of 6-bit palette indices (grayscale already
//! applied); the console maps them through the NTSC palette table.

use famicore_mappers::{Cartridge, MirrorMode};
use serde::{Deserialize, Serialize};

use crate::oam::{Oam, SecondaryOam};
use crate::registers::{PpuCtrl, PpuMask, PpuStatus};
use crate::scroll::Scroll;

/// Frame width in pixels.
pub const FRAME_WIDTH: usize = 256;
/// Frame height in pixels.
pub const FRAME_HEIGHT: usize = 240;

/// 2C02 PPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ppu {
    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    scroll: Scroll,

    /// 2 KiB internal nametable RAM (CIRAM).
    nametables: Vec<u8>,
    /// 32-byte palette RAM.
    palette: Vec<u8>,

    oam: Oam,
    secondary: SecondaryOam,

    // Background fetch latches
    bg_next_tile_id: u8,
    bg_next_tile_attrib: u8,
    bg_next_tile_lo: u8,
    bg_next_tile_hi: u8,

    // Background shift registers
    bg_shifter_pattern_lo: u16,
    bg_shifter_pattern_hi: u16,
    bg_shifter_attrib_lo: u16,
    bg_shifter_attrib_hi: u16,

    // Sprite shifters for the scanline in progress
    sprite_shifter_lo: [u8; 8],
    sprite_shifter_hi: [u8; 8],
    sprite_attribs: [u8; 8],
    sprite_x: [u8; 8],
    sprite_count: u8,
    sprite_zero_hit_possible: bool,
    sprite_zero_being_rendered: bool,

    scanline: i16,
    dot: u16,
    odd_frame: bool,
    frame_complete: bool,
    frame_count: u64,

    /// NMI output line, consumed by the bus.
    nmi: bool,

    /// $2007 read buffer.
    data_buffer: u8,
    /// Last value driven on the register data bus.
    open_bus: u8,

    /// 256x240 palette indices.
    frame: Vec<u8>,
}

impl Ppu {
    /// Create a PPU in the power-up state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            scroll: Scroll::new(),
            nametables: vec![0; 2048],
            palette: vec![0; 32],
            oam: Oam::new(),
            secondary: SecondaryOam::new(),
            bg_next_tile_id: 0,
            bg_next_tile_attrib: 0,
            bg_next_tile_lo: 0,
            bg_next_tile_hi: 0,
            bg_shifter_pattern_lo: 0,
            bg_shifter_pattern_hi: 0,
            bg_shifter_attrib_lo: 0,
            bg_shifter_attrib_hi: 0,
            sprite_shifter_lo: [0; 8],
            sprite_shifter_hi: [0; 8],
            sprite_attribs: [0; 8],
            sprite_x: [0; 8],
            sprite_count: 0,
            sprite_zero_hit_possible: false,
            sprite_zero_being_rendered: false,
            scanline: -1,
            dot: 0,
            odd_frame: false,
            frame_complete: false,
            frame_count: 0,
            nmi: false,
            data_buffer: 0,
            open_bus: 0,
            frame: vec![0; FRAME_WIDTH * FRAME_HEIGHT],
        }
    }

    /// Cold reset. Register state and the pipeline are cleared; nametable,
    /// palette, and OAM contents persist like the RAM they are.
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.scroll = Scroll::new();
        self.bg_next_tile_id = 0;
        self.bg_next_tile_attrib = 0;
        self.bg_next_tile_lo = 0;
        self.bg_next_tile_hi = 0;
        self.bg_shifter_pattern_lo = 0;
        self.bg_shifter_pattern_hi = 0;
        self.bg_shifter_attrib_lo = 0;
        self.bg_shifter_attrib_hi = 0;
        self.sprite_shifter_lo = [0; 8];
        self.sprite_shifter_hi = [0; 8];
        self.sprite_attribs = [0; 8];
        self.sprite_x = [0; 8];
        self.sprite_count = 0;
        self.sprite_zero_hit_possible = false;
        self.sprite_zero_being_rendered = false;
        self.scanline = -1;
        self.dot = 0;
        self.odd_frame = false;
        self.frame_complete = false;
        self.nmi = false;
        self.data_buffer = 0;
        self.open_bus = 0;
    }

    // ===== CPU register interface ==========================================

    /// Read a CPU-visible register ($2000-$2007, pre-masked to 0-7).
    pub fn cpu_read(&mut self, reg: u16, cart: &mut Cartridge) -> u8 {
        match reg & 0x07 {
            // Write-only registers return the open-bus byte.
            0 | 1 | 3 | 5 | 6 => self.open_bus,

            2 => {
                // Only bits 7-5 are driven; 4-0 float at the open-bus value.
                let value = (self.status.bits() & 0xE0) | (self.open_bus & 0x1F);
                // Reading within a dot of VBlank being raised cancels the
                // NMI for that frame (the hardware race games rely on).
                if self.scanline == 241 && self.dot <= 2 {
                    self.nmi = false;
                }
                self.status.remove(PpuStatus::VBLANK);
                self.scroll.reset_toggle();
                self.open_bus = value;
                value
            }

            4 => {
                let value = self.oam.read();
                self.open_bus = value;
                value
            }

            7 => {
                let addr = self.scroll.addr() & 0x3FFF;
                let value = self.ppu_read(addr, cart);

                let result = if addr >= 0x3F00 {
                    // Palette reads bypass the buffer, which is refilled
                    // from the nametable underneath the palette window.
                    self.data_buffer = self.ppu_read(addr - 0x1000, cart);
                    (value & 0x3F) | (self.open_bus & 0xC0)
                } else {
                    let buffered = self.data_buffer;
                    self.data_buffer = value;
                    buffered
                };

                self.scroll.increment(self.ctrl.vram_increment());
                self.open_bus = result;
                result
            }

            _ => unreachable!(),
        }
    }

    /// Write a CPU-visible register ($2000-$2007, pre-masked to 0-7).
    pub fn cpu_write(&mut self, reg: u16, value: u8, cart: &mut Cartridge) {
        self.open_bus = value;

        match reg & 0x07 {
            0 => {
                self.ctrl = PpuCtrl::from_bits_truncate(value);
                self.scroll.write_ctrl(value);
            }
            1 => {
                self.mask = PpuMask::from_bits_truncate(value);
            }
            2 => {
                log::trace!("write to read-only PPUSTATUS ignored");
            }
            3 => self.oam.set_addr(value),
            4 => self.oam.write(value),
            5 => self.scroll.write_scroll(value),
            6 => self.scroll.write_addr(value),
            7 => {
                let addr = self.scroll.addr() & 0x3FFF;
                self.ppu_write(addr, value, cart);
                self.scroll.increment(self.ctrl.vram_increment());
            }
            _ => unreachable!(),
        }
    }

    /// OAM DMA byte landing from the bus state machine.
    pub fn oam_dma_write(&mut self, offset: u8, value: u8) {
        self.oam.dma_write(offset, value);
    }

    // ===== PPU address space ===============================================

    /// Read the PPU address space: pattern tables through the cartridge,
    /// then nametables with mirroring, then palette RAM.
    #[must_use]
    pub fn ppu_read(&self, addr: u16, cart: &Cartridge) -> u8 {
        let addr = addr & 0x3FFF;
        if addr < 0x2000 {
            return cart.read_ppu(addr).unwrap_or(0);
        }
        if addr < 0x3F00 {
            let index = Self::nametable_index(cart.mirroring(), addr);
            return self.nametables[index];
        }
        self.palette[Self::palette_index(addr)]
    }

    /// Write the PPU address space.
    pub fn ppu_write(&mut self, addr: u16, value: u8, cart: &mut Cartridge) {
        let addr = addr & 0x3FFF;
        if addr < 0x2000 {
            cart.write_ppu(addr, value);
            return;
        }
        if addr < 0x3F00 {
            let index = Self::nametable_index(cart.mirroring(), addr);
            self.nametables[index] = value;
            return;
        }
        self.palette[Self::palette_index(addr)] = value;
    }

    /// Resolve a $2000-$3EFF address into the 2 KiB nametable RAM.
    fn nametable_index(mode: MirrorMode, addr: u16) -> usize {
        let addr = addr & 0x0FFF;
        let offset = usize::from(addr & 0x03FF);
        let table = match mode {
            MirrorMode::Vertical | MirrorMode::FourScreen => usize::from((addr >> 10) & 1),
            MirrorMode::Horizontal => usize::from((addr >> 11) & 1),
            MirrorMode::SingleLow => 0,
            MirrorMode::SingleHigh => 1,
            // The cartridge resolves Hardware before it reaches us.
            MirrorMode::Hardware => unreachable!("unresolved hardware mirroring"),
        };
        table * 0x400 + offset
    }

    /// Resolve a $3F00-$3FFF address into the 32-byte palette RAM,
    /// honoring the $10/$14/$18/$1C aliases.
    fn palette_index(addr: u16) -> usize {
        let mut index = usize::from(addr & 0x1F);
        if index >= 0x10 && index % 4 == 0 {
            index -= 0x10;
        }
        index
    }

    /// Palette lookup for a composed pixel, grayscale mask applied.
    fn color_index(&self, palette: u8, pixel: u8) -> u8 {
        let entry = self.palette[Self::palette_index(0x3F00 + (u16::from(palette) << 2) + u16::from(pixel))];
        entry & if self.mask.grayscale() { 0x30 } else { 0x3F }
    }

    // ===== rendering pipeline ==============================================

    /// Advance one dot.
    #[allow(clippy::too_many_lines)] // the dot dispatch reads best as one unit
    pub fn clock(&mut self, cart: &mut Cartridge) {
        if self.scanline < 240 {
            // Pre-render and visible scanlines drive the fetch pipeline.
            if self.scanline == -1 && self.dot == 1 {
                self.status = PpuStatus::empty();
                self.sprite_shifter_lo = [0; 8];
                self.sprite_shifter_hi = [0; 8];
                self.sprite_count = 0;
            }

            if (self.dot >= 2 && self.dot < 258) || (self.dot >= 321 && self.dot < 338) {
                self.update_shifters();

                match (self.dot - 1) % 8 {
                    0 => {
                        self.load_background_shifters();
                        self.bg_next_tile_id = self.ppu_read(self.scroll.nametable_addr(), cart);
                    }
                    2 => {
                        let attrib = self.ppu_read(self.scroll.attribute_addr(), cart);
                        let shift = ((self.scroll.coarse_y() & 0x02) << 1)
                            | (self.scroll.coarse_x() & 0x02);
                        self.bg_next_tile_attrib = (attrib >> shift) & 0x03;
                    }
                    4 => {
                        let addr = self.ctrl.bg_table_addr()
                            + (u16::from(self.bg_next_tile_id) << 4)
                            + u16::from(self.scroll.fine_y());
                        self.bg_next_tile_lo = self.ppu_read(addr, cart);
                    }
                    6 => {
                        let addr = self.ctrl.bg_table_addr()
                            + (u16::from(self.bg_next_tile_id) << 4)
                            + u16::from(self.scroll.fine_y())
                            + 8;
                        self.bg_next_tile_hi = self.ppu_read(addr, cart);
                    }
                    7 => {
                        if self.mask.rendering_enabled() {
                            self.scroll.increment_x();
                        }
                    }
                    _ => {}
                }
            }

            if self.dot == 256 && self.mask.rendering_enabled() {
                self.scroll.increment_y();
            }

            if self.dot == 257 {
                self.load_background_shifters();
                if self.mask.rendering_enabled() {
                    self.scroll.copy_horizontal();
                }
            }

            // Superfluous nametable fetches at the end of the line.
            if self.dot == 338 || self.dot == 340 {
                self.bg_next_tile_id = self.ppu_read(self.scroll.nametable_addr(), cart);
            }

            if self.scanline == -1 && self.dot >= 280 && self.dot < 305 && self.mask.rendering_enabled()
            {
                self.scroll.copy_vertical();
            }

            // MMC3-style scanline counters tick once per rendered line.
            if self.dot == 260 && self.mask.rendering_enabled() {
                cart.scanline();
            }

            // Sprite evaluation for the next scanline.
            if self.dot == 257 && self.scanline >= 0 {
                self.evaluate_sprites();
            }
            if self.dot == 340 {
                self.fetch_sprite_patterns(cart);
            }
        }

        if self.scanline == 241 && self.dot == 1 {
            self.status.insert(PpuStatus::VBLANK);
            if self.ctrl.nmi_enabled() {
                self.nmi = true;
            }
        }

        // Compose the pixel under the beam.
        if self.scanline >= 0 && self.scanline < 240 && self.dot >= 1 && self.dot <= 256 {
            self.render_pixel();
        }

        self.advance_dot();
    }

    /// Move to the next dot, handling the odd-frame skip and frame wrap.
    fn advance_dot(&mut self) {
        self.dot += 1;

        // The pre-render line loses its last dot on odd rendered frames.
        let skip_tail = self.scanline == -1
            && self.dot == 340
            && self.odd_frame
            && self.mask.rendering_enabled();

        if self.dot > 340 || skip_tail {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline > 260 {
                self.scanline = -1;
                self.frame_complete = true;
                self.odd_frame = !self.odd_frame;
                self.frame_count += 1;
            }
        }
    }

    /// Move the top of the fetch latches into the shift registers.
    fn load_background_shifters(&mut self) {
        self.bg_shifter_pattern_lo =
            (self.bg_shifter_pattern_lo & 0xFF00) | u16::from(self.bg_next_tile_lo);
        self.bg_shifter_pattern_hi =
            (self.bg_shifter_pattern_hi & 0xFF00) | u16::from(self.bg_next_tile_hi);

        // Attribute bits are inflated to full bytes so they shift in step
        // with the pattern bits.
        let attrib_lo = if self.bg_next_tile_attrib & 0x01 != 0 { 0xFF } else { 0x00 };
        let attrib_hi = if self.bg_next_tile_attrib & 0x02 != 0 { 0xFF } else { 0x00 };
        self.bg_shifter_attrib_lo = (self.bg_shifter_attrib_lo & 0xFF00) | attrib_lo;
        self.bg_shifter_attrib_hi = (self.bg_shifter_attrib_hi & 0xFF00) | attrib_hi;
    }

    fn update_shifters(&mut self) {
        if self.mask.show_background() {
            self.bg_shifter_pattern_lo <<= 1;
            self.bg_shifter_pattern_hi <<= 1;
            self.bg_shifter_attrib_lo <<= 1;
            self.bg_shifter_attrib_hi <<= 1;
        }

        if self.mask.show_sprites() && self.dot >= 1 && self.dot < 258 {
            for i in 0..usize::from(self.sprite_count) {
                if self.sprite_x[i] > 0 {
                    self.sprite_x[i] -= 1;
                } else {
                    self.sprite_shifter_lo[i] <<= 1;
                    self.sprite_shifter_hi[i] <<= 1;
                }
            }
        }
    }

    /// Dot-257 sprite evaluation: scan primary OAM in order for sprites in
    /// range of the next scanline, stage the first eight, and run the
    /// hardware's buggy diagonal scan for the overflow flag.
    fn evaluate_sprites(&mut self) {
        self.secondary.clear();
        self.sprite_shifter_lo = [0; 8];
        self.sprite_shifter_hi = [0; 8];
        self.sprite_count = 0;
        self.sprite_zero_hit_possible = false;

        let height = i16::from(self.ctrl.sprite_height());
        let mut entry = 0usize;
        while entry < 64 && self.sprite_count < 8 {
            let sprite = self.oam.sprite(entry);
            let diff = self.scanline - i16::from(sprite.y);
            if diff >= 0 && diff < height {
                if entry == 0 {
                    self.sprite_zero_hit_possible = true;
                }
                self.secondary.push(sprite);
                self.sprite_count += 1;
            }
            entry += 1;
        }

        if self.sprite_count == 8 {
            // Ninth-sprite search. Once eight are found the hardware starts
            // misindexing OAM, advancing the byte offset alongside the
            // entry, so the "Y" it tests usually isn't a Y at all.
            let mut m = 0usize;
            while entry < 64 {
                let y = self.oam.byte(entry * 4 + m);
                let diff = self.scanline - i16::from(y);
                if diff >= 0 && diff < height {
                    self.status.insert(PpuStatus::SPRITE_OVERFLOW);
                    break;
                }
                entry += 1;
                m = (m + 1) & 3;
            }
        }
    }

    /// Dot-340 sprite pattern fetch for the staged sprites.
    fn fetch_sprite_patterns(&mut self, cart: &Cartridge) {
        for i in 0..usize::from(self.sprite_count) {
            let sprite = self.secondary.sprite(i);
            let row = (self.scanline - i16::from(sprite.y)) as u16;

            let addr_lo = if self.ctrl.sprite_height() == 8 {
                let row = if sprite.flip_vertical() { 7 - row } else { row };
                self.ctrl.sprite_table_addr() | (u16::from(sprite.tile) << 4) | row
            } else {
                // 8x16: bit 0 of the tile index picks the pattern table and
                // the fetch switches tiles halfway down.
                let row = if sprite.flip_vertical() { 15 - row } else { row };
                let table = u16::from(sprite.tile & 0x01) << 12;
                let tile = u16::from(sprite.tile & 0xFE) + (row >> 3);
                table | (tile << 4) | (row & 0x07)
            };

            let mut pattern_lo = self.ppu_read(addr_lo, cart);
            let mut pattern_hi = self.ppu_read(addr_lo + 8, cart);
            if sprite.flip_horizontal() {
                pattern_lo = pattern_lo.reverse_bits();
                pattern_hi = pattern_hi.reverse_bits();
            }

            self.sprite_shifter_lo[i] = pattern_lo;
            self.sprite_shifter_hi[i] = pattern_hi;
            self.sprite_attribs[i] = sprite.attributes;
            self.sprite_x[i] = sprite.x;
        }
    }

    /// Compose and store the pixel at (dot-1, scanline).
    fn render_pixel(&mut self) {
        let mut bg_pixel = 0u8;
        let mut bg_palette = 0u8;

        if self.mask.show_background() && (self.mask.show_background_left() || self.dot >= 9) {
            let mux = 0x8000u16 >> self.scroll.fine_x();
            let p0 = u8::from(self.bg_shifter_pattern_lo & mux != 0);
            let p1 = u8::from(self.bg_shifter_pattern_hi & mux != 0);
            bg_pixel = (p1 << 1) | p0;

            let a0 = u8::from(self.bg_shifter_attrib_lo & mux != 0);
            let a1 = u8::from(self.bg_shifter_attrib_hi & mux != 0);
            bg_palette = (a1 << 1) | a0;
        }

        let mut fg_pixel = 0u8;
        let mut fg_palette = 0u8;
        let mut fg_priority = false;
        self.sprite_zero_being_rendered = false;

        if self.mask.show_sprites() && (self.mask.show_sprites_left() || self.dot >= 9) {
            for i in 0..usize::from(self.sprite_count) {
                if self.sprite_x[i] != 0 {
                    continue;
                }
                let p0 = u8::from(self.sprite_shifter_lo[i] & 0x80 != 0);
                let p1 = u8::from(self.sprite_shifter_hi[i] & 0x80 != 0);
                let pixel = (p1 << 1) | p0;
                if pixel != 0 {
                    // First opaque sprite in OAM order wins.
                    fg_pixel = pixel;
                    fg_palette = (self.sprite_attribs[i] & 0x03) + 4;
                    fg_priority = self.sprite_attribs[i] & 0x20 == 0;
                    if i == 0 {
                        self.sprite_zero_being_rendered = true;
                    }
                    break;
                }
            }
        }

        let (pixel, palette) = match (bg_pixel, fg_pixel) {
            (0, 0) => (0, 0),
            (0, _) => (fg_pixel, fg_palette),
            (_, 0) => (bg_pixel, bg_palette),
            _ => {
                self.check_sprite_zero_hit();
                if fg_priority {
                    (fg_pixel, fg_palette)
                } else {
                    (bg_pixel, bg_palette)
                }
            }
        };

        let x = usize::from(self.dot - 1);
        let y = self.scanline as usize;
        self.frame[y * FRAME_WIDTH + x] = self.color_index(palette, pixel);
    }

    /// Raise the sprite-zero-hit flag when sprite zero supplied the opaque
    /// foreground pixel inside the valid dot window.
    fn check_sprite_zero_hit(&mut self) {
        if !(self.sprite_zero_hit_possible && self.sprite_zero_being_rendered) {
            return;
        }
        if !(self.mask.show_background() && self.mask.show_sprites()) {
            return;
        }
        let window = if self.mask.show_background_left() && self.mask.show_sprites_left() {
            2..=255
        } else {
            9..=255
        };
        if window.contains(&self.dot) {
            self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
        }
    }

    // ===== outputs and debug accessors =====================================

    /// Consume the NMI output line.
    pub fn take_nmi(&mut self) -> bool {
        let nmi = self.nmi;
        self.nmi = false;
        nmi
    }

    /// Frame-complete flag, set once per wrap past scanline 260.
    #[must_use]
    pub fn frame_complete(&self) -> bool {
        self.frame_complete
    }

    /// Acknowledge the frame-complete flag.
    pub fn clear_frame_complete(&mut self) {
        self.frame_complete = false;
    }

    /// 256x240 frame of 6-bit palette indices, row-major from the top left.
    #[must_use]
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Frames rendered since power-up.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Current scanline (-1 to 260).
    #[must_use]
    pub fn scanline(&self) -> i16 {
        self.scanline
    }

    /// Current dot (0 to 340).
    #[must_use]
    pub fn dot(&self) -> u16 {
        self.dot
    }

    /// Status register snapshot (no read side effects).
    #[must_use]
    pub fn status(&self) -> PpuStatus {
        self.status
    }

    /// Control register snapshot.
    #[must_use]
    pub fn ctrl(&self) -> PpuCtrl {
        self.ctrl
    }

    /// Mask register snapshot.
    #[must_use]
    pub fn mask(&self) -> PpuMask {
        self.mask
    }

    /// Current VRAM address (debug).
    #[must_use]
    pub fn vram_addr(&self) -> u16 {
        self.scroll.addr()
    }

    /// Temporary VRAM address (debug).
    #[must_use]
    pub fn temp_addr(&self) -> u16 {
        self.scroll.temp_addr()
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// NROM cart with CHR-RAM so tests can write pattern data.
    fn test_cart() -> Cartridge {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 0, 0x00, 0x00];
        data.extend_from_slice(&[0; 8]);
        data.extend(std::iter::repeat(0u8).take(16384));
        Cartridge::from_bytes(&data).unwrap()
    }

    fn vertical_cart() -> Cartridge {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 0, 0x01, 0x00];
        data.extend_from_slice(&[0; 8]);
        data.extend(std::iter::repeat(0u8).take(16384));
        Cartridge::from_bytes(&data).unwrap()
    }

    fn step_to(ppu: &mut Ppu, cart: &mut Cartridge, scanline: i16, dot: u16) {
        while !(ppu.scanline() == scanline && ppu.dot() == dot) {
            ppu.clock(cart);
        }
    }

    /// Park every OAM entry off-screen, the way test ROMs initialize it.
    /// A zeroed OAM would otherwise put 64 phantom sprites on line zero.
    fn park_oam(ppu: &mut Ppu, cart: &mut Cartridge) {
        ppu.cpu_write(3, 0x00, cart);
        for _ in 0..256 {
            ppu.cpu_write(4, 0xF0, cart);
        }
        ppu.cpu_write(3, 0x00, cart);
    }

    #[test]
    fn double_addr_write_then_data_write() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();

        ppu.cpu_write(6, 0x21, &mut cart);
        ppu.cpu_write(6, 0x08, &mut cart);
        assert_eq!(ppu.vram_addr(), 0x2108);

        ppu.cpu_write(7, 0x5A, &mut cart);
        assert_eq!(ppu.ppu_read(0x2108, &cart), 0x5A);
        assert_eq!(ppu.vram_addr(), 0x2109);
    }

    #[test]
    fn data_reads_are_buffered_except_palette() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();

        ppu.cpu_write(6, 0x21, &mut cart);
        ppu.cpu_write(6, 0x00, &mut cart);
        ppu.cpu_write(7, 0x77, &mut cart);

        ppu.cpu_write(6, 0x21, &mut cart);
        ppu.cpu_write(6, 0x00, &mut cart);
        let first = ppu.cpu_read(7, &mut cart); // stale buffer
        let second = ppu.cpu_read(7, &mut cart);
        assert_ne!(first, 0x77);
        assert_eq!(second, 0x77);

        // Palette reads are immediate.
        ppu.cpu_write(6, 0x3F, &mut cart);
        ppu.cpu_write(6, 0x01, &mut cart);
        ppu.cpu_write(7, 0x2A, &mut cart);
        ppu.cpu_write(6, 0x3F, &mut cart);
        ppu.cpu_write(6, 0x01, &mut cart);
        assert_eq!(ppu.cpu_read(7, &mut cart) & 0x3F, 0x2A);
    }

    #[test]
    fn status_read_clears_vblank_and_toggle() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();

        step_to(&mut ppu, &mut cart, 241, 2);
        assert!(ppu.status().in_vblank());

        ppu.cpu_write(6, 0x21, &mut cart); // toggle now true
        let value = ppu.cpu_read(2, &mut cart);
        assert_ne!(value & 0x80, 0);
        assert!(!ppu.status().in_vblank());

        // Toggle was reset, so these two writes form a fresh pair.
        ppu.cpu_write(6, 0x21, &mut cart);
        ppu.cpu_write(6, 0x00, &mut cart);
        assert_eq!(ppu.vram_addr(), 0x2100);
    }

    #[test]
    fn vblank_and_nmi_at_241_1() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();
        ppu.cpu_write(0, 0x80, &mut cart); // enable NMI

        step_to(&mut ppu, &mut cart, 241, 1);
        assert!(!ppu.status().in_vblank());
        ppu.clock(&mut cart); // processes dot 1
        assert!(ppu.status().in_vblank());
        assert!(ppu.take_nmi());
        assert!(!ppu.take_nmi()); // consumed
    }

    #[test]
    fn prerender_clears_flags() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();
        step_to(&mut ppu, &mut cart, 241, 2);
        assert!(ppu.status().in_vblank());

        step_to(&mut ppu, &mut cart, -1, 2);
        assert!(!ppu.status().in_vblank());
        assert!(!ppu.status().contains(PpuStatus::SPRITE_ZERO_HIT));
    }

    #[test]
    fn frame_is_341_by_262_dots_when_rendering_disabled() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();

        let mut dots = 0u32;
        while !ppu.frame_complete() {
            ppu.clock(&mut cart);
            dots += 1;
        }
        assert_eq!(dots, 341 * 262);
    }

    #[test]
    fn odd_frames_drop_one_dot_when_rendering() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();
        ppu.cpu_write(1, 0x08, &mut cart); // show background

        // First frame (even): full length.
        let mut dots = 0u32;
        while !ppu.frame_complete() {
            ppu.clock(&mut cart);
            dots += 1;
        }
        assert_eq!(dots, 341 * 262);
        ppu.clear_frame_complete();

        // Second frame (odd): one dot shorter.
        dots = 0;
        while !ppu.frame_complete() {
            ppu.clock(&mut cart);
            dots += 1;
        }
        assert_eq!(dots, 341 * 262 - 1);
    }

    #[test]
    fn palette_aliases_mirror_backdrop_entries() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();

        ppu.ppu_write(0x3F10, 0x2C, &mut cart);
        assert_eq!(ppu.ppu_read(0x3F00, &cart), 0x2C);

        ppu.ppu_write(0x3F04, 0x1A, &mut cart);
        assert_eq!(ppu.ppu_read(0x3F14, &cart), 0x1A);

        // Non-aliased entries stay independent.
        ppu.ppu_write(0x3F01, 0x11, &mut cart);
        ppu.ppu_write(0x3F11, 0x22, &mut cart);
        assert_eq!(ppu.ppu_read(0x3F01, &cart), 0x11);
        assert_eq!(ppu.ppu_read(0x3F11, &cart), 0x22);
    }

    #[test]
    fn vertical_mirroring_pairs_tables() {
        let mut ppu = Ppu::new();
        let mut cart = vertical_cart();

        ppu.ppu_write(0x2000, 0xAB, &mut cart);
        assert_eq!(ppu.ppu_read(0x2800, &cart), 0xAB);
        assert_eq!(ppu.ppu_read(0x2400, &cart), 0x00);

        ppu.ppu_write(0x2400, 0xCD, &mut cart);
        assert_eq!(ppu.ppu_read(0x2C00, &cart), 0xCD);
    }

    #[test]
    fn horizontal_mirroring_pairs_tables() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();

        ppu.ppu_write(0x2000, 0xAB, &mut cart);
        assert_eq!(ppu.ppu_read(0x2400, &cart), 0xAB);
        assert_eq!(ppu.ppu_read(0x2800, &cart), 0x00);
    }

    #[test]
    fn sprites_above_screen_bottom_never_evaluate() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();
        ppu.cpu_write(1, 0x18, &mut cart); // enable rendering
        park_oam(&mut ppu, &mut cart);

        // Sprite 0 at Y = 0xEF can only match scanlines >= 239, whose
        // output line (240) is never rendered.
        ppu.cpu_write(3, 0x00, &mut cart);
        for byte in [0xEF, 0x01, 0x00, 0x40] {
            ppu.cpu_write(4, byte, &mut cart);
        }

        // Run a full frame; the staged sprite count after every visible
        // evaluation except line 239's must stay zero.
        let mut staged = 0u32;
        loop {
            ppu.clock(&mut cart);
            if ppu.scanline() >= 0 && ppu.scanline() < 239 && ppu.dot() == 258 {
                staged += u32::from(ppu.sprite_count);
            }
            if ppu.frame_complete() {
                break;
            }
        }
        assert_eq!(staged, 0);
    }

    #[test]
    fn nine_sprites_on_a_line_raise_overflow() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();
        ppu.cpu_write(1, 0x18, &mut cart);
        park_oam(&mut ppu, &mut cart);

        // Nine sprites all at Y = 0x10.
        ppu.cpu_write(3, 0x00, &mut cart);
        for i in 0..9u8 {
            for byte in [0x10, i, 0x00, 0x08 * i] {
                ppu.cpu_write(4, byte, &mut cart);
            }
        }

        step_to(&mut ppu, &mut cart, 0x18, 258);
        assert!(ppu.status().contains(PpuStatus::SPRITE_OVERFLOW));
    }

    #[test]
    fn eight_sprites_do_not_raise_overflow() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();
        ppu.cpu_write(1, 0x18, &mut cart);
        park_oam(&mut ppu, &mut cart);

        ppu.cpu_write(3, 0x00, &mut cart);
        for i in 0..8u8 {
            for byte in [0x10, i, 0x00, 0x08 * i] {
                ppu.cpu_write(4, byte, &mut cart);
            }
        }

        step_to(&mut ppu, &mut cart, 0x18, 258);
        assert!(!ppu.status().contains(PpuStatus::SPRITE_OVERFLOW));
    }

    #[test]
    fn sprite_zero_hit_on_overlap() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();

        // Solid tile 1 in CHR-RAM: all pattern-low bits set.
        for row in 0..8 {
            ppu.ppu_write(0x0010 + row, 0xFF, &mut cart);
        }
        // Background: tile 1 everywhere in nametable 0.
        for offset in 0..960u16 {
            ppu.ppu_write(0x2000 + offset, 0x01, &mut cart);
        }
        park_oam(&mut ppu, &mut cart);
        // Sprite 0 at (32, 32) using tile 1.
        ppu.cpu_write(3, 0x00, &mut cart);
        for byte in [32, 0x01, 0x00, 32] {
            ppu.cpu_write(4, byte, &mut cart);
        }
        // Enable both layers including the left column.
        ppu.cpu_write(1, 0x1E, &mut cart);

        // Run past the sprite row.
        step_to(&mut ppu, &mut cart, 40, 0);
        assert!(ppu.status().contains(PpuStatus::SPRITE_ZERO_HIT));
    }

    #[test]
    fn sprite_zero_hit_requires_both_layers() {
        let mut ppu = Ppu::new();
        let mut cart = test_cart();

        for row in 0..8 {
            ppu.ppu_write(0x0010 + row, 0xFF, &mut cart);
        }
        for offset in 0..960u16 {
            ppu.ppu_write(0x2000 + offset, 0x01, &mut cart);
        }
        park_oam(&mut ppu, &mut cart);
        ppu.cpu_write(3, 0x00, &mut cart);
        for byte in [32, 0x01, 0x00, 32] {
            ppu.cpu_write(4, byte, &mut cart);
        }
        // Sprites only.
        ppu.cpu_write(1, 0x16, &mut cart);

        step_to(&mut ppu, &mut cart, 40, 0);
        assert!(!ppu.status().contains(PpuStatus::SPRITE_ZERO_HIT));
    }
}
