//! CPU-visible PPU register definitions (PPUCTRL, PPUMASK, PPUSTATUS).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// PPUCTRL ($2000) - write only.
    ///
    /// ```text
    /// 7  bit  0
    /// ---- ----
    /// VPHB SINN
    /// |||| ||++- Base nametable address
    /// |||| |+--- VRAM increment per PPUDATA access (0: +1, 1: +32)
    /// |||| +---- Sprite pattern table (8x8 sprites only)
    /// |||+------ Background pattern table
    /// ||+------- Sprite size (0: 8x8, 1: 8x16)
    /// |+-------- Master/slave (unused)
    /// +--------- Generate NMI at start of vertical blank
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct PpuCtrl: u8 {
        /// Nametable select, X bit.
        const NAMETABLE_X = 0b0000_0001;
        /// Nametable select, Y bit.
        const NAMETABLE_Y = 0b0000_0010;
        /// VRAM address increment mode.
        const VRAM_INCREMENT = 0b0000_0100;
        /// Sprite pattern table select (ignored for 8x16 sprites).
        const SPRITE_TABLE = 0b0000_1000;
        /// Background pattern table select.
        const BG_TABLE = 0b0001_0000;
        /// Sprite size select.
        const SPRITE_SIZE = 0b0010_0000;
        /// Master/slave select (no effect on a stock console).
        const MASTER_SLAVE = 0b0100_0000;
        /// NMI on vertical blank.
        const NMI_ENABLE = 0b1000_0000;
    }
}

impl PpuCtrl {
    /// VRAM increment applied after each $2007 access.
    #[inline]
    #[must_use]
    pub fn vram_increment(self) -> u16 {
        if self.contains(Self::VRAM_INCREMENT) {
            32
        } else {
            1
        }
    }

    /// Sprite pattern table base for 8x8 sprites.
    #[inline]
    #[must_use]
    pub fn sprite_table_addr(self) -> u16 {
        if self.contains(Self::SPRITE_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    /// Background pattern table base.
    #[inline]
    #[must_use]
    pub fn bg_table_addr(self) -> u16 {
        if self.contains(Self::BG_TABLE) {
            0x1000
        } else {
            0x0000
        }
    }

    /// Sprite height in pixels (8 or 16).
    #[inline]
    #[must_use]
    pub fn sprite_height(self) -> u8 {
        if self.contains(Self::SPRITE_SIZE) {
            16
        } else {
            8
        }
    }

    /// Whether VBlank raises NMI.
    #[inline]
    #[must_use]
    pub fn nmi_enabled(self) -> bool {
        self.contains(Self::NMI_ENABLE)
    }
}

bitflags! {
    /// PPUMASK ($2001) - write only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct PpuMask: u8 {
        /// Grayscale: palette reads are ANDed with $30.
        const GRAYSCALE = 0b0000_0001;
        /// Show background in the left 8 pixels.
        const BG_LEFT = 0b0000_0010;
        /// Show sprites in the left 8 pixels.
        const SPRITES_LEFT = 0b0000_0100;
        /// Background rendering enable.
        const SHOW_BG = 0b0000_1000;
        /// Sprite rendering enable.
        const SHOW_SPRITES = 0b0001_0000;
        /// Emphasize red.
        const EMPHASIZE_RED = 0b0010_0000;
        /// Emphasize green.
        const EMPHASIZE_GREEN = 0b0100_0000;
        /// Emphasize blue.
        const EMPHASIZE_BLUE = 0b1000_0000;
    }
}

impl PpuMask {
    /// Background enabled.
    #[inline]
    #[must_use]
    pub fn show_background(self) -> bool {
        self.contains(Self::SHOW_BG)
    }

    /// Sprites enabled.
    #[inline]
    #[must_use]
    pub fn show_sprites(self) -> bool {
        self.contains(Self::SHOW_SPRITES)
    }

    /// Background visible in the left column.
    #[inline]
    #[must_use]
    pub fn show_background_left(self) -> bool {
        self.contains(Self::BG_LEFT)
    }

    /// Sprites visible in the left column.
    #[inline]
    #[must_use]
    pub fn show_sprites_left(self) -> bool {
        self.contains(Self::SPRITES_LEFT)
    }

    /// Either layer enabled; gates the whole rendering pipeline.
    #[inline]
    #[must_use]
    pub fn rendering_enabled(self) -> bool {
        self.intersects(Self::SHOW_BG.union(Self::SHOW_SPRITES))
    }

    /// Grayscale output selected.
    #[inline]
    #[must_use]
    pub fn grayscale(self) -> bool {
        self.contains(Self::GRAYSCALE)
    }
}

bitflags! {
    /// PPUSTATUS ($2002) - read only. The low five bits are open bus.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct PpuStatus: u8 {
        /// More than eight sprites were found on a scanline.
        const SPRITE_OVERFLOW = 0b0010_0000;
        /// Opaque sprite-zero pixel overlapped an opaque background pixel.
        const SPRITE_ZERO_HIT = 0b0100_0000;
        /// Currently in vertical blank.
        const VBLANK = 0b1000_0000;
    }
}

impl PpuStatus {
    /// In vertical blank.
    #[inline]
    #[must_use]
    pub fn in_vblank(self) -> bool {
        self.contains(Self::VBLANK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_accessors() {
        let ctrl = PpuCtrl::from_bits_truncate(0x90);
        assert!(ctrl.nmi_enabled());
        assert_eq!(ctrl.bg_table_addr(), 0x1000);
        assert_eq!(ctrl.vram_increment(), 1);
        assert_eq!(ctrl.sprite_height(), 8);

        let ctrl = PpuCtrl::from_bits_truncate(0x24);
        assert_eq!(ctrl.vram_increment(), 32);
        assert_eq!(ctrl.sprite_height(), 16);
    }

    #[test]
    fn mask_rendering_gate() {
        assert!(!PpuMask::empty().rendering_enabled());
        assert!(PpuMask::SHOW_BG.rendering_enabled());
        assert!(PpuMask::SHOW_SPRITES.rendering_enabled());
    }

    #[test]
    fn status_flag_bits() {
        let status = PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT;
        assert_eq!(status.bits() & 0xE0, 0xC0);
        assert!(status.in_vblank());
    }
}
