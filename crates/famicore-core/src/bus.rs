//! System bus: memory maps, controllers, OAM DMA, and the master clock.
//!
//! The bus owns every component. The CPU sits beside a [`Devices`] struct
//! holding its peers, so `cpu.tick(&mut devices)` borrows cleanly: the CPU
//! itself holds no reference back into the system.
//!
//! One [`SystemBus::tick`] is one PPU dot. The CPU (or the OAM DMA engine
//! in its place) runs on every third tick and the APU once per CPU slot,
//! all driven from a single monotonic counter so the 1:3 interleave is
//! exact and reproducible.

use famicore_apu::Apu;
use famicore_cpu::{Bus, Cpu};
use famicore_mappers::{Cartridge, CartridgeState};
use famicore_ppu::Ppu;
use serde::{Deserialize, Serialize};

/// Everything on the bus except the CPU; this is the address space the CPU
/// executes against.
pub struct Devices {
    /// 2 KiB work RAM, mirrored four times across $0000-$1FFF.
    pub(crate) ram: Vec<u8>,
    /// Picture processing unit.
    pub(crate) ppu: Ppu,
    /// Audio processing unit.
    pub(crate) apu: Apu,
    /// Cartridge (PRG/CHR plus mapper).
    pub(crate) cart: Cartridge,

    /// Externally injected button bytes, one per controller.
    pub(crate) controllers: [u8; 2],
    /// Controller shift registers, latched by $4016 writes.
    controller_shift: [u8; 2],

    // OAM DMA phase machine
    dma_page: u8,
    dma_addr: u8,
    dma_data: u8,
    dma_dummy: bool,
    dma_active: bool,

    /// Master clock: counts PPU dots since power-up.
    clock_counter: u64,
    /// Last value driven on the CPU data bus.
    open_bus: u8,
    /// Most recent APU output sample.
    audio_sample: f32,
}

impl Devices {
    fn new(cart: Cartridge) -> Self {
        Self {
            ram: vec![0; 2048],
            ppu: Ppu::new(),
            apu: Apu::new(),
            cart,
            controllers: [0; 2],
            controller_shift: [0; 2],
            dma_page: 0,
            dma_addr: 0,
            dma_data: 0,
            dma_dummy: true,
            dma_active: false,
            clock_counter: 0,
            open_bus: 0,
            audio_sample: 0.0,
        }
    }

    fn read_controller(&mut self, addr: u16) -> u8 {
        let port = usize::from(addr & 0x01);
        let bit = u8::from(self.controller_shift[port] & 0x80 != 0);
        self.controller_shift[port] <<= 1;
        // Only bit 0 is driven; the rest floats at the open-bus value.
        (self.open_bus & 0xE0) | bit
    }
}

impl Bus for Devices {
    fn read(&mut self, addr: u16) -> u8 {
        let value = if let Some(data) = self.cart.read_cpu(addr) {
            data
        } else {
            match addr {
                0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)],
                0x2000..=0x3FFF => self.ppu.cpu_read(addr & 0x0007, &mut self.cart),
                0x4015 => self.apu.read_status(),
                0x4016 | 0x4017 => self.read_controller(addr),
                // Write-only and unmapped regions read back the open bus.
                _ => self.open_bus,
            }
        };

        self.open_bus = value;
        value
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.open_bus = value;

        if self.cart.write_cpu(addr, value) {
            return;
        }

        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)] = value,
            0x2000..=0x3FFF => self.ppu.cpu_write(addr & 0x0007, value, &mut self.cart),
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, value),
            0x4014 => {
                // Latch the source page and arm the DMA engine; the
                // transfer itself runs on the bus clock.
                self.dma_page = value;
                self.dma_addr = 0;
                self.dma_dummy = true;
                self.dma_active = true;
            }
            0x4016 => {
                self.controller_shift[0] = self.controllers[0];
                self.controller_shift[1] = self.controllers[1];
            }
            _ => {}
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        if let Some(data) = self.cart.read_cpu(addr) {
            return data;
        }
        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)],
            0x4015 => self.apu.peek_status(),
            // PPU and controller reads have side effects; report open bus.
            _ => self.open_bus,
        }
    }
}

/// Serialized mutable state of the whole machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub(crate) cpu: Cpu,
    pub(crate) ram: Vec<u8>,
    pub(crate) ppu: Ppu,
    pub(crate) apu: Apu,
    pub(crate) cart: CartridgeState,
    pub(crate) controllers: [u8; 2],
    pub(crate) controller_shift: [u8; 2],
    pub(crate) dma_page: u8,
    pub(crate) dma_addr: u8,
    pub(crate) dma_data: u8,
    pub(crate) dma_dummy: bool,
    pub(crate) dma_active: bool,
    pub(crate) clock_counter: u64,
    pub(crate) open_bus: u8,
    pub(crate) audio_sample: f32,
}

/// The system bus: CPU plus every peer device, advanced in lock-step.
pub struct SystemBus {
    cpu: Cpu,
    devices: Devices,
}

impl SystemBus {
    /// Wire a bus around a cartridge and run the reset sequence.
    pub fn new(cart: Cartridge) -> Self {
        let mut bus = Self {
            cpu: Cpu::new(),
            devices: Devices::new(cart),
        };
        bus.cpu.reset(&mut bus.devices);
        bus
    }

    /// Cold reset. RAM and ROM contents persist; every register file
    /// returns to its documented power-up value.
    pub fn reset(&mut self) {
        self.devices.cart.reset();
        self.devices.ppu.reset();
        self.devices.apu.reset();
        self.devices.controller_shift = [0; 2];
        self.devices.dma_page = 0;
        self.devices.dma_addr = 0;
        self.devices.dma_data = 0;
        self.devices.dma_dummy = true;
        self.devices.dma_active = false;
        self.devices.clock_counter = 0;
        self.devices.open_bus = 0;
        self.devices.audio_sample = 0.0;
        self.cpu.reset(&mut self.devices);
    }

    /// Advance the machine by one PPU dot.
    ///
    /// Returns true when a CPU instruction retired on this tick.
    pub fn tick(&mut self) -> bool {
        let devices = &mut self.devices;

        {
            let Devices { ppu, cart, .. } = devices;
            ppu.clock(cart);
        }

        let mut retired = false;
        if devices.clock_counter % 3 == 0 {
            if devices.dma_active {
                Self::dma_step(devices);
            } else {
                retired = self.cpu.tick(devices);
            }

            if let Some(sample) = devices.apu.clock() {
                devices.audio_sample = sample;
            }
        }

        // PPU drives NMI on the rising edge of VBlank.
        if devices.ppu.take_nmi() {
            self.cpu.set_nmi();
        }

        // Mapper and APU frame IRQs share the level-sensitive line.
        self.cpu
            .set_irq(devices.cart.irq_pending() || devices.apu.irq_pending());

        devices.clock_counter += 1;
        retired
    }

    /// One CPU slot of the OAM DMA engine: a dummy cycle until the clock
    /// parity lines up, then alternating read and write cycles. The total
    /// stall lands on 513 or 514 CPU cycles depending on start parity.
    fn dma_step(devices: &mut Devices) {
        if devices.dma_dummy {
            if devices.clock_counter % 2 == 1 {
                devices.dma_dummy = false;
            }
        } else if devices.clock_counter % 2 == 0 {
            let addr = (u16::from(devices.dma_page) << 8) | u16::from(devices.dma_addr);
            devices.dma_data = devices.read(addr);
        } else {
            devices.ppu.oam_dma_write(devices.dma_addr, devices.dma_data);
            devices.dma_addr = devices.dma_addr.wrapping_add(1);
            if devices.dma_addr == 0 {
                devices.dma_active = false;
                devices.dma_dummy = true;
            }
        }
    }

    /// CPU view (debug).
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// PPU view (debug).
    #[must_use]
    pub fn ppu(&self) -> &Ppu {
        &self.devices.ppu
    }

    /// APU view (debug).
    #[must_use]
    pub fn apu(&self) -> &Apu {
        &self.devices.apu
    }

    /// Cartridge view (debug).
    #[must_use]
    pub fn cartridge(&self) -> &Cartridge {
        &self.devices.cart
    }

    /// Mutable device access for the console facade.
    pub(crate) fn devices_mut(&mut self) -> &mut Devices {
        &mut self.devices
    }

    /// Device access for the console facade.
    pub(crate) fn devices(&self) -> &Devices {
        &self.devices
    }

    /// Master clock value (PPU dots since power-up).
    #[must_use]
    pub fn clock_counter(&self) -> u64 {
        self.devices.clock_counter
    }

    /// Most recent APU sample.
    #[must_use]
    pub fn audio_sample(&self) -> f32 {
        self.devices.audio_sample
    }

    /// Read without side effects (debug).
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.devices.peek(addr)
    }

    /// Capture every mutable field for a save state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cpu: self.cpu.clone(),
            ram: self.devices.ram.clone(),
            ppu: self.devices.ppu.clone(),
            apu: self.devices.apu.clone(),
            cart: self.devices.cart.state(),
            controllers: self.devices.controllers,
            controller_shift: self.devices.controller_shift,
            dma_page: self.devices.dma_page,
            dma_addr: self.devices.dma_addr,
            dma_data: self.devices.dma_data,
            dma_dummy: self.devices.dma_dummy,
            dma_active: self.devices.dma_active,
            clock_counter: self.devices.clock_counter,
            open_bus: self.devices.open_bus,
            audio_sample: self.devices.audio_sample,
        }
    }

    /// Restore a snapshot; emulation continues bit-identically afterwards.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.cpu = snapshot.cpu.clone();
        self.devices.ram.copy_from_slice(&snapshot.ram);
        self.devices.ppu = snapshot.ppu.clone();
        self.devices.apu = snapshot.apu.clone();
        self.devices.cart.restore(&snapshot.cart);
        self.devices.controllers = snapshot.controllers;
        self.devices.controller_shift = snapshot.controller_shift;
        self.devices.dma_page = snapshot.dma_page;
        self.devices.dma_addr = snapshot.dma_addr;
        self.devices.dma_data = snapshot.dma_data;
        self.devices.dma_dummy = snapshot.dma_dummy;
        self.devices.dma_active = snapshot.dma_active;
        self.devices.clock_counter = snapshot.clock_counter;
        self.devices.open_bus = snapshot.open_bus;
        self.devices.audio_sample = snapshot.audio_sample;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// NROM image whose PRG is an endless NOP loop.
    fn nop_rom() -> Vec<u8> {
        let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, 0x00, 0x00];
        data.extend_from_slice(&[0; 8]);
        let mut prg = vec![0xEA; 16384];
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        data.extend_from_slice(&prg);
        data.extend(std::iter::repeat(0u8).take(8192));
        data
    }

    fn new_bus() -> SystemBus {
        SystemBus::new(Cartridge::from_bytes(&nop_rom()).unwrap())
    }

    #[test]
    fn ram_is_mirrored_every_2k() {
        let mut bus = new_bus();
        bus.devices_mut().write(0x0000, 0x42);
        assert_eq!(bus.devices_mut().read(0x0800), 0x42);
        assert_eq!(bus.devices_mut().read(0x1000), 0x42);
        assert_eq!(bus.devices_mut().read(0x1800), 0x42);

        bus.devices_mut().write(0x1234, 0xAB);
        assert_eq!(bus.devices_mut().read(0x0234), 0xAB);
    }

    #[test]
    fn cpu_runs_on_every_third_tick() {
        let mut bus = new_bus();
        let start_cycles = bus.cpu().cycles();
        for _ in 0..30 {
            bus.tick();
        }
        // 30 dots = 10 CPU cycles exactly.
        assert_eq!(bus.cpu().cycles() - start_cycles, 10);
    }

    #[test]
    fn controller_latch_and_shift() {
        let mut bus = new_bus();
        bus.devices_mut().controllers[0] = 0b1010_0101;

        bus.devices_mut().write(0x4016, 1);
        let mut bits = Vec::new();
        for _ in 0..8 {
            bits.push(bus.devices_mut().read(0x4016) & 1);
        }
        assert_eq!(bits, vec![1, 0, 1, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn open_bus_returns_last_driven_value() {
        let mut bus = new_bus();
        bus.devices_mut().write(0x0000, 0x5A);
        let _ = bus.devices_mut().read(0x0000);
        // $4020-$5FFF is unmapped on NROM.
        assert_eq!(bus.devices_mut().read(0x5000), 0x5A);
    }

    #[test]
    fn oam_dma_stalls_cpu_for_513_or_514_cycles() {
        // Consecutive CPU slots alternate parity, so starting the transfer
        // one slot apart exercises both alignment cases.
        let mut stalls = Vec::new();
        for start_offset in 0..2u64 {
            let mut bus = new_bus();
            for i in 0..256u16 {
                bus.devices_mut().write(0x0200 + i, i as u8);
            }
            for _ in 0..start_offset * 3 {
                bus.tick();
            }

            bus.devices_mut().write(0x4014, 0x02);
            let mut slots = 0u32;
            while bus.devices().dma_active {
                if bus.clock_counter() % 3 == 0 {
                    slots += 1;
                }
                bus.tick();
            }
            stalls.push(slots);
        }
        stalls.sort_unstable();
        assert_eq!(stalls, vec![513, 514]);
    }

    #[test]
    fn oam_dma_copies_the_whole_page() {
        let mut bus = new_bus();
        for i in 0..256u16 {
            bus.devices_mut().write(0x0200 + i, (255 - i) as u8);
        }
        bus.devices_mut().write(0x4014, 0x02);
        while bus.devices().dma_active {
            bus.tick();
        }

        // Read OAM back through $2004.
        bus.devices_mut().write(0x2003, 0x00);
        for i in 0..256u16 {
            bus.devices_mut().write(0x2003, i as u8);
            assert_eq!(bus.devices_mut().read(0x2004), (255 - i) as u8);
        }
    }

    proptest::proptest! {
        /// Work RAM mirrors every 2 KiB across the whole $0000-$1FFF range.
        #[test]
        fn ram_mirrors_for_any_address(addr in 0u16..0x2000, value in 0u8..=0xFF) {
            let mut bus = new_bus();
            bus.devices_mut().write(addr, value);
            for mirror in 0..4u16 {
                proptest::prop_assert_eq!(
                    bus.devices_mut().read((addr & 0x07FF) + mirror * 0x0800),
                    value
                );
            }
        }
    }

    #[test]
    fn snapshot_round_trip_is_identical() {
        let mut bus = new_bus();
        for _ in 0..10_000 {
            bus.tick();
        }
        let snapshot = bus.snapshot();
        let pc = bus.cpu().pc;
        let clock = bus.clock_counter();

        for _ in 0..5_000 {
            bus.tick();
        }
        bus.restore(&snapshot);
        assert_eq!(bus.cpu().pc, pc);
        assert_eq!(bus.clock_counter(), clock);
    }
}
