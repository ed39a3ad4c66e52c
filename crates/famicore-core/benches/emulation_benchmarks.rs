//! Whole-machine throughput benchmarks.

use criterion::{criterion_group, criterion_main, Criterion};
use famicore_core::Console;

/// NROM image that enables rendering and spins.
fn bench_rom() -> Vec<u8> {
    let mut prg = vec![0xEA; 16 * 1024];
    let program = [
        0xA9, 0x1E, // LDA #$1E
        0x8D, 0x01, 0x20, // STA $2001
        0x4C, 0x05, 0x80, // JMP self
    ];
    prg[..program.len()].copy_from_slice(&program);
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;

    let mut data = vec![0x4E, 0x45, 0x53, 0x1A, 1, 1, 0x00, 0x00];
    data.extend_from_slice(&[0; 8]);
    data.extend_from_slice(&prg);
    data.extend(std::iter::repeat(0x3Cu8).take(8 * 1024));
    data
}

fn bench_step_frame(c: &mut Criterion) {
    let mut console = Console::load(&bench_rom()).unwrap();
    c.bench_function("step_frame_rendering", |b| {
        b.iter(|| {
            console.step_frame();
        });
    });
}

fn bench_step_instruction(c: &mut Criterion) {
    let mut console = Console::load(&bench_rom()).unwrap();
    c.bench_function("step_instruction", |b| {
        b.iter(|| console.step_instruction());
    });
}

criterion_group!(benches, bench_step_frame, bench_step_instruction);
criterion_main!(benches);
