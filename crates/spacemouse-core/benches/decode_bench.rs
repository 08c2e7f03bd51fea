//! Criterion benchmarks for the raw payload decoders.
//!
//! Motion reports arrive at the device's report rate (up to ~120 Hz per axis
//! report on older HID devices), and on the message-pump backend every one of
//! them is decoded on the UI thread, so decode cost should stay far below a
//! microsecond.
//!
//! Run with:
//! ```bash
//! cargo bench --package spacemouse-core --bench decode_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spacemouse_core::decode::connexion::{ConnexionState, CMD_HANDLE_AXIS, CMD_HANDLE_BUTTONS};
use spacemouse_core::decode::spnav::{encode_frame, SpnavFrameBuffer};
use spacemouse_core::{ConnexionDecoder, HidReportDecoder, MotionEvent, SpnavDecoder};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn spnav_motion_bytes() -> [u8; 32] {
    encode_frame(&[0, 120, -45, 300, 15, -220, 8, 16])
}

fn hid_combined_report() -> Vec<u8> {
    let mut bytes = vec![1u8];
    for v in [120i16, -45, 300, 15, -220, 8] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_motion_from_axes(c: &mut Criterion) {
    c.bench_function("MotionEvent::from_axes", |b| {
        b.iter(|| {
            MotionEvent::from_axes(
                black_box(120),
                black_box(-45),
                black_box(300),
                black_box(15),
                black_box(-220),
                black_box(8),
            )
        })
    });
}

fn bench_decoders(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_motion");

    let spnav_bytes = spnav_motion_bytes();
    let mut spnav = SpnavDecoder::new();
    group.bench_function("spnav", |b| {
        b.iter(|| spnav.decode_bytes(black_box(&spnav_bytes)).unwrap())
    });

    let state = ConnexionState {
        client: 1,
        command: CMD_HANDLE_AXIS,
        buttons: 0,
        axis: [120, -45, 300, 15, -220, 8],
    };
    let mut connexion = ConnexionDecoder::new();
    group.bench_function("connexion", |b| {
        b.iter(|| connexion.decode(black_box(&state)).unwrap())
    });

    let report = hid_combined_report();
    let mut hid = HidReportDecoder::new();
    group.bench_function("hid", |b| b.iter(|| hid.decode(black_box(&report)).unwrap()));

    group.finish();
}

fn bench_button_toggle(c: &mut Criterion) {
    // Alternating press / release so every message carries a change.
    let press = ConnexionState {
        client: 1,
        command: CMD_HANDLE_BUTTONS,
        buttons: 1 << 2,
        axis: [0; 6],
    };
    let release = ConnexionState { buttons: 0, ..press };
    let mut decoder = ConnexionDecoder::new();

    c.bench_function("connexion_button_toggle", |b| {
        b.iter(|| {
            decoder.decode(black_box(&press)).unwrap();
            decoder.decode(black_box(&release)).unwrap()
        })
    });
}

fn bench_frame_buffer(c: &mut Criterion) {
    // Ten frames delivered in one read, the common burst on a busy socket.
    let burst: Vec<u8> = std::iter::repeat(spnav_motion_bytes())
        .take(10)
        .flatten()
        .collect();
    let mut buffer = SpnavFrameBuffer::new();

    c.bench_function("spnav_frame_buffer_burst_10", |b| {
        b.iter(|| {
            buffer.extend(black_box(&burst));
            let mut n = 0;
            while let Some(frame) = buffer.next_frame() {
                black_box(frame);
                n += 1;
            }
            n
        })
    });
}

criterion_group!(
    benches,
    bench_motion_from_axes,
    bench_decoders,
    bench_button_toggle,
    bench_frame_buffer
);
criterion_main!(benches);
