use criterion::{black_box, criterion_group, criterion_main, Criterion};
use preview_qr::capture::{PixelFormat, PreviewFrame};
use preview_qr::processing::{LuminanceGrid, QrDecoder, RqrrDecoder};

fn nv21_frame(width: u32, height: u32) -> Vec<u8> {
    let pixels = (width * height) as usize;
    let mut data: Vec<u8> = (0..pixels).map(|i| (i % 251) as u8).collect();
    data.resize(pixels + pixels / 2, 128);
    data
}

fn bench_luminance(c: &mut Criterion) {
    let data = nv21_frame(640, 480);
    let frame = PreviewFrame::new(640, 480, PixelFormat::Nv21, &data);
    c.bench_function("luminance_nv21_640x480", |b| {
        b.iter(|| LuminanceGrid::from_frame(black_box(&frame)))
    });

    let packed = vec![128u8; 640 * 480 * 2];
    let frame = PreviewFrame::new(640, 480, PixelFormat::Yuy2, &packed);
    c.bench_function("luminance_yuy2_640x480", |b| {
        b.iter(|| LuminanceGrid::from_frame(black_box(&frame)))
    });
}

fn bench_decode_miss(c: &mut Criterion) {
    let data = nv21_frame(640, 480);
    let frame = PreviewFrame::new(640, 480, PixelFormat::Nv21, &data);
    let decoder = RqrrDecoder::new();
    c.bench_function("rqrr_miss_640x480", |b| {
        b.iter(|| {
            let grid = LuminanceGrid::from_frame(black_box(&frame))?;
            Ok::<_, preview_qr::processing::LuminanceError>(decoder.decode(&grid).is_err())
        })
    });
}

criterion_group!(benches, bench_luminance, bench_decode_miss);
criterion_main!(benches);
