use criterion::{criterion_group, criterion_main, Criterion};
use rs232_session::session::framing::{frame_into, framed_len};
use rs232_session::{MockBackend, Session, SessionOptions};
use std::hint::black_box;
use std::time::Duration;

pub fn bench_framing(c: &mut Criterion) {
    let text = b"MEAS:VOLT:DC? 10,0.001\r\n";
    let delimiter = b"\r\n";
    let mut out = vec![0u8; 128];
    c.bench_function("frame_command", |b| {
        b.iter(|| {
            let len = framed_len(black_box(text), delimiter);
            black_box(frame_into(black_box(text), delimiter, &mut out[..len]));
        })
    });
}

pub fn bench_query_echo(c: &mut Criterion) {
    let mut session = Session::open_with(MockBackend::echo(), "BENCH0", &SessionOptions::default())
        .expect("mock session should open");
    c.bench_function("query_echo", |b| {
        b.iter(|| {
            let reply = session.query(black_box("*IDN?")).unwrap();
            black_box(reply.len());
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_framing, bench_query_echo
}
criterion_main!(benches);
