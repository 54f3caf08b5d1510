//! Codec and scheduler throughput benchmarks

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use modbus_rtu_master::{
    crc16, decode_response, encode_request, Clock, FunctionCode, MasterConfig, ModbusMaster,
    RegisterBank, Transaction, TransactionTable, Transport,
};

/// Transport that answers every request with the same canned reply
struct LoopbackTransport {
    reply: Vec<u8>,
    rx: VecDeque<u8>,
}

impl Transport for LoopbackTransport {
    fn write(&mut self, _bytes: &[u8]) -> io::Result<()> {
        self.rx.extend(self.reply.iter().copied());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.rx
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::WouldBlock))
    }

    fn set_transmit_enabled(&mut self, _enabled: bool) -> io::Result<()> {
        Ok(())
    }
}

/// Clock that never waits
struct InstantClock;

impl Clock for InstantClock {
    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn sleep_micros(&self, _micros: u32) {}
}

fn register_reply(count: usize) -> Vec<u8> {
    let mut frame = vec![0x01, 0x03, (count * 2) as u8];
    for i in 0..count {
        frame.extend_from_slice(&(i as u16).to_be_bytes());
    }
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_be_bytes());
    frame
}

fn bench_crc(c: &mut Criterion) {
    let frame = register_reply(29);
    c.bench_function("crc16_63_bytes", |b| b.iter(|| crc16(black_box(&frame))));
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let bank = RegisterBank::new(29);
    let mut tx = Transaction::new(1, FunctionCode::WriteMultipleRegisters, 0, 28, 0);
    group.bench_function("encode_fc16_28_registers", |b| {
        b.iter(|| encode_request(black_box(&mut tx), &bank))
    });

    let mut bank = RegisterBank::new(29);
    let tx = Transaction::new(1, FunctionCode::ReadHoldingRegisters, 0, 29, 0);
    let reply = register_reply(29);
    group.bench_function("decode_fc03_29_registers", |b| {
        b.iter(|| decode_response(black_box(&reply), &tx, &mut bank))
    });

    group.finish();
}

fn bench_cycle(c: &mut Criterion) {
    let transport = LoopbackTransport {
        reply: register_reply(4),
        rx: VecDeque::new(),
    };
    let config = MasterConfig::new().with_polling_interval(Duration::ZERO);
    let mut master = match ModbusMaster::new(transport, InstantClock, config) {
        Ok(master) => master,
        Err(e) => panic!("master: {}", e),
    };
    let table: TransactionTable = (0..4)
        .map(|i| Transaction::new(1, FunctionCode::ReadHoldingRegisters, i * 4, 4, i * 4))
        .collect();
    if let Err(e) = master.configure(table, RegisterBank::new(16)) {
        panic!("configure: {}", e);
    }

    c.bench_function("tick_full_cycle", |b| {
        b.iter(|| {
            while master.tick().ok().flatten().is_none() {}
        })
    });
}

criterion_group!(benches, bench_crc, bench_codec, bench_cycle);
criterion_main!(benches);
