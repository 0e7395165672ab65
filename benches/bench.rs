use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use rivulet::ring_buffer::RingBuffer;
use rivulet::task_queue::TaskQueue;

const FRAME_SIZES: &[usize] = &[128, 512, 2048];

fn bench_ring_buffer_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer");
    for &frames in FRAME_SIZES {
        let block = vec![0u8; frames * 4];
        let rb = RingBuffer::new(block.len() * 4);
        group.throughput(criterion::Throughput::Bytes(block.len() as u64));
        group.bench_function(format!("write_read_{frames}"), |b| {
            b.iter(|| {
                rb.write(&block);
                let mut out = vec![0u8; block.len()];
                rb.read(&mut out);
            });
        });
    }
    group.finish();
}

/// Push/pop overhead of the bounded task queue, sized as it would be for a
/// graph of `node_count` nodes.
fn bench_task_queue_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_queue");
    for &node_count in &[16usize, 256, 4096] {
        let q = TaskQueue::new(node_count);
        group.bench_function(format!("push_pop_{node_count}"), |b| {
            b.iter(|| {
                q.push(0);
                q.pop();
            });
        });
    }
    group.finish();
}

/// Contended push/pop across several producer/consumer pairs, approximating
/// the manager-thread-to-worker-pool handoff under load.
fn bench_task_queue_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_queue_contended");
    group.bench_function("four_producers_four_consumers", |b| {
        b.iter(|| {
            let q = Arc::new(TaskQueue::new(64));
            let producers: Vec<_> = (0..4)
                .map(|_| {
                    let q = q.clone();
                    std::thread::spawn(move || {
                        for i in 0..64 {
                            q.push(i);
                        }
                    })
                })
                .collect();
            let consumers: Vec<_> = (0..4)
                .map(|_| {
                    let q = q.clone();
                    std::thread::spawn(move || {
                        for _ in 0..64 {
                            q.pop();
                        }
                    })
                })
                .collect();
            for p in producers {
                p.join().unwrap();
            }
            q.shutdown();
            for c in consumers {
                c.join().unwrap();
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_ring_buffer_throughput,
    bench_task_queue_throughput,
    bench_task_queue_contended
);
criterion_main!(benches);
