use criterion::{criterion_group, criterion_main, Criterion};
use concurrent_collections::structures::Stack;

use std::thread;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

fn bench_lockfree_stack(num_threads: usize) {
    let stack: Arc<Stack<u32>> = Arc::new(Stack::new());
    let mut wait_vec: Vec<JoinHandle<()>> = Vec::new();
    for _ in 0..num_threads {
        let s = stack.clone();
        wait_vec.push(thread::spawn(move || {
            for n in 0..10000 {
                s.push(n);
            }
        }));
    }
    for _ in 0..num_threads {
        let s = stack.clone();
        wait_vec.push(thread::spawn(move || {
            for _ in 0..10000 {
                while s.pop().is_none() {}
            }
        }));
    }

    for handle in wait_vec {
        handle.join().unwrap();
    }
}

fn bench_locked_stack(num_threads: usize) {
    let stack: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let mut wait_vec: Vec<JoinHandle<()>> = Vec::new();
    for _ in 0..num_threads {
        let s = stack.clone();
        wait_vec.push(thread::spawn(move || {
            for n in 0..10000 {
                s.lock().unwrap().push(n);
            }
        }));
    }
    for _ in 0..num_threads {
        let s = stack.clone();
        wait_vec.push(thread::spawn(move || {
            for _ in 0..10000 {
                while s.lock().unwrap().pop().is_none() {}
            }
        }));
    }

    for handle in wait_vec {
        handle.join().unwrap();
    }
}

fn bench_stack_low(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack_low");
    group.bench_function("locked", |b| b.iter(|| bench_locked_stack(2)));
    group.bench_function("lockfree", |b| b.iter(|| bench_lockfree_stack(2)));
    group.finish();
}

fn bench_stack_high(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack_high");
    group.sample_size(20);
    group.bench_function("locked", |b| b.iter(|| bench_locked_stack(8)));
    group.bench_function("lockfree", |b| b.iter(|| bench_lockfree_stack(8)));
    group.finish();
}

criterion_group!(benches, bench_stack_low, bench_stack_high);
criterion_main!(benches);
