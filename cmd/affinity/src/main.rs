//! Per-thread configuration demo: pin all workers to CPU 1 before
//! dispatching a large CPU-bound wave. Run `top` and press `1` to watch.

use spindle::{Barrier, Pool};

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        fn pin_all_to_cpu(pool: &Pool, cpu: usize) {
            pool.for_each_thread(|worker| unsafe {
                let mut set: libc::cpu_set_t = std::mem::zeroed();
                libc::CPU_ZERO(&mut set);
                libc::CPU_SET(cpu, &mut set);
                let rc = libc::pthread_setaffinity_np(
                    worker.native_handle(),
                    std::mem::size_of::<libc::cpu_set_t>(),
                    &set,
                );
                if rc != 0 {
                    eprintln!("failed to pin worker {}: errno {}", worker.index(), rc);
                }
            });
        }
    } else {
        fn pin_all_to_cpu(_pool: &Pool, _cpu: usize) {
            eprintln!("thread affinity is only wired up on linux; running unpinned");
        }
    }
}

fn busy_work() {
    let mut a: i64 = 1;
    for i in 0..10_000_000i64 {
        a = a.wrapping_mul(i);
        std::hint::black_box(a.wrapping_pow(2));
    }
}

fn main() {
    let pool = Pool::new(10).expect("create pool");
    pin_all_to_cpu(&pool, 1);

    println!("now run `top` and press '1'");

    let barrier = Barrier::new();
    barrier.start();
    for _ in 0..10_000 {
        pool.dispatch(Some(&barrier), busy_work);
    }
    barrier.end();

    pool.shutdown();
}
