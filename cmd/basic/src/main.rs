//! Basic pool usage: ten workers each sleep one second, yet the whole wave
//! takes about one second end to end.

use std::thread;
use std::time::Duration;

use spindle::{Barrier, Pool};

fn main() {
    let pool = Pool::new(10).expect("create pool");
    let barrier = Barrier::new();

    barrier.start();
    for i in 0..10 {
        pool.dispatch(Some(&barrier), move || {
            thread::sleep(Duration::from_secs(1));
            println!("worker #{} is done", i);
        });
    }
    barrier.end();

    println!("this message is printed after all the workers have finished their jobs");
    pool.shutdown();
}
