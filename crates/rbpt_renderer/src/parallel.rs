//! Fixed-size worker pool for the parallel phases of an iteration.
//!
//! Each task receives a per-worker context built by `init` (random stream,
//! scratch buffers). Results are collected in index order, so reductions
//! over them are independent of the number of workers.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{RenderError, RenderResult};

pub struct Executor {
    pool: ThreadPool,
}

impl Executor {
    pub fn new(threads: usize) -> RenderResult<Self> {
        if threads == 0 {
            return Err(RenderError::InvalidThreadCount);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rbpt-worker-{}", i))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `f` for `0..n`, returning results in index order.
    pub fn map_1d<C, T, I, F>(&self, n: usize, init: I, f: F) -> Vec<T>
    where
        I: Fn() -> C + Sync + Send,
        F: Fn(&mut C, usize) -> T + Sync + Send,
        T: Send,
    {
        self.pool.install(|| {
            (0..n)
                .into_par_iter()
                .map_init(&init, |ctx, i| f(ctx, i))
                .collect()
        })
    }

    /// Run `f` for every `(x, y)` of a `width x height` grid, returning
    /// results in row-major order.
    pub fn map_2d<C, T, I, F>(&self, width: u32, height: u32, init: I, f: F) -> Vec<T>
    where
        I: Fn() -> C + Sync + Send,
        F: Fn(&mut C, u32, u32) -> T + Sync + Send,
        T: Send,
    {
        let w = width as usize;
        self.map_1d(w * height as usize, init, |ctx, i| {
            f(ctx, (i % w) as u32, (i / w) as u32)
        })
    }

    /// Run `f` on every element of `items`, each element visited by exactly
    /// one task.
    pub fn for_each_mut<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(&mut T) + Sync + Send,
    {
        self.pool.install(|| items.par_iter_mut().for_each(f));
    }
}
