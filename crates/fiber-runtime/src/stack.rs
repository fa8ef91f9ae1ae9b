//! Fiber stacks
//!
//! Each fiber owns one anonymous mapping: a PROT_NONE guard page at the low
//! end followed by the usable stack. Overflow faults on the guard page
//! instead of corrupting a neighbour. Pages are committed lazily
//! (MAP_NORESERVE), so a large configured stack costs only what is touched.

use std::num::NonZeroUsize;
use std::ptr::NonNull;

use nix::sys::mman::{mmap_anonymous, mprotect, munmap, MapFlags, ProtFlags};

use crate::error::{FiberError, FiberResult};

pub fn page_size() -> usize {
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        n if n > 0 => n as usize,
        _ => 4096,
    }
}

/// mmap'd stack with a guard page. Unmapped on drop.
pub struct FiberStack {
    base: NonNull<libc::c_void>,
    /// Whole mapping, guard included
    len: usize,
    guard: usize,
}

impl FiberStack {
    /// Map a stack with at least `usable` bytes (rounded up to pages).
    pub fn new(usable: usize) -> FiberResult<Self> {
        let page = page_size();
        let usable = usable.div_ceil(page).max(1) * page;
        let len = usable + page;
        let nz = NonZeroUsize::new(len).ok_or(FiberError::Stack(libc::EINVAL))?;

        let base = unsafe {
            mmap_anonymous(
                None,
                nz,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_PRIVATE | MapFlags::MAP_NORESERVE | MapFlags::MAP_STACK,
            )
        }
        .map_err(|e| FiberError::Stack(e as i32))?;

        if let Err(e) = unsafe { mprotect(base, page, ProtFlags::PROT_NONE) } {
            unsafe {
                let _ = munmap(base, len);
            }
            return Err(FiberError::Stack(e as i32));
        }

        Ok(Self { base, len, guard: page })
    }

    /// Exclusive upper bound; stacks grow down from here.
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { (self.base.as_ptr() as *mut u8).add(self.len) }
    }

    /// Lowest usable address (just above the guard page)
    #[inline]
    pub fn bottom(&self) -> *mut u8 {
        unsafe { (self.base.as_ptr() as *mut u8).add(self.guard) }
    }

    #[inline]
    pub fn usable_size(&self) -> usize {
        self.len - self.guard
    }
}

impl Drop for FiberStack {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.base, self.len);
        }
    }
}
