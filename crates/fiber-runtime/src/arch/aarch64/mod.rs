//! aarch64 context switching (AAPCS64)

use std::arch::naked_asm;

use super::EntryFn;

/// Callee-saved register checkpoint. Field offsets are used by the asm below.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SavedContext {
    pub x19_x28: [u64; 10], // 0x00..0x50
    pub fp: u64,            // 0x50
    pub lr: u64,            // 0x58
    pub sp: u64,            // 0x60
    pub d8_d15: [u64; 8],   // 0x68..0xa8
}

/// Prepare `ctx` so that switching to it runs `entry_fn(entry_arg)` on the
/// stack ending at `stack_top`.
///
/// # Safety
///
/// `ctx` must be valid for writes. `stack_top` must be the exclusive upper
/// bound of a writable stack mapping.
#[inline]
pub unsafe fn init_context(ctx: *mut SavedContext, stack_top: *mut u8, entry_fn: EntryFn, entry_arg: usize) {
    let ctx = &mut *ctx;
    *ctx = SavedContext::default();
    ctx.sp = ((stack_top as usize) & !0xF) as u64;
    ctx.lr = fiber_entry_trampoline as usize as u64;
    ctx.x19_x28[0] = entry_fn as usize as u64; // x19
    ctx.x19_x28[1] = entry_arg as u64; // x20
}

#[unsafe(naked)]
unsafe extern "C" fn fiber_entry_trampoline() {
    naked_asm!(
        "mov x0, x20",
        "blr x19",
        // entry functions never return
        "brk #1",
    );
}

/// Save callee-saved registers into `old` and resume `new`.
///
/// # Safety
///
/// Both pointers must be valid; `new` must hold a context produced by
/// `init_context` or by a previous `switch_context`.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(_old: *mut SavedContext, _new: *const SavedContext) {
    naked_asm!(
        // Save into old (x0)
        "stp x19, x20, [x0, #0x00]",
        "stp x21, x22, [x0, #0x10]",
        "stp x23, x24, [x0, #0x20]",
        "stp x25, x26, [x0, #0x30]",
        "stp x27, x28, [x0, #0x40]",
        "stp x29, x30, [x0, #0x50]",
        "mov x9, sp",
        "str x9, [x0, #0x60]",
        "stp d8, d9, [x0, #0x68]",
        "stp d10, d11, [x0, #0x78]",
        "stp d12, d13, [x0, #0x88]",
        "stp d14, d15, [x0, #0x98]",
        // Load from new (x1)
        "ldp x19, x20, [x1, #0x00]",
        "ldp x21, x22, [x1, #0x10]",
        "ldp x23, x24, [x1, #0x20]",
        "ldp x25, x26, [x1, #0x30]",
        "ldp x27, x28, [x1, #0x40]",
        "ldp x29, x30, [x1, #0x50]",
        "ldr x9, [x1, #0x60]",
        "mov sp, x9",
        "ldp d8, d9, [x1, #0x68]",
        "ldp d10, d11, [x1, #0x78]",
        "ldp d12, d13, [x1, #0x88]",
        "ldp d14, d15, [x1, #0x98]",
        // x30 holds the resume address
        "ret",
    );
}
