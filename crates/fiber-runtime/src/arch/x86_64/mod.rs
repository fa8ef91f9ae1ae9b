//! x86_64 context switching (System V ABI)

use std::arch::naked_asm;

use super::EntryFn;

/// Callee-saved register checkpoint. Field offsets are used by the asm below.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SavedContext {
    pub rsp: u64, // 0x00
    pub rip: u64, // 0x08
    pub rbx: u64, // 0x10
    pub rbp: u64, // 0x18
    pub r12: u64, // 0x20
    pub r13: u64, // 0x28
    pub r14: u64, // 0x30
    pub r15: u64, // 0x38
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
    // 16-byte aligned before the trampoline's `call`, so the callee sees
    // rsp % 16 == 8 on entry as the ABI requires.
    let sp = (stack_top as usize) & !0xF;

    let ctx = &mut *ctx;
    *ctx = SavedContext::default();
    ctx.rsp = sp as u64;
    ctx.rip = fiber_entry_trampoline as usize as u64;
    ctx.r12 = entry_fn as usize as u64;
    ctx.r13 = entry_arg as u64;
}

#[unsafe(naked)]
unsafe extern "C" fn fiber_entry_trampoline() {
    naked_asm!(
        "mov rdi, r13",
        "call r12",
        // entry functions never return
        "ud2",
    );
}

/// Save callee-saved registers into `old` and resume `new`.
///
/// Returns when some other context switches back into `old`.
///
/// # Safety
///
/// Both pointers must be valid; `new` must hold a context produced by
/// `init_context` or by a previous `switch_context`.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(_old: *mut SavedContext, _new: *const SavedContext) {
    naked_asm!(
        // Save into old (rdi)
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 1f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        // Load from new (rsi)
        "mov rsp, [rsi + 0x00]",
        "mov rax, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        "jmp rax",
        // Resume point of a saved context
        "1:",
        "ret",
    );
}
