//! Thin libc helpers: errno, IPv4 socket addresses, inline socket calls,
//! and the monotonic clock used by absolute timers.
//!
//! Every call returns the kernel convention: a non-negative value on
//! success, `-errno` on failure.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::unix::io::RawFd;
use std::time::Duration;

#[inline]
pub fn last_errno() -> i32 {
    nix::errno::Errno::last_raw()
}

#[inline]
fn cvt(ret: libc::c_int) -> i32 {
    if ret < 0 {
        -last_errno()
    } else {
        ret
    }
}

/// Size of `sockaddr_in`, as the kernel wants it
pub const SOCKADDR_IN_LEN: libc::socklen_t = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;

pub fn sockaddr_in(addr: &SocketAddrV4) -> libc::sockaddr_in {
    // sockaddr_in has platform-specific padding fields
    let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    sa.sin_family = libc::AF_INET as libc::sa_family_t;
    sa.sin_port = addr.port().to_be();
    sa.sin_addr = libc::in_addr {
        s_addr: u32::from(*addr.ip()).to_be(),
    };
    sa
}

pub fn socket_addr_v4(sa: &libc::sockaddr_in) -> SocketAddrV4 {
    SocketAddrV4::new(
        Ipv4Addr::from(u32::from_be(sa.sin_addr.s_addr)),
        u16::from_be(sa.sin_port),
    )
}

pub fn socket(domain: i32, ty: i32, protocol: i32) -> i32 {
    cvt(unsafe { libc::socket(domain, ty, protocol) })
}

pub fn bind_v4(fd: RawFd, addr: &SocketAddrV4) -> i32 {
    let sa = sockaddr_in(addr);
    cvt(unsafe {
        libc::bind(fd, &sa as *const libc::sockaddr_in as *const libc::sockaddr, SOCKADDR_IN_LEN)
    })
}

pub fn listen(fd: RawFd, backlog: i32) -> i32 {
    cvt(unsafe { libc::listen(fd, backlog) })
}

pub fn setsockopt(fd: RawFd, level: i32, name: i32, value: &[u8]) -> i32 {
    cvt(unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            value.as_ptr() as *const libc::c_void,
            value.len() as libc::socklen_t,
        )
    })
}

/// `getsockname(2)` for an IPv4 socket.
pub fn local_addr_v4(fd: RawFd) -> Result<SocketAddrV4, i32> {
    let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    let mut len = SOCKADDR_IN_LEN;
    let rc = cvt(unsafe {
        libc::getsockname(fd, &mut sa as *mut libc::sockaddr_in as *mut libc::sockaddr, &mut len)
    });
    if rc < 0 {
        return Err(-rc);
    }
    if sa.sin_family != libc::AF_INET as libc::sa_family_t {
        return Err(libc::EAFNOSUPPORT);
    }
    Ok(socket_addr_v4(&sa))
}

/// Current CLOCK_MONOTONIC reading, the clock io_uring absolute timeouts use.
pub fn monotonic_now() -> Duration {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // CLOCK_MONOTONIC cannot fail with a valid pointer
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sockaddr_conversion() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(10, 1, 2, 3), 8080);
        let sa = sockaddr_in(&addr);
        assert_eq!(sa.sin_family, libc::AF_INET as libc::sa_family_t);
        assert_eq!(socket_addr_v4(&sa), addr);
    }

    #[test]
    fn test_inline_socket_calls() {
        let fd = socket(libc::AF_INET, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0);
        assert!(fd >= 0);

        let one = 1i32.to_ne_bytes();
        assert_eq!(setsockopt(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR, &one), 0);
        assert_eq!(bind_v4(fd, &SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)), 0);
        assert_eq!(listen(fd, 16), 0);
        let local = local_addr_v4(fd).unwrap();
        assert_eq!(*local.ip(), Ipv4Addr::LOCALHOST);
        assert_ne!(local.port(), 0);
        unsafe { libc::close(fd) };

        assert_eq!(listen(-1, 16), -libc::EBADF);
    }

    #[test]
    fn test_monotonic_advances() {
        let a = monotonic_now();
        std::thread::sleep(Duration::from_millis(2));
        assert!(monotonic_now() > a);
    }
}
