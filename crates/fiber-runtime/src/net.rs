//! IPv4 socket operations on `Fiber`.
//!
//! `socket`, `bind`, `listen` and `set_socket_option` never block and are
//! answered inline by the ring; the rest go through the kernel. Either way
//! the caller sees the same submit → await → decode path.

use std::net::SocketAddrV4;
use std::os::unix::io::RawFd;

use fiber_ring::sys;

use crate::error::{FiberError, FiberResult};
use crate::fiber::Fiber;

impl Fiber {
    /// New socket; `SOCK_CLOEXEC` is always added.
    pub fn socket(&self, domain: i32, ty: i32, protocol: i32) -> FiberResult<RawFd> {
        self.await_ok(|ring, token| ring.socket(token, domain, ty, protocol))
    }

    pub fn bind(&self, fd: RawFd, addr: SocketAddrV4) -> FiberResult<()> {
        self.await_ok(|ring, token| ring.bind(token, fd, &addr))?;
        Ok(())
    }

    pub fn listen(&self, fd: RawFd, backlog: i32) -> FiberResult<()> {
        self.await_ok(|ring, token| ring.listen(token, fd, backlog))?;
        Ok(())
    }

    pub fn set_socket_option(&self, fd: RawFd, level: i32, name: i32, value: &[u8]) -> FiberResult<()> {
        self.await_ok(|ring, token| ring.set_socket_option(token, fd, level, name, value))?;
        Ok(())
    }

    pub fn connect_to(&self, fd: RawFd, addr: SocketAddrV4) -> FiberResult<()> {
        let sa = sys::sockaddr_in(&addr);
        let ptr = &sa as *const libc::sockaddr_in as *const libc::sockaddr;
        self.await_ok(|ring, token| unsafe { ring.connect(token, fd, ptr, sys::SOCKADDR_IN_LEN, false) })?;
        Ok(())
    }

    /// Accept one connection on listening socket `fd`.
    pub fn accept_cnxn(&self, fd: RawFd) -> FiberResult<(RawFd, SocketAddrV4)> {
        let mut sa: libc::sockaddr_in = unsafe { std::mem::zeroed() };
        let mut len = sys::SOCKADDR_IN_LEN;
        let addr = &mut sa as *mut libc::sockaddr_in as *mut libc::sockaddr;
        let len_ptr = &mut len as *mut libc::socklen_t;
        let conn = self.await_ok(|ring, token| unsafe { ring.accept(token, fd, addr, len_ptr, false) })?;
        Ok((conn, sys::socket_addr_v4(&sa)))
    }

    /// TCP socket bound to `addr` and listening, with `SO_REUSEADDR` set.
    /// The socket is closed if any step fails.
    pub fn enable_listen_socket(&self, addr: SocketAddrV4, backlog: i32) -> FiberResult<RawFd> {
        let fd = self.socket(libc::AF_INET, libc::SOCK_STREAM, 0)?;
        let setup = self
            .set_socket_option(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR, &1i32.to_ne_bytes())
            .and_then(|_| self.bind(fd, addr))
            .and_then(|_| self.listen(fd, backlog));
        if let Err(e) = setup {
            let _ = self.close(fd);
            return Err(e);
        }
        Ok(fd)
    }

    /// Restrict `fd` to interface `ifname` (`SO_BINDTODEVICE`).
    pub fn bind_socket_to_ifce(&self, fd: RawFd, ifname: &str) -> FiberResult<()> {
        if ifname.is_empty() || ifname.len() >= libc::IFNAMSIZ || ifname.contains('\0') {
            return Err(FiberError::Os(libc::EINVAL));
        }
        let mut name = ifname.as_bytes().to_vec();
        name.push(0);
        self.set_socket_option(fd, libc::SOL_SOCKET, libc::SO_BINDTODEVICE, &name)
    }

    pub fn send(&self, fd: RawFd, buf: &[u8], flags: i32) -> FiberResult<usize> {
        let len = buf.len().min(u32::MAX as usize) as u32;
        let ptr = buf.as_ptr();
        let n = self.await_ok(|ring, token| unsafe { ring.send(token, fd, ptr, len, flags, false) })?;
        Ok(n as usize)
    }

    /// `Ok(0)` means the peer closed.
    pub fn recv(&self, fd: RawFd, buf: &mut [u8], flags: i32) -> FiberResult<usize> {
        let len = buf.len().min(u32::MAX as usize) as u32;
        let ptr = buf.as_mut_ptr();
        let n = self.await_ok(|ring, token| unsafe { ring.recv(token, fd, ptr, len, flags, false) })?;
        Ok(n as usize)
    }

    /// Bound address of an IPv4 socket. Does not suspend.
    pub fn local_addr(&self, fd: RawFd) -> FiberResult<SocketAddrV4> {
        sys::local_addr_v4(fd).map_err(FiberError::Os)
    }
}
