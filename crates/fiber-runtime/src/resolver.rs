//! Name resolution.
//!
//! An external DNS library plugs in through `Resolver`. It never touches the
//! ring itself: it gets a `ResolverIo` whose five operations run on the
//! calling fiber and report failure as `-errno`, the convention C resolver
//! libraries expect from their I/O hooks.
//!
//! Without a resolver, IPv4 literals and `localhost` resolve directly and
//! anything else goes to the system resolver on the worker pool.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::os::unix::io::RawFd;
use std::panic::{self, AssertUnwindSafe};

use fiber_core::{kdebug, kerror};

use crate::error::{FiberError, FiberResult};
use crate::fiber::Fiber;

/// I/O hooks handed to a `Resolver`. Each returns a non-negative value on
/// success or `-errno`.
pub trait ResolverIo {
    /// New socket; returns the descriptor
    fn open_socket(&mut self, domain: i32, ty: i32, protocol: i32) -> i32;
    fn close(&mut self, fd: RawFd) -> i32;
    fn set_option(&mut self, fd: RawFd, level: i32, name: i32, value: &[u8]) -> i32;
    fn connect(&mut self, fd: RawFd, addr: SocketAddrV4) -> i32;
    /// Send `request` in full, then receive once into `response`.
    /// Returns the number of bytes received.
    fn send_and_receive(&mut self, fd: RawFd, request: &[u8], response: &mut [u8]) -> i32;
}

/// A pluggable name resolver.
pub trait Resolver {
    /// IPv4 addresses for `host`, or a positive errno.
    fn resolve(&self, io: &mut dyn ResolverIo, host: &str) -> Result<Vec<Ipv4Addr>, i32>;
}

/// `ResolverIo` over a fiber's ring operations.
pub struct FiberResolverIo<'a> {
    fiber: &'a Fiber,
}

impl<'a> FiberResolverIo<'a> {
    pub fn new(fiber: &'a Fiber) -> Self {
        Self { fiber }
    }
}

/// Run `op` and fold both errors and panics into `-errno`.
fn guarded<F>(what: &str, op: F) -> i32
where
    F: FnOnce() -> FiberResult<i32>,
{
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => -e.errno().unwrap_or(libc::EIO),
        Err(_) => {
            kerror!("resolver {} panicked", what);
            -libc::EIO
        }
    }
}

/// Push all of `buf` through `send`. A send that moves nothing is `Os(EPIPE)`.
fn send_fully<S>(mut buf: &[u8], mut send: S) -> FiberResult<()>
where
    S: FnMut(&[u8]) -> FiberResult<usize>,
{
    while !buf.is_empty() {
        match send(buf)? {
            0 => return Err(FiberError::Os(libc::EPIPE)),
            n => buf = &buf[n..],
        }
    }
    Ok(())
}

impl ResolverIo for FiberResolverIo<'_> {
    fn open_socket(&mut self, domain: i32, ty: i32, protocol: i32) -> i32 {
        guarded("open_socket", || self.fiber.socket(domain, ty, protocol))
    }

    fn close(&mut self, fd: RawFd) -> i32 {
        guarded("close", || self.fiber.close(fd).map(|_| 0))
    }

    fn set_option(&mut self, fd: RawFd, level: i32, name: i32, value: &[u8]) -> i32 {
        guarded("set_option", || self.fiber.set_socket_option(fd, level, name, value).map(|_| 0))
    }

    fn connect(&mut self, fd: RawFd, addr: SocketAddrV4) -> i32 {
        guarded("connect", || self.fiber.connect_to(fd, addr).map(|_| 0))
    }

    fn send_and_receive(&mut self, fd: RawFd, request: &[u8], response: &mut [u8]) -> i32 {
        guarded("send_and_receive", || {
            send_fully(request, |chunk| self.fiber.send(fd, chunk, 0))?;
            let n = self.fiber.recv(fd, response, 0)?;
            Ok(n.min(i32::MAX as usize) as i32)
        })
    }
}

impl Fiber {
    /// IPv4 endpoints for `host:port`.
    pub fn lookup_network_endpoints(&self, host: &str, port: u16) -> FiberResult<Vec<SocketAddrV4>> {
        let host = host.trim();
        if host.is_empty() {
            return Err(FiberError::MalformedAddress);
        }
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(vec![SocketAddrV4::new(ip, port)]);
        }
        if host.eq_ignore_ascii_case("localhost") {
            return Ok(vec![SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)]);
        }

        let ips = match self.core().resolver() {
            Some(resolver) => {
                let mut io = FiberResolverIo::new(self);
                resolver.resolve(&mut io, host).map_err(|errno| {
                    kdebug!("resolver failed for {}: errno {}", host, errno);
                    FiberError::Unresolvable
                })?
            }
            None => {
                let query = (host.to_string(), port);
                let addrs = self.compute(move || query.to_socket_addrs().map(|it| it.collect::<Vec<_>>()))?;
                match addrs {
                    Ok(addrs) => addrs
                        .into_iter()
                        .filter_map(|a| match a {
                            SocketAddr::V4(v4) => Some(*v4.ip()),
                            SocketAddr::V6(_) => None,
                        })
                        .collect(),
                    Err(e) => {
                        kdebug!("system lookup failed for {}: {}", host, e);
                        return Err(FiberError::Unresolvable);
                    }
                }
            }
        };

        if ips.is_empty() {
            return Err(FiberError::Unresolvable);
        }
        Ok(ips.into_iter().map(|ip| SocketAddrV4::new(ip, port)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReactorConfig;
    use crate::reactor::Reactor;
    use fiber_core::kwarn;
    use std::sync::{Arc, Mutex};

    fn reactor_or_skip() -> Option<Reactor> {
        match Reactor::new(ReactorConfig::new()) {
            Ok(r) => Some(r),
            Err(e) => {
                kwarn!("io_uring unavailable, skipping: {}", e);
                None
            }
        }
    }

    fn run_on<F>(reactor: &Reactor, f: F)
    where
        F: FnOnce(&Fiber) + Send + 'static,
    {
        let handle = reactor.handle();
        reactor
            .post(move |fiber| {
                f(fiber);
                handle.shutdown().unwrap();
            })
            .unwrap();
        reactor.start().unwrap();
    }

    /// Opens and configures a socket through the hooks, then answers with a
    /// fixed address.
    struct FixedResolver {
        answer: Ipv4Addr,
        seen_fd: Arc<Mutex<Option<i32>>>,
    }

    impl Resolver for FixedResolver {
        fn resolve(&self, io: &mut dyn ResolverIo, host: &str) -> Result<Vec<Ipv4Addr>, i32> {
            if host == "nowhere.invalid" {
                return Err(libc::ENOENT);
            }
            let fd = io.open_socket(libc::AF_INET, libc::SOCK_DGRAM, 0);
            if fd < 0 {
                return Err(-fd);
            }
            let one = 1i32.to_ne_bytes();
            let rc = io.set_option(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR, &one);
            *self.seen_fd.lock().unwrap() = Some(rc);
            io.close(fd);
            Ok(vec![self.answer])
        }
    }

    #[test]
    fn test_literal_and_localhost() {
        let Some(reactor) = reactor_or_skip() else { return };
        let results = Arc::new(Mutex::new(Vec::new()));

        let results2 = results.clone();
        run_on(&reactor, move |fiber| {
            let mut r = results2.lock().unwrap();
            r.push(fiber.lookup_network_endpoints("192.0.2.7", 53));
            r.push(fiber.lookup_network_endpoints("LocalHost", 80));
            r.push(fiber.lookup_network_endpoints("  ", 80));
        });

        let r = results.lock().unwrap();
        assert_eq!(r[0], Ok(vec![SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 7), 53)]));
        assert_eq!(r[1], Ok(vec![SocketAddrV4::new(Ipv4Addr::LOCALHOST, 80)]));
        assert_eq!(r[2], Err(FiberError::MalformedAddress));
    }

    #[test]
    fn test_installed_resolver_is_used() {
        let Some(mut reactor) = reactor_or_skip() else { return };
        let seen = Arc::new(Mutex::new(None));
        reactor.set_resolver(Box::new(FixedResolver {
            answer: Ipv4Addr::new(10, 9, 8, 7),
            seen_fd: seen.clone(),
        }));
        let results = Arc::new(Mutex::new(Vec::new()));

        let results2 = results.clone();
        run_on(&reactor, move |fiber| {
            let mut r = results2.lock().unwrap();
            r.push(fiber.lookup_network_endpoints("service.example", 443));
            r.push(fiber.lookup_network_endpoints("nowhere.invalid", 443));
        });

        let r = results.lock().unwrap();
        assert_eq!(r[0], Ok(vec![SocketAddrV4::new(Ipv4Addr::new(10, 9, 8, 7), 443)]));
        assert_eq!(r[1], Err(FiberError::Unresolvable));
        assert_eq!(*seen.lock().unwrap(), Some(0));
    }

    #[test]
    fn test_hook_errors_are_negative_errno() {
        let Some(reactor) = reactor_or_skip() else { return };
        let results = Arc::new(Mutex::new(Vec::new()));

        let results2 = results.clone();
        run_on(&reactor, move |fiber| {
            let mut io = FiberResolverIo::new(fiber);
            let mut r = results2.lock().unwrap();
            r.push(io.close(-1));
            r.push(io.set_option(-1, libc::SOL_SOCKET, libc::SO_REUSEADDR, &1i32.to_ne_bytes()));
        });

        let r = results.lock().unwrap();
        assert_eq!(*r, vec![-libc::EBADF, -libc::EBADF]);
    }

    #[test]
    fn test_send_fully_stops_on_zero() {
        let mut out = Vec::new();
        let ok = send_fully(b"query", |chunk| {
            let n = chunk.len().min(2);
            out.extend_from_slice(&chunk[..n]);
            Ok(n)
        });
        assert_eq!(ok, Ok(()));
        assert_eq!(out, b"query");

        let mut calls = 0;
        let stalled = send_fully(b"query", |_| {
            calls += 1;
            Ok(0)
        });
        assert_eq!(stalled, Err(FiberError::Os(libc::EPIPE)));
        assert_eq!(calls, 1);
        assert_eq!(guarded("test", || stalled.map(|_| 0)), -libc::EPIPE);
    }

    #[test]
    fn test_send_and_receive_over_socketpair() {
        let Some(reactor) = reactor_or_skip() else { return };
        let results = Arc::new(Mutex::new(Vec::new()));

        let results2 = results.clone();
        run_on(&reactor, move |fiber| {
            let mut fds = [0i32; 2];
            assert_eq!(unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) }, 0);
            let (a, b) = (fds[0], fds[1]);
            fiber
                .spawn(move |f| {
                    let mut buf = [0u8; 16];
                    let n = f.recv(b, &mut buf, 0).unwrap();
                    f.send(b, &buf[..n], 0).unwrap();
                    f.close(b).unwrap();
                })
                .unwrap();

            let mut io = FiberResolverIo::new(fiber);
            let mut response = [0u8; 16];
            let echoed = io.send_and_receive(a, b"ping", &mut response);
            assert_eq!(&response[..4], b"ping");
            let bad_fd = io.send_and_receive(-1, b"ping", &mut response);
            io.close(a);
            results2.lock().unwrap().extend([echoed, bad_fd]);
        });

        assert_eq!(*results.lock().unwrap(), vec![4, -libc::EBADF]);
    }

    #[test]
    fn test_guarded_catches_panics() {
        assert_eq!(guarded("test", || Ok(7)), 7);
        assert_eq!(guarded("test", || Err(FiberError::Os(libc::EAGAIN))), -libc::EAGAIN);
        assert_eq!(guarded("test", || Err(FiberError::Unresolvable)), -libc::EIO);
        assert_eq!(guarded("test", || -> FiberResult<i32> { panic!("hook") }), -libc::EIO);
    }
}
