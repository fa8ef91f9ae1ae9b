//! Fiber Echo Server
//!
//! TCP echo server on a single reactor thread: one acceptor fiber, one
//! fiber per connection, every recv/send suspended on io_uring.
//!
//! Usage:
//!     cargo build --release -p fiber-echo
//!     ./target/release/fiber-echo [port] [bind-addr]
//!
//! Test with:
//!     echo "hello" | nc localhost 9999
//!
//!     # Many clients at once:
//!     for i in $(seq 1 100); do echo "ping $i" | nc -q0 localhost 9999 & done

use fiber::{block_on, env_get, kdebug, kerror, kinfo, Fiber, ReactorConfig};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const BUF_SIZE: usize = 4096;
const BACKLOG: i32 = 1024;

#[derive(Default)]
struct Stats {
    accepted: AtomicU64,
    closed: AtomicU64,
    bytes: AtomicU64,
}

fn serve_connection(f: &Fiber, conn: RawFd, stats: &Stats) {
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = match f.recv(conn, &mut buf, 0) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                kdebug!("conn {}: recv: {}", conn, e);
                break;
            }
        };
        let mut sent = 0;
        while sent < n {
            match f.send(conn, &buf[sent..n], 0) {
                Ok(m) => sent += m,
                Err(e) => {
                    kdebug!("conn {}: send: {}", conn, e);
                    break;
                }
            }
        }
        if sent < n {
            break;
        }
        stats.bytes.fetch_add(n as u64, Ordering::Relaxed);
    }
    if let Err(e) = f.close(conn) {
        kdebug!("conn {}: close: {}", conn, e);
    }
    stats.closed.fetch_add(1, Ordering::Relaxed);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let port: u16 = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| env_get("FIBER_ECHO_PORT", 9999));
    let host = args.get(2).cloned().unwrap_or_else(|| "0.0.0.0".to_string());

    let config = ReactorConfig::from_env();
    let stats = Arc::new(Stats::default());

    let s = stats.clone();
    let result = block_on(config, move |fiber| {
        let ip = match fiber.lookup_network_endpoints(&host, port) {
            Ok(addrs) => addrs.first().map(|a| *a.ip()).unwrap_or(Ipv4Addr::UNSPECIFIED),
            Err(e) => {
                kerror!("cannot resolve {}: {}", host, e);
                return;
            }
        };
        let listener = match fiber.enable_listen_socket(SocketAddrV4::new(ip, port), BACKLOG) {
            Ok(fd) => fd,
            Err(e) => {
                kerror!("listen on {}:{}: {}", ip, port, e);
                return;
            }
        };
        kinfo!("fiber-echo listening on {}:{}", ip, port);

        loop {
            match fiber.accept_cnxn(listener) {
                Ok((conn, peer)) => {
                    let n = s.accepted.fetch_add(1, Ordering::Relaxed) + 1;
                    kdebug!("accepted {} from {} (total {})", conn, peer, n);
                    let stats = s.clone();
                    if let Err(e) = fiber.spawn(move |f| serve_connection(f, conn, &stats)) {
                        kerror!("no fiber for connection {}: {}", conn, e);
                        let _ = fiber.close(conn);
                    }
                }
                Err(e) => {
                    kerror!("accept: {}", e);
                    break;
                }
            }
        }
        let _ = fiber.close(listener);
    });

    if let Err(e) = result {
        eprintln!("reactor failed: {}", e);
        std::process::exit(1);
    }
    kinfo!(
        "served {} connections ({} closed, {} bytes)",
        stats.accepted.load(Ordering::Relaxed),
        stats.closed.load(Ordering::Relaxed),
        stats.bytes.load(Ordering::Relaxed)
    );
}
