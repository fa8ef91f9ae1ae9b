//! Cross-thread channel into a reactor
//!
//! The only reactor resource other threads may touch. Each send pushes one
//! message onto a lock-free queue and rings an eventfd that the reactor's
//! ring watches. The reactor drains the doorbell before the queue, so a
//! message pushed after the drain always produces another wakeup.

use std::sync::Arc;

use crossbeam_queue::SegQueue;
use fiber_core::FiberId;
use fiber_ring::{EventFdNotifier, Notifier};

use crate::body::{Outcome, Task};
use crate::error::FiberResult;
use crate::fiber::Fiber;

pub enum Message {
    /// Stop once the run queue drains
    Shutdown,
    /// Create a fiber around this body
    Spawn(Task),
    /// Delegated job finished; wake the waiting fiber
    Resume { id: FiberId, outcome: Outcome },
}

pub struct Channel {
    queue: SegQueue<Message>,
    doorbell: EventFdNotifier,
}

impl Channel {
    pub fn new() -> FiberResult<Self> {
        Ok(Self {
            queue: SegQueue::new(),
            doorbell: EventFdNotifier::create()?,
        })
    }

    pub fn send(&self, msg: Message) -> FiberResult<()> {
        self.queue.push(msg);
        self.doorbell.notify()?;
        Ok(())
    }

    /// Descriptor for the ring's POLLIN watch
    pub fn fd(&self) -> std::os::unix::io::RawFd {
        self.doorbell.fd()
    }

    /// Reset the doorbell. Call before draining messages.
    pub fn ack(&self) -> FiberResult<u64> {
        Ok(self.doorbell.drain()?)
    }

    pub fn try_recv(&self) -> Option<Message> {
        self.queue.pop()
    }
}

/// Thread-safe handle for injecting work into a reactor.
#[derive(Clone)]
pub struct ReactorHandle {
    channel: Arc<Channel>,
}

impl ReactorHandle {
    pub(crate) fn new(channel: Arc<Channel>) -> Self {
        Self { channel }
    }

    /// Run `f` as a new fiber on the reactor.
    pub fn post<F>(&self, f: F) -> FiberResult<()>
    where
        F: FnOnce(&Fiber) + Send + 'static,
    {
        self.channel.send(Message::Spawn(Box::new(f)))
    }

    /// Same as `post`.
    pub fn execute<F>(&self, f: F) -> FiberResult<()>
    where
        F: FnOnce(&Fiber) + Send + 'static,
    {
        self.post(f)
    }

    /// Ask the reactor to stop. `start()` returns once every runnable
    /// fiber has finished; fibers still blocked are abandoned.
    pub fn shutdown(&self) -> FiberResult<()> {
        self.channel.send(Message::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_in_push_order() {
        let ch = Arc::new(Channel::new().unwrap());
        let handle = ReactorHandle::new(ch.clone());

        handle.post(|_| {}).unwrap();
        handle.shutdown().unwrap();
        ch.send(Message::Resume { id: FiberId::new(3), outcome: Ok(Box::new(5u32) as Box<dyn std::any::Any + Send>) }).unwrap();

        assert_eq!(ch.ack().unwrap(), 3);
        assert!(matches!(ch.try_recv(), Some(Message::Spawn(_))));
        assert!(matches!(ch.try_recv(), Some(Message::Shutdown)));
        match ch.try_recv() {
            Some(Message::Resume { id, outcome: Ok(v) }) => {
                assert_eq!(id, FiberId::new(3));
                assert_eq!(v.downcast_ref::<u32>(), Some(&5));
            }
            _ => panic!("expected resume"),
        }
        assert!(ch.try_recv().is_none());
        assert_eq!(ch.ack().unwrap(), 0);
    }

    #[test]
    fn test_handle_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<ReactorHandle>();
    }

    #[test]
    fn test_send_from_many_threads() {
        let ch = Arc::new(Channel::new().unwrap());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let handle = ReactorHandle::new(ch.clone());
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        handle.post(|_| {}).unwrap();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(ch.ack().unwrap(), 400);
        let mut n = 0;
        while ch.try_recv().is_some() {
            n += 1;
        }
        assert_eq!(n, 400);
    }
}
