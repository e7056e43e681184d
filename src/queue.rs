//! Watch-gated request queues.
//!
//! Each queue owns at most one reactor watch and keeps it alive exactly
//! while the queue is non-empty. The session has two of these: the send
//! queue gated by a writable watch, the awaiting-reply queue gated by a
//! readable watch.

use std::collections::VecDeque;
use std::os::unix::io::RawFd;

use crate::error::BootClientError;
use crate::reactor::{Condition, Reactor, WatchId};
use crate::request::Request;

#[derive(Debug)]
pub(crate) struct RequestQueue {
    requests: VecDeque<Request>,
    condition: Condition,
    watch: Option<WatchId>,
}

impl RequestQueue {
    pub(crate) fn new(condition: Condition) -> Self {
        Self {
            requests: VecDeque::new(),
            condition,
            watch: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub(crate) fn watch(&self) -> Option<WatchId> {
        self.watch
    }

    /// Append to the tail, registering the watch on the first entry.
    pub(crate) fn push_back<R: Reactor + ?Sized>(
        &mut self,
        request: Request,
        reactor: &mut R,
        fd: RawFd,
    ) {
        self.requests.push_back(request);
        if self.watch.is_none() {
            let watch = reactor.watch(fd, self.condition);
            tracing::debug!("Queue became busy, {:?} {} registered", self.condition, watch);
            self.watch = Some(watch);
        }
    }

    pub(crate) fn pop_front(&mut self) -> Option<Request> {
        self.requests.pop_front()
    }

    /// Drop the watch if the queue has drained.
    pub(crate) fn release_if_empty<R: Reactor + ?Sized>(&mut self, reactor: &mut R) {
        if self.requests.is_empty() {
            if let Some(watch) = self.watch.take() {
                tracing::debug!("Queue drained, {:?} {} released", self.condition, watch);
                reactor.stop_watching(watch);
            }
        }
    }

    /// Register the watch for a non-empty queue that has none, e.g. after
    /// attaching to a new reactor.
    pub(crate) fn rearm<R: Reactor + ?Sized>(&mut self, reactor: &mut R, fd: RawFd) {
        if !self.requests.is_empty() && self.watch.is_none() {
            self.watch = Some(reactor.watch(fd, self.condition));
        }
    }

    /// Forget the watch without telling any reactor; the reactor it
    /// belonged to is gone.
    pub(crate) fn forget_watch(&mut self) {
        self.watch = None;
    }

    /// Fail every queued request, head first, and release the watch.
    pub(crate) fn cancel_all<R: Reactor + ?Sized>(
        &mut self,
        reactor: Option<&mut R>,
        error: &BootClientError,
    ) {
        if !self.requests.is_empty() {
            tracing::debug!(
                "Cancelling {} queued request(s): {}",
                self.requests.len(),
                error
            );
        }
        while let Some(request) = self.requests.pop_front() {
            request.fail(error);
        }
        if let (Some(watch), Some(reactor)) = (self.watch.take(), reactor) {
            reactor.stop_watching(watch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Command;
    use crate::request::{FailureHandler, ReplyHandler};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Default)]
    struct MapReactor {
        next: u64,
        active: HashMap<WatchId, Condition>,
    }

    impl Reactor for MapReactor {
        fn watch(&mut self, _fd: RawFd, condition: Condition) -> WatchId {
            self.next += 1;
            let id = WatchId(self.next);
            self.active.insert(id, condition);
            id
        }

        fn stop_watching(&mut self, watch: WatchId) {
            self.active.remove(&watch);
        }
    }

    fn request(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> Request {
        let log = log.clone();
        let tag = tag.to_string();
        let on_failure: FailureHandler =
            Box::new(move |_: &BootClientError| log.borrow_mut().push(format!("failed {tag}")));
        Request::new(Command::Ping, None, ReplyHandler::ack(|| {}), Some(on_failure))
    }

    #[test]
    fn test_watch_follows_queue_occupancy() {
        let log = Rc::default();
        let mut reactor = MapReactor::default();
        let mut queue = RequestQueue::new(Condition::Writable);

        queue.push_back(request(&log, "a"), &mut reactor, 3);
        queue.push_back(request(&log, "b"), &mut reactor, 3);
        assert_eq!(reactor.active.len(), 1);
        let watch = queue.watch().unwrap();
        assert_eq!(reactor.active[&watch], Condition::Writable);

        queue.pop_front();
        queue.release_if_empty(&mut reactor);
        assert_eq!(queue.watch(), Some(watch));

        queue.pop_front();
        queue.release_if_empty(&mut reactor);
        assert!(queue.watch().is_none());
        assert!(reactor.active.is_empty());
    }

    #[test]
    fn test_cancel_all_in_order() {
        let log: Rc<RefCell<Vec<String>>> = Rc::default();
        let mut reactor = MapReactor::default();
        let mut queue = RequestQueue::new(Condition::Readable);
        for tag in ["1", "2", "3"] {
            queue.push_back(request(&log, tag), &mut reactor, 3);
        }

        queue.cancel_all(Some(&mut reactor), &BootClientError::ConnectionClosed);

        assert_eq!(*log.borrow(), vec!["failed 1", "failed 2", "failed 3"]);
        assert!(queue.is_empty());
        assert!(queue.watch().is_none());
        assert!(reactor.active.is_empty());
    }

    #[test]
    fn test_rearm_after_forget() {
        let log = Rc::default();
        let mut old = MapReactor::default();
        let mut queue = RequestQueue::new(Condition::Readable);
        queue.push_back(request(&log, "a"), &mut old, 3);

        queue.forget_watch();
        let mut new = MapReactor::default();
        queue.rearm(&mut new, 3);
        assert_eq!(new.active.len(), 1);
        assert_eq!(queue.len(), 1);
    }
}
