use crossbeam::queue::SegQueue;
use crossbeam_utils::CachePadded;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A multi-producer multi-consumer FIFO shared between rasterizer threads.
pub trait WorkQueue<T>: Sync {
    fn enqueue(&self, value: T);
    fn dequeue(&self) -> Option<T>;
}

struct Node<T> {
    // Uninitialized in the sentinel, initialized in every other node
    data: MaybeUninit<T>,
    next: AtomicPtr<Node<T>>,
}

impl<T> Node<T> {
    fn alloc(data: MaybeUninit<T>) -> *mut Self {
        Box::into_raw(Box::new(Self {
            data,
            next: AtomicPtr::new(ptr::null_mut()),
        }))
    }
}

// A two-lock linked queue in the style of Michael & Scott.
// `head` always points at a sentinel node whose data is not live, so head and tail are never
// null and an enqueue (tail lock only) never touches the node a dequeue (head lock only) frees.
// The one node both sides can see is the sentinel's `next`, published with release/acquire.
pub struct SentinelQueue<T> {
    head: CachePadded<Mutex<*mut Node<T>>>,
    tail: CachePadded<Mutex<*mut Node<T>>>,
}

// Nodes are owned by the queue and handed between threads only under the locks
unsafe impl<T: Send> Send for SentinelQueue<T> {}
unsafe impl<T: Send> Sync for SentinelQueue<T> {}

impl<T> SentinelQueue<T> {
    pub fn new() -> Self {
        let sentinel = Node::alloc(MaybeUninit::uninit());
        Self {
            head: CachePadded::new(Mutex::new(sentinel)),
            tail: CachePadded::new(Mutex::new(sentinel)),
        }
    }

    pub fn push(&self, value: T) {
        let node = Node::alloc(MaybeUninit::new(value));
        let mut tail = lock(&self.tail);
        // SAFETY: the tail node stays alive while the tail lock is held; a dequeue only frees
        // a node after a later node was linked behind it
        unsafe {
            (**tail).next.store(node, Ordering::Release);
        }
        *tail = node;
    }

    pub fn pop(&self) -> Option<T> {
        let mut head = lock(&self.head);
        let sentinel = *head;
        // SAFETY: the sentinel is owned by the head side while the head lock is held
        let next = unsafe { (*sentinel).next.load(Ordering::Acquire) };
        if next.is_null() {
            return None;
        }

        // The first real node becomes the new sentinel; move its data out
        // SAFETY: `next` was fully written before being published with release
        let value = unsafe { ptr::read((*next).data.as_ptr()) };
        *head = next;
        drop(head);

        // SAFETY: the old sentinel is unreachable from both ends now
        unsafe {
            drop(Box::from_raw(sentinel));
        }
        Some(value)
    }
}

impl<T> Default for SentinelQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SentinelQueue<T> {
    fn drop(&mut self) {
        let head = self.head.get_mut().unwrap_or_else(PoisonError::into_inner);
        // The sentinel's data is never live
        let mut node = *head;
        let mut is_sentinel = true;
        while !node.is_null() {
            // SAFETY: exclusive access, every node was created by Node::alloc
            let mut boxed = unsafe { Box::from_raw(node) };
            node = *boxed.next.get_mut();
            if !is_sentinel {
                unsafe {
                    boxed.data.assume_init_drop();
                }
            }
            is_sentinel = false;
        }
    }
}

impl<T: Send> WorkQueue<T> for SentinelQueue<T> {
    #[inline]
    fn enqueue(&self, value: T) {
        self.push(value);
    }

    #[inline]
    fn dequeue(&self) -> Option<T> {
        self.pop()
    }
}

impl<T: Send> WorkQueue<T> for SegQueue<T> {
    #[inline]
    fn enqueue(&self, value: T) {
        self.push(value);
    }

    #[inline]
    fn dequeue(&self) -> Option<T> {
        self.pop()
    }
}

// A panicking holder cannot leave the pointer half-written, so poison is ignored
fn lock<T>(mutex: &Mutex<*mut Node<T>>) -> MutexGuard<'_, *mut Node<T>> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
