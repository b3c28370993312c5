use futures::future::poll_fn;
use std::collections::VecDeque;
use std::sync::Arc;
use std::task::{Poll, Waker};

use crate::tb_obj::TbObj;

struct FifoInner<T> {
    items: VecDeque<T>,
    capacity: Option<usize>,
    getters: Vec<Waker>,
    putters: Vec<Waker>,
}

impl<T> FifoInner<T> {
    fn is_full(&self) -> bool {
        self.capacity.is_some_and(|c| self.items.len() >= c)
    }
}

/// FIFO channel between tasks. `put().await` suspends while a bounded FIFO is full,
/// `get().await` while it is empty.
pub struct Fifo<T>(TbObj<FifoInner<T>>);

impl<T> Clone for Fifo<T> {
    fn clone(&self) -> Self {
        Fifo(self.0.clone())
    }
}

impl<T: Send> Fifo<T> {
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::new(Some(capacity.max(1)))
    }

    fn new(capacity: Option<usize>) -> Self {
        Fifo(TbObj::new(FifoInner {
            items: VecDeque::new(),
            capacity,
            getters: Vec::new(),
            putters: Vec::new(),
        }))
    }

    pub fn try_put(&self, item: T) -> Result<(), T> {
        let getters = {
            let mut f = self.0.get();
            if f.is_full() {
                return Err(item);
            }
            f.items.push_back(item);
            std::mem::take(&mut f.getters)
        };
        getters.into_iter().for_each(Waker::wake);
        Ok(())
    }

    pub async fn put(&self, item: T) {
        let mut item = Some(item);
        poll_fn(|cx| {
            let Some(it) = item.take() else {
                return Poll::Ready(());
            };
            match self.try_put(it) {
                Ok(()) => Poll::Ready(()),
                Err(it) => {
                    item = Some(it);
                    self.0.get().putters.push(cx.waker().clone());
                    Poll::Pending
                }
            }
        })
        .await
    }

    pub fn try_get(&self) -> Option<T> {
        let (item, putters) = {
            let mut f = self.0.get();
            let item = f.items.pop_front()?;
            (item, std::mem::take(&mut f.putters))
        };
        putters.into_iter().for_each(Waker::wake);
        Some(item)
    }

    pub async fn get(&self) -> T {
        poll_fn(|cx| match self.try_get() {
            Some(item) => Poll::Ready(item),
            None => {
                self.0.get().getters.push(cx.waker().clone());
                Poll::Pending
            }
        })
        .await
    }

    pub fn len(&self) -> usize {
        self.0.get().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Passive observer of an analysis port.
pub trait Subscriber<T>: Send + Sync {
    fn write(&self, item: &T);
}

// An analysis FIFO: unbounded, so a write never blocks the publisher.
impl<T: Clone + Send> Subscriber<T> for Fifo<T> {
    fn write(&self, item: &T) {
        let mut item = Some(item.clone());
        while let Some(it) = item.take() {
            if let Err(it) = self.try_put(it) {
                // bounded FIFOs drop the oldest entry instead of blocking the publisher
                let _ = self.try_get();
                item = Some(it);
            }
        }
    }
}

/// Push based broadcast to any number of subscribers.
pub struct AnalysisPort<T> {
    name: String,
    subscribers: Vec<Arc<dyn Subscriber<T>>>,
}

impl<T> AnalysisPort<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connect(&mut self, subscriber: Arc<dyn Subscriber<T>>) {
        self.subscribers.push(subscriber);
    }

    pub fn write(&self, item: &T) {
        for s in &self.subscribers {
            s.write(item);
        }
    }

    pub fn subscribers(&self) -> usize {
        self.subscribers.len()
    }
}
