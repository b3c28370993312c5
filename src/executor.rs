use futures::{future::{BoxFuture, FutureExt}, task::{waker_ref, ArcWake, Context, Poll}};
use futures_channel::oneshot;
use queues::{IsQueue, Queue};
use std::{future::Future, pin::Pin, sync::{Arc, Weak}};

use crate::error::{TbError, TbResult};
use crate::tb_obj::TbObj;

type ReadyQueue = TbObj<Queue<Arc<Task>>>;

/// Single threaded cooperative executor.
///
/// Tasks are only polled from `run_once()`, which the simulator calls once per clock edge after
/// waking the tasks waiting on that edge. The ready queue is drained completely, so every task
/// woken by an edge has settled before the next edge is produced.
pub struct Executor {
    spawner: Spawner,
}

impl Executor {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            spawner: Spawner {
                ready: TbObj::new(Queue::new()),
                tasks: TbObj::new(Vec::new()),
            },
        }
    }

    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    #[inline]
    pub fn run_once(&self) {
        while let Some(task) = self.next_task() {
            process_task(task);
        }
    }

    fn next_task(&self) -> Option<Arc<Task>> {
        self.spawner.ready.get().remove().ok()
    }

    /// Cancels all tasks and drops their futures. Breaks the reference cycles between tasks,
    /// the queues they wait on and the edge callbacks holding their wakers.
    pub fn tear_down(&self) {
        let tasks = std::mem::take(&mut *self.spawner.tasks.get());
        for task in tasks.iter().filter_map(Weak::upgrade) {
            task.cancel();
        }
        self.spawner.ready.with_mut(|q| *q = Queue::new());
    }

    pub fn live_tasks(&self) -> usize {
        self.spawner
            .tasks
            .get()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|t| !t.is_done())
            .count()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.tear_down();
    }
}

#[inline]
fn process_task(task: Arc<Task>) {
    if task.state.with_mut(|s| *s != TaskState::Pending) {
        // cancelled or already finished, a stale wake-up
        return;
    }

    let mut fut_slot = task.future.get();
    if let Some(mut fut) = fut_slot.take() {
        let waker = waker_ref(&task);
        let context = &mut Context::from_waker(&waker);
        match fut.as_mut().poll(context) {
            Poll::Pending => {
                *fut_slot = Some(fut);
            }
            Poll::Ready(result) => {
                drop(fut_slot);
                task.state.with_mut(|s| *s = TaskState::Done);
                if let Some(tx) = task.join_tx.get().take() {
                    let _ = tx.send(result);
                }
            }
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum TaskState {
    Pending,
    Done,
    Cancelled,
}

pub struct Task {
    future: TbObj<Option<BoxFuture<'static, TbResult>>>,
    state: TbObj<TaskState>,
    name: String,
    join_tx: TbObj<Option<oneshot::Sender<TbResult>>>,
    ready: ReadyQueue,
}

impl Task {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn cancel(&self) {
        // Executor drops the Task without execution on a later wake-up. Dropping the join sender
        // lets anybody awaiting it observe the cancellation.
        self.state.with_mut(|s| *s = TaskState::Cancelled);
        let fut = self.future.get().take();
        drop(fut);
        self.join_tx.get().take();
    }
    fn is_done(&self) -> bool {
        *self.state.get() != TaskState::Pending
    }
}

impl ArcWake for Task {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        let _ = arc_self.ready.get().add(arc_self.clone());
    }
}

/// Cloneable handle used to fork new tasks from anywhere in the testbench.
#[derive(Clone)]
pub struct Spawner {
    ready: ReadyQueue,
    tasks: TbObj<Vec<Weak<Task>>>,
}

impl Spawner {
    pub fn fork(&self, future: impl Future<Output = TbResult> + Send + 'static) -> JoinHandle {
        self.spawn("forked", future)
    }

    pub fn spawn(
        &self,
        name: &str,
        future: impl Future<Output = TbResult> + Send + 'static,
    ) -> JoinHandle {
        let (task, join_handle) = self.new_task(future.boxed(), name);
        self.tasks.get().push(Arc::downgrade(&task));
        let _ = self.ready.get().add(task);
        join_handle
    }

    fn new_task(&self, fut: BoxFuture<'static, TbResult>, name: &str) -> (Arc<Task>, JoinHandle) {
        let (tx, rx) = oneshot::channel::<TbResult>();
        let task = Arc::new(Task {
            future: TbObj::new(Some(fut)),
            state: TbObj::new(TaskState::Pending),
            name: name.to_string(),
            join_tx: TbObj::new(Some(tx)),
            ready: self.ready.clone(),
        });
        let join_handle = JoinHandle {
            join_rx: rx,
            name: name.to_string(),
            awaited_task: Some(task.clone()),
        };
        (task, join_handle)
    }
}

pub struct JoinHandle {
    awaited_task: Option<Arc<Task>>,
    name: String,
    join_rx: oneshot::Receiver<TbResult>,
}

impl JoinHandle {
    pub fn cancel(mut self) {
        if let Some(task) = self.awaited_task.take() {
            task.cancel();
        }
    }

    /// Non-blocking check for completion, used by the simulator between clock edges.
    pub fn try_join(&mut self) -> Option<TbResult> {
        match self.join_rx.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(_) => Some(Err(TbError::Cancelled(self.name.clone()))),
        }
    }
}

impl Future for JoinHandle {
    type Output = TbResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.join_rx.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TbError::Cancelled(self.name.clone()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::poll_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn forked_tasks_complete_in_run_once() {
        let exec = Executor::new();
        let spawner = exec.spawner();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let inner = spawner.clone();
        let mut top = spawner.spawn("top", async move {
            let a = inner.fork({
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
            let b = inner.fork(async move {
                c.fetch_add(10, Ordering::SeqCst);
                Ok(())
            });
            a.await?;
            b.await
        });
        assert!(top.try_join().is_none());
        exec.run_once();
        assert!(matches!(top.try_join(), Some(Ok(()))));
        assert_eq!(count.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn cancelled_task_reports_cancellation() {
        let exec = Executor::new();
        let spawner = exec.spawner();
        let pending = spawner.spawn("never", poll_fn(|_| Poll::<TbResult>::Pending));
        let mut watcher = spawner.spawn("watcher", async move { pending.await });
        exec.run_once();
        assert!(watcher.try_join().is_none());
        assert_eq!(exec.live_tasks(), 2);
        exec.tear_down();
        assert!(matches!(watcher.try_join(), Some(Err(TbError::Cancelled(_)))));
    }
}
