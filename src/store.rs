//! Action/effect store: a single-consumer reducer loop.
//!
//! Any collaborator enqueues actions through a [`Dispatcher`]. The loop drains
//! them one at a time: reduce, publish the new snapshot, then hand each effect
//! to the [`EffectHandler`] in order. Handlers never touch state; long work
//! runs in spawned tasks that report back by dispatching new actions.

use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// A pure state transition.
pub trait Reducer: Send + Sync + 'static {
    type State: Send + Sync + 'static;
    type Action: Debug + Send + 'static;
    type Effect: Debug + Send + 'static;

    /// Fold one action into the current state. Must not block or perform I/O.
    fn reduce(
        &self,
        state: &Self::State,
        action: Self::Action,
    ) -> (Self::State, Vec<Self::Effect>);
}

/// Performs effects emitted by a reducer.
///
/// `handle` runs on the loop task, so anything slow must be spawned.
pub trait EffectHandler<A, E>: Send + Sync + 'static {
    fn handle(&self, effect: E, dispatcher: &Dispatcher<A>);
}

/// Side-channel cue (haptics, analytics) requested by a transition.
///
/// Nothing in this crate renders them; handlers log them at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Sent,
    Success,
    Failure,
    Rejected,
}

impl Feedback {
    pub fn emit(self, source: &'static str) {
        debug!(source, feedback = ?self, "Feedback");
    }
}

/// Cloneable producer side of a store's action queue.
pub struct Dispatcher<A> {
    tx: mpsc::UnboundedSender<A>,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<A: Debug> Dispatcher<A> {
    /// Enqueue an action. Returns false if the loop has stopped.
    pub fn send(&self, action: A) -> bool {
        match self.tx.send(action) {
            Ok(()) => true,
            Err(mpsc::error::SendError(action)) => {
                debug!(?action, "Store stopped, dropping action");
                false
            }
        }
    }
}

/// Owner handle for a running store.
pub struct StoreHandle<R: Reducer> {
    dispatcher: Dispatcher<R::Action>,
    state_rx: watch::Receiver<Arc<R::State>>,
    task: JoinHandle<()>,
}

impl<R: Reducer> StoreHandle<R> {
    pub fn dispatcher(&self) -> Dispatcher<R::Action> {
        self.dispatcher.clone()
    }

    /// Enqueue an action.
    pub fn send(&self, action: R::Action) -> bool {
        self.dispatcher.send(action)
    }

    /// Latest published snapshot.
    pub fn state(&self) -> Arc<R::State> {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<R::State>> {
        self.state_rx.clone()
    }

    /// Stop the loop. In-flight effect tasks may still finish; their
    /// actions are dropped.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Entry point for building stores.
pub struct Store;

impl Store {
    /// Spawn the reducer loop on the current tokio runtime.
    pub fn spawn<R, H>(reducer: R, initial: R::State, handler: H) -> StoreHandle<R>
    where
        R: Reducer,
        H: EffectHandler<R::Action, R::Effect>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let initial = Arc::new(initial);
        let (state_tx, state_rx) = watch::channel(Arc::clone(&initial));

        let weak = tx.downgrade();
        let task = tokio::spawn(run_loop(reducer, initial, handler, rx, weak, state_tx));

        StoreHandle {
            dispatcher: Dispatcher { tx },
            state_rx,
            task,
        }
    }
}

async fn run_loop<R, H>(
    reducer: R,
    mut state: Arc<R::State>,
    handler: H,
    mut rx: mpsc::UnboundedReceiver<R::Action>,
    weak: mpsc::WeakUnboundedSender<R::Action>,
    state_tx: watch::Sender<Arc<R::State>>,
) where
    R: Reducer,
    H: EffectHandler<R::Action, R::Effect>,
{
    while let Some(action) = rx.recv().await {
        trace!(?action, "Reducing action");
        let (next, effects) = reducer.reduce(&state, action);
        state = Arc::new(next);
        state_tx.send_replace(Arc::clone(&state));

        if effects.is_empty() {
            continue;
        }
        // Upgrading only fails once every producer is gone; the queue is
        // still drained but effects have nobody to report back to.
        let Some(tx) = weak.upgrade() else {
            debug!(count = effects.len(), "No producers left, skipping effects");
            continue;
        };
        let dispatcher = Dispatcher { tx };
        for effect in effects {
            trace!(?effect, "Dispatching effect");
            handler.handle(effect, &dispatcher);
        }
    }
    debug!("Store loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Counter that echoes every `Add` as an effect.
    struct Counter;

    #[derive(Debug)]
    enum CounterAction {
        Add(i64),
        Echoed(i64),
    }

    #[derive(Debug, Clone, PartialEq)]
    struct CounterState {
        total: i64,
        history: Vec<i64>,
    }

    impl Reducer for Counter {
        type State = CounterState;
        type Action = CounterAction;
        type Effect = i64;

        fn reduce(&self, state: &CounterState, action: CounterAction) -> (CounterState, Vec<i64>) {
            let mut next = state.clone();
            match action {
                CounterAction::Add(n) => {
                    next.total += n;
                    next.history.push(n);
                    (next, vec![n])
                }
                CounterAction::Echoed(n) => {
                    next.history.push(-n);
                    (next, vec![])
                }
            }
        }
    }

    #[derive(Default, Clone)]
    struct Recorder {
        seen: Arc<Mutex<Vec<i64>>>,
    }

    impl EffectHandler<CounterAction, i64> for Recorder {
        fn handle(&self, effect: i64, _dispatcher: &Dispatcher<CounterAction>) {
            self.seen.lock().unwrap().push(effect);
        }
    }

    struct Echo;

    impl EffectHandler<CounterAction, i64> for Echo {
        fn handle(&self, effect: i64, dispatcher: &Dispatcher<CounterAction>) {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                dispatcher.send(CounterAction::Echoed(effect));
            });
        }
    }

    fn initial() -> CounterState {
        CounterState {
            total: 0,
            history: vec![],
        }
    }

    async fn wait_for<S, F>(rx: &mut watch::Receiver<Arc<S>>, pred: F) -> Arc<S>
    where
        F: Fn(&S) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                {
                    let current = rx.borrow_and_update().clone();
                    if pred(&current) {
                        return current;
                    }
                }
                rx.changed().await.expect("store dropped");
            }
        })
        .await
        .expect("condition not reached")
    }

    #[tokio::test]
    async fn actions_apply_in_arrival_order() {
        let recorder = Recorder::default();
        let store = Store::spawn(Counter, initial(), recorder.clone());
        for n in 1..=20 {
            store.send(CounterAction::Add(n));
        }
        let mut rx = store.subscribe();
        let state = wait_for(&mut rx, |s| s.history.len() == 20).await;

        assert_eq!(state.history, (1..=20).collect::<Vec<_>>());
        assert_eq!(state.total, 210);
        assert_eq!(*recorder.seen.lock().unwrap(), (1..=20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn observers_never_see_partial_reductions() {
        let store = Store::spawn(Counter, initial(), Recorder::default());
        let mut rx = store.subscribe();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        let watcher = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                sink.lock().unwrap().push(snapshot);
            }
        });

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let d = store.dispatcher();
                tokio::spawn(async move {
                    for _ in 0..25 {
                        d.send(CounterAction::Add(2));
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for p in producers {
            p.await.unwrap();
        }

        let mut rx = store.subscribe();
        wait_for(&mut rx, |s| s.history.len() == 100).await;
        store.shutdown();
        let _ = watcher.await;

        for snapshot in observed.lock().unwrap().iter() {
            assert_eq!(snapshot.total, snapshot.history.iter().sum::<i64>());
        }
    }

    #[tokio::test]
    async fn effects_feed_back_only_through_actions() {
        let store = Store::spawn(Counter, initial(), Echo);
        store.send(CounterAction::Add(3));
        store.send(CounterAction::Add(4));

        let mut rx = store.subscribe();
        let state = wait_for(&mut rx, |s| s.history.len() == 4).await;

        assert_eq!(&state.history[..2], &[3, 4]);
        let mut echoes = state.history[2..].to_vec();
        echoes.sort();
        assert_eq!(echoes, vec![-4, -3]);
        assert_eq!(state.total, 7);
    }

    #[tokio::test]
    async fn send_after_shutdown_is_rejected() {
        let store = Store::spawn(Counter, initial(), Recorder::default());
        let dispatcher = store.dispatcher();
        store.shutdown();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!dispatcher.send(CounterAction::Add(1)));
    }
}
