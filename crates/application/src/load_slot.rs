use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use keydesk_core::{AppError, AppResult};

/// In-flight fetch shared by every caller that asked while it was running.
pub(crate) type PendingLoad<T> = Shared<BoxFuture<'static, AppResult<Arc<T>>>>;

/// Cache state of one lazily loaded value.
pub(crate) enum LoadState<T> {
    Empty,
    Loading {
        generation: u64,
        pending: PendingLoad<T>,
    },
    Loaded(Arc<T>),
    Failed(AppError),
}

/// What a caller should do after consulting a slot.
pub(crate) enum LoadTicket<T> {
    Ready(Arc<T>),
    Pending {
        generation: u64,
        pending: PendingLoad<T>,
        started: bool,
    },
}

/// Single-flight cache slot with a latest-request-wins generation counter.
///
/// The slot never awaits; callers take a ticket under their lock, await the
/// shared future outside it, then report back through [`LoadSlot::complete`].
pub(crate) struct LoadSlot<T> {
    state: LoadState<T>,
    generation: u64,
}

impl<T> Default for LoadSlot<T> {
    fn default() -> Self {
        Self {
            state: LoadState::Empty,
            generation: 0,
        }
    }
}

impl<T> LoadSlot<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn state(&self) -> &LoadState<T> {
        &self.state
    }

    /// Returns a ticket for the cached value or the running fetch, if any.
    pub(crate) fn current_ticket(&self) -> Option<LoadTicket<T>> {
        match &self.state {
            LoadState::Loaded(value) => Some(LoadTicket::Ready(Arc::clone(value))),
            LoadState::Loading {
                generation,
                pending,
            } => Some(LoadTicket::Pending {
                generation: *generation,
                pending: pending.clone(),
                started: false,
            }),
            LoadState::Empty | LoadState::Failed(_) => None,
        }
    }

    /// Joins the cached value or running fetch, or starts a new fetch.
    ///
    /// A forced reload always starts a new generation, which makes any older
    /// in-flight fetch stale.
    pub(crate) fn acquire<F>(&mut self, force_reload: bool, start: F) -> LoadTicket<T>
    where
        F: FnOnce() -> BoxFuture<'static, AppResult<Arc<T>>>,
    {
        if !force_reload
            && let Some(ticket) = self.current_ticket()
        {
            return ticket;
        }

        self.generation = self.generation.wrapping_add(1);
        let pending = start().shared();
        self.state = LoadState::Loading {
            generation: self.generation,
            pending: pending.clone(),
        };

        LoadTicket::Pending {
            generation: self.generation,
            pending,
            started: true,
        }
    }

    /// Records the outcome of a fetch started under `generation`.
    ///
    /// Returns `false` and leaves the slot alone when that generation is no
    /// longer the one loading.
    pub(crate) fn complete(&mut self, generation: u64, outcome: &AppResult<Arc<T>>) -> bool {
        let is_current = matches!(
            &self.state,
            LoadState::Loading { generation: current, .. } if *current == generation
        );
        if !is_current {
            return false;
        }

        self.state = match outcome {
            Ok(value) => LoadState::Loaded(Arc::clone(value)),
            Err(error) => LoadState::Failed(error.clone()),
        };

        true
    }

    /// Drops any cached value and orphans the running fetch.
    pub(crate) fn invalidate(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = LoadState::Empty;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::FutureExt;
    use futures::future::BoxFuture;
    use keydesk_core::{AppError, AppResult};

    use super::{LoadSlot, LoadState, LoadTicket};

    fn ready(value: u32) -> BoxFuture<'static, AppResult<Arc<u32>>> {
        async move { Ok(Arc::new(value)) }.boxed()
    }

    #[tokio::test]
    async fn second_acquire_joins_running_fetch() {
        let mut slot = LoadSlot::<u32>::default();
        let first = slot.acquire(false, || ready(1));
        let second = slot.acquire(false, || ready(2));

        let LoadTicket::Pending {
            generation: first_generation,
            pending,
            started: true,
        } = first
        else {
            panic!("expected the first ticket to start a fetch");
        };
        let LoadTicket::Pending {
            generation: second_generation,
            started: false,
            ..
        } = second
        else {
            panic!("expected the second ticket to join the fetch");
        };
        assert_eq!(first_generation, second_generation);

        let outcome = pending.await;
        assert!(slot.complete(first_generation, &outcome));
        assert!(matches!(slot.current_ticket(), Some(LoadTicket::Ready(value)) if *value == 1));
    }

    #[tokio::test]
    async fn stale_completion_is_ignored() {
        let mut slot = LoadSlot::<u32>::default();
        let LoadTicket::Pending {
            generation: stale,
            pending,
            ..
        } = slot.acquire(false, || ready(1))
        else {
            panic!("expected pending ticket");
        };
        let LoadTicket::Pending {
            generation: fresh, ..
        } = slot.acquire(true, || ready(2))
        else {
            panic!("expected pending ticket");
        };

        let outcome = pending.await;
        assert!(!slot.complete(stale, &outcome));
        assert!(matches!(
            slot.state(),
            LoadState::Loading { generation, .. } if *generation == fresh
        ));
    }

    #[test]
    fn failure_is_recorded_and_retryable() {
        let mut slot = LoadSlot::<u32>::default();
        let LoadTicket::Pending { generation, .. } = slot.acquire(false, || ready(1)) else {
            panic!("expected pending ticket");
        };

        assert!(slot.complete(generation, &Err(AppError::Internal("boom".to_owned()))));
        assert!(matches!(slot.state(), LoadState::Failed(_)));
        assert!(slot.current_ticket().is_none());
    }

    #[test]
    fn invalidate_resets_to_empty() {
        let mut slot = LoadSlot::<u32>::default();
        let _ = slot.acquire(false, || ready(1));
        slot.invalidate();

        assert!(matches!(slot.state(), LoadState::Empty));
    }
}
