//! Live query subscriptions.
//!
//! Each subscription is a `tokio::sync::watch` channel holding the latest
//! immutable result of its query. Writers call `publish` after every change
//! for a user; the query is re-run and the new snapshot replaces the old one.

use std::cell::RefCell;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::Result;
use crate::identity::UserRef;

/// Immutable result set pushed to subscribers.
pub type Snapshot<T> = Arc<[T]>;

struct Subscription<Q, T> {
    user: UserRef,
    query: Q,
    tx: watch::Sender<Snapshot<T>>,
}

pub(crate) struct LiveQueries<Q, T> {
    subs: RefCell<Vec<Subscription<Q, T>>>,
}

impl<Q, T> LiveQueries<Q, T> {
    pub(crate) fn new() -> Self {
        Self {
            subs: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(
        &self,
        user: UserRef,
        query: Q,
        initial: Vec<T>,
    ) -> watch::Receiver<Snapshot<T>> {
        let (tx, rx) = watch::channel(Arc::from(initial));
        self.subs.borrow_mut().push(Subscription { user, query, tx });
        rx
    }

    /// Re-run every live query of `user` and push the results.
    ///
    /// Subscriptions whose receivers were all dropped are removed.
    pub(crate) fn publish<F>(&self, user: &UserRef, mut load: F)
    where
        F: FnMut(&Q) -> Result<Vec<T>>,
    {
        let mut subs = self.subs.borrow_mut();
        subs.retain(|sub| sub.tx.receiver_count() > 0);
        for sub in subs.iter().filter(|sub| &sub.user == user) {
            match load(&sub.query) {
                Ok(rows) => {
                    sub.tx.send_replace(Arc::from(rows));
                }
                Err(e) => tracing::warn!(user = %user, error = %e, "live query refresh failed"),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subs.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> UserRef {
        UserRef::new(name).unwrap()
    }

    #[test]
    fn publish_reaches_only_matching_user() {
        let live: LiveQueries<u32, u32> = LiveQueries::new();
        let ada = live.subscribe(user("ada"), 1, vec![]);
        let bob = live.subscribe(user("bob"), 1, vec![7]);

        live.publish(&user("ada"), |q| Ok(vec![*q, 2]));

        assert_eq!(&*ada.borrow().clone(), &[1, 2]);
        assert_eq!(&*bob.borrow().clone(), &[7]);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let live: LiveQueries<(), u32> = LiveQueries::new();
        let rx = live.subscribe(user("ada"), (), vec![]);
        assert_eq!(live.len(), 1);
        drop(rx);
        live.publish(&user("ada"), |_| Ok(vec![]));
        assert_eq!(live.len(), 0);
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let live: LiveQueries<(), u32> = LiveQueries::new();
        let rx = live.subscribe(user("ada"), (), vec![3]);
        live.publish(&user("ada"), |_| {
            Err(crate::error::CoreError::Custom("offline".into()))
        });
        assert_eq!(&*rx.borrow().clone(), &[3]);
    }
}
