//! Carries a [`Connection`] through a task so handlers deep in a call chain
//! can reach it without threading it through every signature.

use std::{future::Future, sync::Arc};

use crate::Connection;

tokio::task_local! {
    static CURRENT: Arc<Connection>;
}

/// Runs `future` with `conn` attached to its task scope.
pub async fn attach<F>(conn: Arc<Connection>, future: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(conn, future).await
}

/// Returns the connection attached by the enclosing [`attach`].
///
/// # Panics
///
/// Panics when no connection is attached; calling this outside [`attach`]
/// is a programming error. Use [`try_current`] to probe instead.
#[must_use]
pub fn current() -> Arc<Connection> {
    CURRENT.with(Arc::clone)
}

/// Returns the attached connection, if any.
#[must_use]
pub fn try_current() -> Option<Arc<Connection>> {
    CURRENT.try_with(Arc::clone).ok()
}
