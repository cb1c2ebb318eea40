use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub(crate) enum TaskError<E> {
    #[error(transparent)]
    Failed(E),
    #[error("Task no longer running")]
    Aborted,
}

struct TaskState<T, E> {
    completed: watch::Receiver<bool>,
    result: OnceLock<Result<T, E>>,
}

/// Handle to a background computation spawned on the runtime. Any number of
/// clones can await the outcome; every waiter observes the same result,
/// including the same failure.
pub(crate) struct TaskHandle<T, E> {
    state: Arc<TaskState<T, E>>,
}

impl<T, E> Clone for TaskHandle<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T, E> TaskHandle<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + 'static,
    {
        let (sender, receiver) = watch::channel(false);
        let state = Arc::new(TaskState {
            completed: receiver,
            result: OnceLock::new(),
        });

        actix_rt::spawn({
            let state = Arc::clone(&state);

            async move {
                let outcome = future.await;
                let _ = state.result.set(outcome);
                let _ = sender.send(true);
            }
        });

        Self { state }
    }

    #[allow(dead_code)]
    pub(crate) fn is_complete(&self) -> bool {
        self.state.result.get().is_some()
    }

    pub(crate) fn result(&self) -> Option<Result<T, TaskError<E>>> {
        self.state
            .result
            .get()
            .map(|outcome| outcome.clone().map_err(TaskError::Failed))
    }

    /// Waits for the task to finish. A task whose future panicked or whose
    /// runtime went away resolves to [`TaskError::Aborted`].
    pub(crate) async fn wait(&self) -> Result<T, TaskError<E>> {
        let mut completed = self.state.completed.clone();

        loop {
            if *completed.borrow_and_update() {
                break;
            }

            if completed.changed().await.is_err() {
                break;
            }
        }

        match self.state.result.get() {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(error)) => Err(TaskError::Failed(error.clone())),
            None => Err(TaskError::Aborted),
        }
    }
}
