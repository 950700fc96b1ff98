//! Lifecycle: setup, presence loop and (optionally) the update pump as supervised tasks
//! under one cancellation scope.

use crate::channels::Update;
use crate::troll::{Reaction, Troll, TrollError};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Lifecycle state, observable through `Troll::phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Draining,
    Stopped,
}

type TaskOutput = (&'static str, Result<(), TrollError>);

impl Troll {
    /// Run setup and, when `presence_loop` is set, the presence loop until `cancel` fires
    /// or a task fails. Returns the first task error; cancellation alone is a clean exit.
    pub async fn run(
        self: Arc<Self>,
        cancel: CancellationToken,
        presence_loop: bool,
    ) -> Result<(), TrollError> {
        self.supervise(cancel, presence_loop, None).await
    }

    /// Like `run`, plus a task that feeds `updates` to `on_message`. A failed reaction
    /// or a closed update channel shuts the whole unit down.
    pub async fn serve(
        self: Arc<Self>,
        cancel: CancellationToken,
        presence_loop: bool,
        updates: mpsc::Receiver<Update>,
    ) -> Result<(), TrollError> {
        self.supervise(cancel, presence_loop, Some(updates)).await
    }

    async fn supervise(
        self: Arc<Self>,
        cancel: CancellationToken,
        presence_loop: bool,
        updates: Option<mpsc::Receiver<Update>>,
    ) -> Result<(), TrollError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TrollError::AlreadyStarted);
        }
        let scope = cancel.child_token();
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();

        let troll = self.clone();
        tasks.spawn(async move {
            let res = troll.setup().await.map(|_| ()).map_err(TrollError::from);
            ("setup", res)
        });
        if presence_loop {
            let troll = self.clone();
            let scope = scope.clone();
            tasks.spawn(async move { ("presence loop", troll.presence_loop(scope).await) });
        }
        if let Some(updates) = updates {
            let troll = self.clone();
            let scope = scope.clone();
            tasks.spawn(async move { ("updates", troll.pump_updates(scope, updates).await) });
        }
        self.set_phase(Phase::Running);

        let mut first_err: Option<TrollError> = None;
        loop {
            tokio::select! {
                biased;
                _ = scope.cancelled() => break,
                Some(joined) = tasks.join_next() => {
                    if let Some(e) = task_error(joined) {
                        first_err.get_or_insert(e);
                        scope.cancel();
                    }
                }
            }
        }

        self.set_phase(Phase::Draining);
        log::info!("run: shutting down, waiting for tasks");
        while let Some(joined) = tasks.join_next().await {
            if let Some(e) = task_error(joined) {
                first_err.get_or_insert(e);
            }
        }
        self.set_phase(Phase::Stopped);
        log::info!("run: stopped");

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Drain the update channel, one handler task per update. In-flight handlers are
    /// awaited, not aborted, on the way out.
    async fn pump_updates(
        self: Arc<Self>,
        scope: CancellationToken,
        mut updates: mpsc::Receiver<Update>,
    ) -> Result<(), TrollError> {
        let mut handlers: JoinSet<Result<Option<Reaction>, TrollError>> = JoinSet::new();
        let mut result = Err(TrollError::Cancelled);
        loop {
            tokio::select! {
                biased;
                _ = scope.cancelled() => break,
                Some(joined) = handlers.join_next() => {
                    if let Err(e) = handler_result(joined) {
                        result = Err(e);
                        break;
                    }
                }
                update = updates.recv() => match update {
                    Some(update) => {
                        let troll = self.clone();
                        handlers.spawn(async move { troll.on_message(&update).await });
                    }
                    None => {
                        result = Err(TrollError::UpdatesClosed);
                        break;
                    }
                },
            }
        }
        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = handler_result(joined) {
                log::warn!("updates: handler failed while draining: {}", e);
                if matches!(result, Err(TrollError::Cancelled)) {
                    result = Err(e);
                }
            }
        }
        result
    }
}

/// Failure worth reporting from a finished task; cancellation is not one.
fn task_error(joined: Result<TaskOutput, JoinError>) -> Option<TrollError> {
    match joined {
        Ok((_, Ok(()))) | Ok((_, Err(TrollError::Cancelled))) => None,
        Ok((name, Err(e))) => {
            log::warn!("run: {} failed: {}", name, e);
            Some(e)
        }
        Err(e) => {
            log::warn!("run: task panicked: {}", e);
            Some(TrollError::TaskPanicked(e.to_string()))
        }
    }
}

fn handler_result(
    joined: Result<Result<Option<Reaction>, TrollError>, JoinError>,
) -> Result<(), TrollError> {
    match joined {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(TrollError::TaskPanicked(e.to_string())),
    }
}
