//! Runs Connection Manager calls off the UI loop and reports back by message.
//!
//! The UI owns the receiving end and consumes [`ClientEvent`]s serially,
//! so it stays the single writer of everything it renders.

use std::future::Future;
use std::sync::Arc;

use comply_core::protocol::{
    ActionRequest, CancelRequest, CancelResponse, CommandRequest, CommandResponse,
    ProgressRequest, ProgressResponse, SuggestRequest, Suggestion,
};
use comply_core::{AuthConfig, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionManager;
use crate::state::ConnectionState;

/// Completion message of one dispatched call.
#[derive(Debug)]
pub enum ClientEvent {
    Connected(Result<ConnectionState>),
    CommandCompleted {
        command: String,
        result: Result<CommandResponse>,
    },
    ActionCompleted {
        action: String,
        result: Result<CommandResponse>,
    },
    Suggestions {
        input: String,
        result: Result<Vec<Suggestion>>,
    },
    Progress {
        operation_id: String,
        result: Result<ProgressResponse>,
    },
    CancelCompleted(Result<CancelResponse>),
}

/// Spawns each call as its own task.
#[derive(Clone)]
pub struct Dispatcher {
    manager: Arc<ConnectionManager>,
    events: mpsc::UnboundedSender<ClientEvent>,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(manager: Arc<ConnectionManager>) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let dispatcher = Self {
            manager,
            events,
            shutdown: CancellationToken::new(),
        };
        (dispatcher, receiver)
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn connect(&self, host: String, auth: Option<AuthConfig>) -> JoinHandle<()> {
        self.spawn(move |manager, _| async move {
            ClientEvent::Connected(manager.connect(&host, auth).await)
        })
    }

    pub fn execute_command(&self, request: CommandRequest) -> JoinHandle<()> {
        self.spawn(move |manager, cancel| async move {
            let result = manager.execute_command(&request, &cancel).await;
            ClientEvent::CommandCompleted {
                command: request.command,
                result,
            }
        })
    }

    pub fn execute_action(&self, request: ActionRequest) -> JoinHandle<()> {
        self.spawn(move |manager, cancel| async move {
            let result = manager.execute_action(&request, &cancel).await;
            ClientEvent::ActionCompleted {
                action: request.action,
                result,
            }
        })
    }

    pub fn get_suggestions(&self, request: SuggestRequest) -> JoinHandle<()> {
        self.spawn(move |manager, _| async move {
            let result = manager.get_suggestions(&request).await;
            ClientEvent::Suggestions {
                input: request.input,
                result,
            }
        })
    }

    pub fn get_progress(&self, request: ProgressRequest) -> JoinHandle<()> {
        self.spawn(move |manager, _| async move {
            let result = manager.get_progress(&request).await;
            ClientEvent::Progress {
                operation_id: request.operation_id,
                result,
            }
        })
    }

    pub fn cancel_operation(&self, request: CancelRequest) -> JoinHandle<()> {
        self.spawn(move |manager, _| async move {
            ClientEvent::CancelCompleted(manager.cancel_operation(&request).await)
        })
    }

    /// Cancels every retried call still in flight.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn spawn<F, Fut>(&self, call: F) -> JoinHandle<()>
    where
        F: FnOnce(Arc<ConnectionManager>, CancellationToken) -> Fut,
        Fut: Future<Output = ClientEvent> + Send + 'static,
    {
        let events = self.events.clone();
        let future = call(Arc::clone(&self.manager), self.shutdown.child_token());
        tokio::spawn(async move {
            let event = future.await;
            // The receiver is gone once the UI shuts down.
            let _ = events.send(event);
        })
    }
}
