//! State owned by the response handler task.
//!
//! The session is the single writer of everything on screen: it turns
//! parsed input into local view changes or outgoing requests, and turns
//! [`ClientEvent`]s into printable lines.

use chrono::{DateTime, Utc};
use comply_client::{ClientEvent, ConnectionState};
use comply_content::{
    CollapsibleError, ContentRenderer, Navigation, ProgressBlock, RenderedContent, Theme,
    render::render_progress,
};
use comply_core::ConsoleError;
use comply_core::protocol::{
    Action, ActionRequest, CancelRequest, CommandRequest, CommandResponse, ProgressRequest,
    SuggestRequest, Workflow,
};
use serde_json::Value;

use crate::helper::SuggestionCache;
use crate::input::Input;

/// A call the handler loop should hand to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Command(CommandRequest),
    Action(ActionRequest),
    Suggest(SuggestRequest),
    Progress(ProgressRequest),
    Cancel(CancelRequest),
    Status,
}

/// Result of handling one input line.
#[derive(Debug, Default)]
pub struct Step {
    pub lines: Vec<String>,
    pub request: Option<Request>,
}

impl Step {
    fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            request: None,
        }
    }

    fn request(request: Request) -> Self {
        Self {
            lines: Vec::new(),
            request: Some(request),
        }
    }
}

pub struct Session {
    renderer: ContentRenderer,
    theme: Theme,
    last_payload: Option<Value>,
    actions: Vec<Action>,
    workflow: Option<Workflow>,
    suggestions: SuggestionCache,
    /// Snapshot restored by the previous `/undo`, if nothing changed since.
    undo_cursor: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(renderer: ContentRenderer, theme: Theme, suggestions: SuggestionCache) -> Self {
        Self {
            renderer,
            theme,
            last_payload: None,
            actions: Vec::new(),
            workflow: None,
            suggestions,
            undo_cursor: None,
        }
    }

    pub fn handle_input(&mut self, input: Input) -> Step {
        match input {
            Input::Empty | Input::Quit => Step::default(),
            Input::Help => Step::lines(self.help()),
            Input::Command(command) => Step::request(Request::Command(CommandRequest::new(command))),
            Input::Action(selector) => self.select_action(&selector),
            Input::Toggle(id) => {
                let result = self.renderer.toggle_collapsible(&id).map(|_| ());
                self.after_view_change(result)
            }
            Input::ExpandAll => {
                self.renderer.expand_all();
                self.after_view_change(Ok(()))
            }
            Input::CollapseAll => {
                self.renderer.collapse_all();
                self.after_view_change(Ok(()))
            }
            Input::Next => self.navigate(Navigation::Next),
            Input::Previous => self.navigate(Navigation::Previous),
            Input::Parent => self.navigate(Navigation::Parent),
            Input::Child => self.navigate(Navigation::Child),
            Input::Undo => Step::lines(self.undo()),
            Input::Progress(operation_id) => {
                Step::request(Request::Progress(ProgressRequest::new(operation_id)))
            }
            Input::Cancel(operation_id) => {
                Step::request(Request::Cancel(CancelRequest::operation(operation_id)))
            }
            Input::Suggest(text) => Step::request(Request::Suggest(SuggestRequest::new(text))),
            Input::Status => Step::request(Request::Status),
            Input::Usage(usage) => Step::lines(vec![self.styled("warning", &format!("Usage: {usage}"))]),
            Input::Unknown(name) => Step::lines(vec![self.styled(
                "warning",
                &format!("Unknown command: {name} (try /help)"),
            )]),
        }
    }

    pub fn handle_event(&mut self, event: ClientEvent) -> Vec<String> {
        match event {
            ClientEvent::Connected(Ok(state)) => vec![self.styled(
                "status_success",
                &format!(
                    "Connected to {} {} (protocol {})",
                    state.app_name.as_deref().unwrap_or("application"),
                    state.app_version.as_deref().unwrap_or("?"),
                    state.protocol_version.as_deref().unwrap_or("?"),
                ),
            )],
            ClientEvent::Connected(Err(err)) => self.error_lines(&err),
            ClientEvent::CommandCompleted { result, .. } | ClientEvent::ActionCompleted { result, .. } => {
                match result {
                    Ok(response) => self.show_response(response),
                    Err(err) => self.error_lines(&err),
                }
            }
            ClientEvent::Suggestions { result, .. } => match result {
                Ok(suggestions) => {
                    if let Ok(mut cache) = self.suggestions.lock() {
                        *cache = suggestions.iter().map(|s| s.text.clone()).collect();
                    }
                    suggestions
                        .iter()
                        .map(|s| match &s.description {
                            Some(description) => {
                                format!("  {}  {}", s.text, self.styled("muted", description))
                            }
                            None => format!("  {}", s.text),
                        })
                        .collect()
                }
                Err(err) => self.error_lines(&err),
            },
            ClientEvent::Progress {
                operation_id,
                result,
            } => match result {
                Ok(progress) => {
                    let block = ProgressBlock {
                        value: progress.progress,
                        label: Some(operation_id),
                        status: Some(progress.status.as_str().to_string()),
                    };
                    let mut lines = vec![render_progress(&block, &self.theme)];
                    if let Some(message) = progress.message {
                        lines.push(self.styled("muted", &message));
                    }
                    lines
                }
                Err(err) => self.error_lines(&err),
            },
            ClientEvent::CancelCompleted(result) => match result {
                Ok(response) if response.success => {
                    vec![self.styled("status_success", &format!("Cancelled: {}", response.message))]
                }
                Ok(response) => {
                    vec![self.styled("warning", &format!("Not cancelled: {}", response.message))]
                }
                Err(err) => self.error_lines(&err),
            },
        }
    }

    pub fn status_lines(&self, state: &ConnectionState) -> Vec<String> {
        let mut lines = vec![self.styled("header", "Connection")];
        let status = if state.connected {
            self.styled("status_success", "connected")
        } else {
            self.styled("status_error", "disconnected")
        };
        lines.push(format!("  host:     {} ({status})", state.host));
        if let (Some(name), Some(version)) = (&state.app_name, &state.app_version) {
            lines.push(format!("  app:      {name} {version}"));
        }
        let enabled: Vec<&str> = state
            .features
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.as_str())
            .collect();
        if !enabled.is_empty() {
            lines.push(format!("  features: {}", enabled.join(", ")));
        }
        let stats = &state.stats;
        lines.push(format!(
            "  requests: {} sent, {} failed, {} retries, avg {}ms",
            stats.requests_sent,
            stats.requests_failed,
            stats.retries,
            stats.average_latency().as_millis()
        ));
        if let Some(err) = &state.last_error {
            lines.push(format!("  last error: {}", self.styled("error", &err.to_string())));
        }
        lines
    }

    fn show_response(&mut self, response: CommandResponse) -> Vec<String> {
        let payload = response.payload();
        self.actions = response.actions;
        self.workflow = response.workflow;
        self.undo_cursor = None;
        // Positional section ids only mean something within one payload.
        self.renderer.collapsibles_mut().clear();

        let mut lines = self.render(&payload);
        self.last_payload = Some(payload);

        if let Some(workflow) = &self.workflow {
            lines.push(self.styled(
                "info",
                &format!(
                    "Workflow {}: step {}/{}",
                    workflow.title, workflow.current_step, workflow.total_steps
                ),
            ));
        }
        lines.extend(self.action_lines());
        lines
    }

    fn error_lines(&mut self, err: &ConsoleError) -> Vec<String> {
        if err.is_cancelled() {
            return vec![self.styled("muted", "Cancelled")];
        }

        let headline = if err.is_validation() {
            format!("Invalid input: {err}")
        } else {
            err.to_string()
        };
        let mut lines = vec![self.styled("error", &headline)];

        if err.recoverable() {
            let hint = match err.retry_after() {
                Some(delay) => format!("Recoverable; try again in {}s", delay.as_secs()),
                None => "Recoverable; try again".to_string(),
            };
            lines.push(self.styled("muted", &hint));
        }

        if !err.is_validation() {
            self.actions = err.with_default_recovery();
            lines.extend(self.action_lines());
        }
        lines
    }

    fn action_lines(&self) -> Vec<String> {
        if self.actions.is_empty() {
            return Vec::new();
        }
        let mut lines = vec![self.styled("header", "Actions")];
        for (index, action) in self.actions.iter().enumerate() {
            let mut line = format!("  [{}] {}", index + 1, action.label);
            if let Some(description) = &action.description {
                line.push_str(&format!(" - {}", self.styled("muted", description)));
            }
            lines.push(line);
        }
        lines
    }

    fn select_action(&mut self, selector: &str) -> Step {
        let action = match selector.parse::<usize>() {
            Ok(number) => match number.checked_sub(1).and_then(|i| self.actions.get(i)) {
                Some(action) => action.clone(),
                None => {
                    return Step::lines(vec![self.styled(
                        "warning",
                        &format!("No action numbered {number}"),
                    )]);
                }
            },
            Err(_) => self
                .actions
                .iter()
                .find(|action| action.id == selector)
                .cloned()
                .unwrap_or_else(|| Action::new(selector, selector, "")),
        };

        if action.id == Action::dismiss().id {
            self.actions.clear();
            return Step::lines(vec![self.styled("muted", "Dismissed")]);
        }

        let mut request = ActionRequest::new(action.id);
        if let Some(workflow) = &self.workflow {
            request = request.in_workflow(workflow.id.clone());
        }
        Step::request(Request::Action(request))
    }

    fn navigate(&mut self, direction: Navigation) -> Step {
        let result = self
            .renderer
            .collapsibles_mut()
            .navigate(direction)
            .map(|_| ());
        self.after_view_change(result)
    }

    fn undo(&mut self) -> Vec<String> {
        let manager = self.renderer.collapsibles();
        let current = self
            .undo_cursor
            .or_else(|| manager.history().last().map(|snapshot| snapshot.timestamp));
        let target = current.and_then(|current| {
            manager
                .history()
                .rev()
                .map(|snapshot| snapshot.timestamp)
                .find(|timestamp| *timestamp < current)
        });

        let Some(target) = target else {
            return vec![self.styled("muted", "Nothing to undo")];
        };

        match self.renderer.collapsibles_mut().restore_from_snapshot(target) {
            Ok(()) => {
                self.undo_cursor = Some(target);
                self.rerender()
            }
            Err(err) => vec![self.styled("error", &err.to_string())],
        }
    }

    fn after_view_change(&mut self, result: Result<(), CollapsibleError>) -> Step {
        match result {
            Ok(()) => {
                self.undo_cursor = None;
                Step::lines(self.rerender())
            }
            Err(err) => Step::lines(vec![self.styled("warning", &err.to_string())]),
        }
    }

    fn rerender(&mut self) -> Vec<String> {
        match self.last_payload.take() {
            Some(payload) => {
                let lines = self.render(&payload);
                self.last_payload = Some(payload);
                lines
            }
            None => Vec::new(),
        }
    }

    fn render(&mut self, payload: &Value) -> Vec<String> {
        let focused = self.renderer.collapsibles().focused().map(str::to_string);
        self.renderer
            .render_content(payload, &self.theme)
            .into_iter()
            .map(|item| self.decorate(item, focused.as_deref()))
            .collect()
    }

    /// Marks section headers with their id so they can be toggled by name.
    fn decorate(&self, item: RenderedContent, focused: Option<&str>) -> String {
        if item.expanded.is_none() {
            return item.text;
        }
        let marker = if focused == Some(item.id.as_str()) { "> " } else { "" };
        format!("{marker}{} {}", item.text, self.styled("muted", &format!("[{}]", item.id)))
    }

    fn help(&self) -> Vec<String> {
        [
            ("<text>", "send a command to the application"),
            ("/action <id|n>", "run an offered action"),
            ("/toggle <id>", "expand or collapse a section"),
            ("/expand, /collapse", "all sections"),
            ("/next, /prev", "move focus between sections"),
            ("/parent, /child", "move focus up or down the section tree"),
            ("/undo", "restore the previous section state"),
            ("/progress <op>", "query a long-running operation"),
            ("/cancel <op>", "cancel a long-running operation"),
            ("/suggest <text>", "ask for completions (Tab completes them)"),
            ("/status", "connection details and statistics"),
            ("quit", "exit"),
        ]
        .iter()
        .map(|(usage, description)| format!("  {usage:<20} {}", self.styled("muted", description)))
        .collect()
    }

    fn styled(&self, style: &str, text: &str) -> String {
        self.theme.apply(style, text)
    }
}
