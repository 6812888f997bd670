use chrono::Local;
use tracing::{debug, info, warn};

use crate::error::ClusterQueryError;
use crate::input::{Action, InputMode, KeyMap};
use crate::k8s::{ExecOutcome, ExecRequest, ResourceGateway};
use crate::model::{
    Depth, ExecSession, Item, Listing, ListingKind, NavigationContext, format_exec_error,
    split_exec_output,
};
use crate::view::{ListView, project};

pub const DEFAULT_EXEC_CHAR_LIMIT: usize = 156;

/// Cluster work requested by a transition. Executed by [`run_command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    LoadNamespaces,
    LoadPods {
        namespace: String,
    },
    LoadContainers {
        namespace: String,
        pod: String,
    },
    LoadLogs {
        namespace: String,
        pod: String,
        container: String,
    },
    RunExec {
        namespace: String,
        pod: String,
        container: String,
        command: String,
    },
}

pub struct App {
    running: bool,
    depth: Depth,
    context: NavigationContext,
    session: ExecSession,
    listing: Listing,
    current_log: Option<String>,
    selected: usize,
    filter: String,
    filtering: bool,
    status: String,
    show_title: bool,
    show_status_bar: bool,
    show_pagination: bool,
    show_help: bool,
    page_size: usize,
    exec_char_limit: usize,
    keymap: KeyMap,
    cluster_label: String,
}

impl App {
    pub fn new(keymap: KeyMap, exec_char_limit: usize) -> Self {
        Self {
            running: true,
            depth: Depth::Namespaces,
            context: NavigationContext::default(),
            session: ExecSession::default(),
            listing: Listing::default(),
            current_log: None,
            selected: 0,
            filter: String::new(),
            filtering: false,
            status: "Ready".to_string(),
            show_title: true,
            show_status_bar: true,
            show_pagination: true,
            show_help: true,
            page_size: 10,
            exec_char_limit: exec_char_limit.max(1),
            keymap,
            cluster_label: String::new(),
        }
    }

    /// The eager namespace fetch that populates the first screen.
    pub fn initial_command(&self) -> AppCommand {
        AppCommand::LoadNamespaces
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        if self.depth == Depth::ExecInput {
            InputMode::ExecInput
        } else if self.filtering {
            InputMode::Filter
        } else {
            InputMode::Browse
        }
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn context(&self) -> &NavigationContext {
        &self.context
    }

    pub fn session(&self) -> &ExecSession {
        &self.session
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn current_log(&self) -> Option<&str> {
        self.current_log.as_deref()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn exec_char_limit(&self) -> usize {
        self.exec_char_limit
    }

    pub fn cluster_label(&self) -> &str {
        &self.cluster_label
    }

    pub fn set_cluster_label(&mut self, label: impl Into<String>) {
        self.cluster_label = label.into();
    }

    pub fn show_title(&self) -> bool {
        self.show_title
    }

    pub fn show_status_bar(&self) -> bool {
        self.show_status_bar
    }

    pub fn show_pagination(&self) -> bool {
        self.show_pagination
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn view(&self) -> ListView {
        project(self.depth, &self.listing, &self.context, &self.session)
    }

    pub fn visible_items(&self) -> Vec<&Item> {
        self.listing
            .items
            .iter()
            .filter(|item| item.matches_filter(&self.filter))
            .collect()
    }

    pub fn selected_index(&self) -> Option<usize> {
        let len = self.visible_items().len();
        if len == 0 {
            None
        } else {
            Some(self.selected.min(len - 1))
        }
    }

    pub fn selected_item(&self) -> Option<&Item> {
        let index = self.selected_index()?;
        self.visible_items().get(index).copied()
    }

    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    pub fn page_label(&self) -> String {
        let len = self.visible_items().len();
        let pages = len.div_ceil(self.page_size).max(1);
        let page = self.selected_index().unwrap_or(0) / self.page_size + 1;
        format!("{page}/{pages}")
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            Action::Select => self.select(),
            Action::Back => self.back(),
            Action::ExecRequested => self.request_exec(),
            Action::Down => {
                self.move_selection(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_selection(-1);
                AppCommand::None
            }
            Action::PageDown => {
                self.move_selection(self.page_size as isize);
                AppCommand::None
            }
            Action::PageUp => {
                self.move_selection(-(self.page_size as isize));
                AppCommand::None
            }
            Action::Top => {
                self.selected = 0;
                AppCommand::None
            }
            Action::Bottom => {
                self.selected = self.visible_items().len().saturating_sub(1);
                AppCommand::None
            }
            Action::StartFilter => {
                if self.depth != Depth::ExecInput {
                    self.filtering = true;
                }
                AppCommand::None
            }
            Action::SubmitInput => {
                self.filtering = false;
                AppCommand::None
            }
            Action::CancelInput => {
                self.filtering = false;
                self.filter.clear();
                self.selected = 0;
                AppCommand::None
            }
            Action::InputChar(c) => {
                self.push_input(c);
                AppCommand::None
            }
            Action::Backspace => {
                self.pop_input();
                AppCommand::None
            }
            Action::ToggleTitle => {
                self.show_title = !self.show_title;
                AppCommand::None
            }
            Action::ToggleStatusBar => {
                self.show_status_bar = !self.show_status_bar;
                AppCommand::None
            }
            Action::TogglePagination => {
                self.show_pagination = !self.show_pagination;
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
        }
    }

    /// Folds a listing result into the view it was fetched for.
    pub fn apply_listing(
        &mut self,
        kind: ListingKind,
        result: Result<Vec<String>, ClusterQueryError>,
    ) {
        if self.depth.listing_kind() != Some(kind) {
            warn!(depth = %self.depth, ?kind, "discarding listing for a depth no longer shown");
            return;
        }

        let title = kind.depth().title();
        match &result {
            Ok(labels) => {
                debug!(?kind, count = labels.len(), "listing loaded");
                self.status = format!("Loaded {} {}", labels.len(), title.to_ascii_lowercase());
            }
            Err(error) => {
                warn!(?kind, "listing failed: {error}");
                self.status = format!("Failed loading {}: {error}", title.to_ascii_lowercase());
            }
        }

        self.listing = Listing::from_query(kind, result, Local::now());
        self.selected = 0;
    }

    /// Folds a finished remote command into the output view.
    pub fn apply_exec_outcome(&mut self, outcome: ExecOutcome) {
        if self.depth != Depth::ExecInput {
            warn!(depth = %self.depth, "discarding exec outcome outside the command prompt");
            return;
        }

        let ExecOutcome {
            stdout,
            stderr,
            error,
        } = outcome;
        let now = Local::now();
        let mut listing = Listing::default();
        match error {
            Some(error) => {
                let message = format_exec_error(
                    self.context.namespace.as_deref().unwrap_or_default(),
                    self.context.pod.as_deref().unwrap_or_default(),
                    self.context.container.as_deref().unwrap_or_default(),
                    &self.session.command,
                    &error,
                );
                warn!("{message}");
                self.status = "Exec failed".to_string();
                self.session.error = Some(message.clone());
                listing.set_error(message, now);
            }
            None => {
                listing.set_labels(split_exec_output(&stdout), now);
                self.status = format!("Exec finished: {}", self.session.command.trim());
            }
        }

        self.session.stdout = stdout;
        self.session.stderr = stderr;
        self.listing = listing;
        self.depth = Depth::ExecOutput;
        self.selected = 0;
    }

    fn select(&mut self) -> AppCommand {
        match self.depth {
            Depth::ExecInput => self.run_exec(),
            Depth::ExecOutput => {
                self.session.clear();
                self.enter(Depth::Containers)
            }
            depth => {
                let Some(label) = self.selected_label() else {
                    return AppCommand::None;
                };
                match depth {
                    Depth::Namespaces => {
                        self.context.namespace = Some(label);
                        self.enter(Depth::Pods)
                    }
                    Depth::Pods => {
                        self.context.pod = Some(label);
                        self.enter(Depth::Containers)
                    }
                    Depth::Containers => {
                        self.context.container = Some(label);
                        self.current_log = None;
                        self.enter(Depth::Logs)
                    }
                    Depth::Logs => {
                        self.current_log = Some(label);
                        AppCommand::None
                    }
                    Depth::ExecInput | Depth::ExecOutput => AppCommand::None,
                }
            }
        }
    }

    fn back(&mut self) -> AppCommand {
        let Some(target) = self.depth.back_target() else {
            return AppCommand::None;
        };

        if self.depth.is_exec() {
            if !self.session.is_empty() {
                info!(command = %self.session.command, "exec session closed");
            }
            self.session.clear();
        }
        if self.depth == Depth::Logs {
            self.current_log = None;
        }
        self.enter(target)
    }

    fn request_exec(&mut self) -> AppCommand {
        if self.depth != Depth::Containers {
            return AppCommand::None;
        }
        let Some(container) = self.selected_label() else {
            return AppCommand::None;
        };

        info!(container = %container, "exec session started");
        self.context.container = Some(container);
        self.session.clear();
        self.filtering = false;
        self.depth = Depth::ExecInput;
        self.status = "Type a command and press enter".to_string();
        AppCommand::None
    }

    fn run_exec(&mut self) -> AppCommand {
        let (Some(namespace), Some(pod), Some(container)) = (
            self.context.namespace.clone(),
            self.context.pod.clone(),
            self.context.container.clone(),
        ) else {
            self.status = "No container selected".to_string();
            return AppCommand::None;
        };

        let command = self.session.command.clone();
        self.status = format!("Running '{}' in {container}…", command.trim());
        AppCommand::RunExec {
            namespace,
            pod,
            container,
            command,
        }
    }

    /// Moves to `depth` with an empty listing and asks for its data.
    fn enter(&mut self, depth: Depth) -> AppCommand {
        debug!(from = %self.depth, to = %depth, "transition");
        if !self.context.satisfies(depth) {
            warn!(depth = %depth, "navigation context is missing a selection");
        }
        self.depth = depth;
        self.listing = Listing::default();
        self.selected = 0;
        self.filter.clear();
        self.filtering = false;
        self.status = format!("Loading {}…", depth.title().to_ascii_lowercase());
        self.load_command(depth)
    }

    fn load_command(&mut self, depth: Depth) -> AppCommand {
        let namespace = self.context.namespace.clone();
        let pod = self.context.pod.clone();
        let container = self.context.container.clone();
        let command = match (depth, namespace, pod, container) {
            (Depth::Namespaces, _, _, _) => Some(AppCommand::LoadNamespaces),
            (Depth::Pods, Some(namespace), _, _) => Some(AppCommand::LoadPods { namespace }),
            (Depth::Containers, Some(namespace), Some(pod), _) => {
                Some(AppCommand::LoadContainers { namespace, pod })
            }
            (Depth::Logs, Some(namespace), Some(pod), Some(container)) => {
                Some(AppCommand::LoadLogs {
                    namespace,
                    pod,
                    container,
                })
            }
            _ => None,
        };

        command.unwrap_or_else(|| {
            self.status = format!("Nothing to load for {}", depth.title().to_ascii_lowercase());
            AppCommand::None
        })
    }

    fn selected_label(&mut self) -> Option<String> {
        match self.selected_item().cloned() {
            Some(Item::Label(label)) => Some(label),
            Some(Item::ErrorPlaceholder(_)) => {
                self.status = "Cannot select an error entry".to_string();
                None
            }
            None => {
                self.status = "Nothing to select".to_string();
                None
            }
        }
    }

    fn push_input(&mut self, c: char) {
        match self.mode() {
            InputMode::ExecInput => {
                if self.session.command.chars().count() < self.exec_char_limit {
                    self.session.command.push(c);
                }
            }
            InputMode::Filter => {
                self.filter.push(c);
                self.selected = 0;
            }
            InputMode::Browse => {}
        }
    }

    fn pop_input(&mut self) {
        match self.mode() {
            InputMode::ExecInput => {
                self.session.command.pop();
            }
            InputMode::Filter => {
                self.filter.pop();
                self.selected = 0;
            }
            InputMode::Browse => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.visible_items().len();
        if len == 0 {
            self.selected = 0;
            return;
        }

        let current = self.selected.min(len - 1) as isize;
        let max_index = (len - 1) as isize;
        self.selected = (current + delta).clamp(0, max_index) as usize;
    }
}

/// Runs `command` against the gateway and folds the result back into `app`.
///
/// Awaited inline by the event loop: no other transition starts until it returns.
pub async fn run_command<G>(app: &mut App, gateway: &G, command: AppCommand)
where
    G: ResourceGateway + ?Sized,
{
    match command {
        AppCommand::None => {}
        AppCommand::LoadNamespaces => {
            let result = gateway.list_namespaces().await;
            app.apply_listing(ListingKind::Namespaces, result);
        }
        AppCommand::LoadPods { namespace } => {
            let result = gateway.list_pods(&namespace).await;
            app.apply_listing(ListingKind::Pods, result);
        }
        AppCommand::LoadContainers { namespace, pod } => {
            let result = gateway.list_containers(&namespace, &pod).await;
            app.apply_listing(ListingKind::Containers, result);
        }
        AppCommand::LoadLogs {
            namespace,
            pod,
            container,
        } => {
            let result = gateway.fetch_logs(&namespace, &pod, &container).await;
            app.apply_listing(ListingKind::Logs, result);
        }
        AppCommand::RunExec {
            namespace,
            pod,
            container,
            command,
        } => {
            let outcome = gateway
                .exec(ExecRequest {
                    command: &command,
                    container: &container,
                    pod: &pod,
                    namespace: &namespace,
                    stdin: None,
                })
                .await;
            app.apply_exec_outcome(outcome);
        }
    }
}
