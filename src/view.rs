use std::collections::BTreeSet;

use crate::model::{Depth, ExecSession, Item, Listing, NavigationContext};

/// Key actions a view advertises in the help line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ViewAction {
    Select,
    Back,
    Exec,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ListView {
    pub title: String,
    pub breadcrumb: String,
    pub items: Vec<Item>,
    pub error: Option<String>,
    pub actions: BTreeSet<ViewAction>,
}

/// Presentation for one depth. Pure: equal inputs give equal output.
///
/// The exec session is only read to decorate the exec titles with the command text.
pub fn project(
    depth: Depth,
    listing: &Listing,
    context: &NavigationContext,
    session: &ExecSession,
) -> ListView {
    ListView {
        title: title_for(depth, session),
        breadcrumb: context.breadcrumb(),
        items: listing.items.clone(),
        error: listing.error.clone(),
        actions: actions_for(depth),
    }
}

fn title_for(depth: Depth, session: &ExecSession) -> String {
    let command = session.command.trim();
    match depth {
        Depth::ExecInput if command.is_empty() => depth.title().to_string(),
        Depth::ExecInput => format!("{}: {command}", depth.title()),
        Depth::ExecOutput => {
            format!("{}: {command} (enter returns to Containers)", depth.title())
        }
        _ => depth.title().to_string(),
    }
}

pub fn actions_for(depth: Depth) -> BTreeSet<ViewAction> {
    let actions: &[ViewAction] = match depth {
        Depth::Namespaces | Depth::Pods => &[ViewAction::Select],
        Depth::Containers => &[ViewAction::Select, ViewAction::Back, ViewAction::Exec],
        Depth::Logs => &[ViewAction::Back],
        Depth::ExecInput | Depth::ExecOutput => &[ViewAction::Select, ViewAction::Back],
    };
    actions.iter().copied().collect()
}
