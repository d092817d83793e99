//! Persistence action tag.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Last persistence operation requested by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Action {
    #[default]
    NoAction,
    Add,
    Update,
    Delete,
    DeleteAll,
}

impl Action {
    /// Route/wire name, e.g. `DELETE_ALL`.
    pub fn name(self) -> &'static str {
        match self {
            Self::NoAction => "NO_ACTION",
            Self::Add => "ADD",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::DeleteAll => "DELETE_ALL",
        }
    }

    /// Parses a list-route argument. Absent or blank means `NoAction`.
    pub fn from_route_arg(arg: Option<&str>) -> Result<Self, ActionParseError> {
        match arg.map(str::trim) {
            None | Some("") => Ok(Self::NoAction),
            Some(name) => name.parse(),
        }
    }

    /// Whether this action needs a valid draft before it may run.
    pub fn requires_valid_draft(self) -> bool {
        matches!(self, Self::Add | Self::Update)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "NO_ACTION" => Ok(Self::NoAction),
            "ADD" => Ok(Self::Add),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "DELETE_ALL" => Ok(Self::DeleteAll),
            other => Err(ActionParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionParseError(pub String);

impl Display for ActionParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown action `{}`", self.0)
    }
}

impl Error for ActionParseError {}

#[cfg(test)]
mod tests {
    use super::Action;

    #[test]
    fn route_arg_defaults_to_no_action() {
        assert_eq!(Action::from_route_arg(None).unwrap(), Action::NoAction);
        assert_eq!(Action::from_route_arg(Some("  ")).unwrap(), Action::NoAction);
        assert_eq!(
            Action::from_route_arg(Some("DELETE_ALL")).unwrap(),
            Action::DeleteAll
        );
        assert!(Action::from_route_arg(Some("archive")).is_err());
    }

    #[test]
    fn names_round_trip() {
        for action in [
            Action::NoAction,
            Action::Add,
            Action::Update,
            Action::Delete,
            Action::DeleteAll,
        ] {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
    }
}
