//! Catalogue of commands the collection server understands.
//!
//! The console does not know what a command does; it only knows its name,
//! how many inline arguments it takes and which element fields must be
//! prompted for before the request can be built.

use serde_json::{Number, Value};

/// How a command line is handled once it has been validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Forwarded to the server as a request.
    Remote,
    /// Answered locally with the registry's command list.
    Help,
}

/// Value type of a prompted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldKind {
    /// Free text; must not be blank.
    Text,
    /// Signed integer with an optional inclusive lower bound.
    Integer { min: Option<i64> },
    /// Finite floating point number.
    Decimal,
    /// One of a fixed set of upper-case names; matched case-insensitively.
    Choice(&'static [&'static str]),
}

/// One element field collected through prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldSpec {
    pub(crate) name: &'static str,
    pub(crate) prompt: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) optional: bool,
}

impl FieldSpec {
    /// Parses operator input into a JSON value for this field.
    ///
    /// Blank input on an optional field yields `null`.
    pub(crate) fn parse(&self, input: &str) -> Result<Value, String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return if self.optional {
                Ok(Value::Null)
            } else {
                Err(format!("{} must not be empty", self.name))
            };
        }

        match self.kind {
            FieldKind::Text => Ok(Value::String(trimmed.to_owned())),
            FieldKind::Integer { min } => {
                let value: i64 = trimmed
                    .parse()
                    .map_err(|_| format!("{} must be an integer", self.name))?;
                if let Some(bound) = min
                    && value < bound
                {
                    return Err(format!("{} must be at least {bound}", self.name));
                }
                Ok(Value::from(value))
            }
            FieldKind::Decimal => trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("{} must be a number", self.name)),
            FieldKind::Choice(options) => options
                .iter()
                .find(|option| option.eq_ignore_ascii_case(trimmed))
                .map(|option| Value::String((*option).to_owned()))
                .ok_or_else(|| format!("{} must be one of: {}", self.name, options.join(", "))),
        }
    }
}

/// Static description of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CommandSpec {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    /// Names of the inline arguments; the count is the exact arity.
    pub(crate) arguments: &'static [&'static str],
    /// Element fields to prompt for, empty when the command builds none.
    pub(crate) fields: &'static [FieldSpec],
    pub(crate) dispatch: Dispatch,
}

impl CommandSpec {
    /// Usage string such as `update <id>`.
    pub(crate) fn usage(&self) -> String {
        self.arguments
            .iter()
            .fold(String::from(self.name), |mut usage, argument| {
                usage.push_str(" <");
                usage.push_str(argument);
                usage.push('>');
                usage
            })
    }
}

/// Lookup seam between the translator and the command catalogue.
pub(crate) trait CommandRegistry {
    /// All commands in presentation order.
    fn commands(&self) -> &[CommandSpec];

    /// Finds a command by exact name.
    fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.commands().iter().find(|spec| spec.name == name)
    }
}

const TICKET_TYPES: &[&str] = &["VIP", "USUAL", "BUDGET", "CHEAP"];

const TICKET_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        prompt: "Enter ticket name",
        kind: FieldKind::Text,
        optional: false,
    },
    FieldSpec {
        name: "coordinates_x",
        prompt: "Enter coordinate x (integer)",
        kind: FieldKind::Integer { min: None },
        optional: false,
    },
    FieldSpec {
        name: "coordinates_y",
        prompt: "Enter coordinate y (number)",
        kind: FieldKind::Decimal,
        optional: false,
    },
    FieldSpec {
        name: "price",
        prompt: "Enter price (integer, at least 1)",
        kind: FieldKind::Integer { min: Some(1) },
        optional: false,
    },
    FieldSpec {
        name: "type",
        prompt: "Enter ticket type (VIP, USUAL, BUDGET, CHEAP; blank for none)",
        kind: FieldKind::Choice(TICKET_TYPES),
        optional: true,
    },
];

const fn remote(
    name: &'static str,
    description: &'static str,
    arguments: &'static [&'static str],
    fields: &'static [FieldSpec],
) -> CommandSpec {
    CommandSpec {
        name,
        description,
        arguments,
        fields,
        dispatch: Dispatch::Remote,
    }
}

const TICKET_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "help",
        description: "list the available commands",
        arguments: &[],
        fields: &[],
        dispatch: Dispatch::Help,
    },
    remote("info", "print information about the collection", &[], &[]),
    remote("show", "print every element of the collection", &[], &[]),
    remote("add", "add a new element", &[], TICKET_FIELDS),
    remote("update", "replace the element with the given id", &["id"], TICKET_FIELDS),
    remote("remove_by_id", "remove the element with the given id", &["id"], &[]),
    remote("clear", "remove every element", &[], &[]),
    remote("exit", "end the session", &[], &[]),
    remote("remove_head", "print and remove the first element", &[], &[]),
    remote(
        "remove_lower",
        "remove every element lower than the given one",
        &[],
        TICKET_FIELDS,
    ),
    remote(
        "max_by_creation_date",
        "print the most recently created element",
        &[],
        &[],
    ),
    remote(
        "filter_by_type",
        "print the elements with the given type",
        &["type"],
        &[],
    ),
    remote(
        "add_if_max",
        "add a new element if it exceeds the current maximum",
        &[],
        TICKET_FIELDS,
    ),
    remote(
        "average_of_price",
        "print the average price of all elements",
        &[],
        &[],
    ),
];

/// The ticket collection commands understood by the server.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TicketRegistry;

impl CommandRegistry for TicketRegistry {
    fn commands(&self) -> &[CommandSpec] {
        TICKET_COMMANDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde_json::json;

    fn field(name: &str) -> FieldSpec {
        *TICKET_FIELDS
            .iter()
            .find(|spec| spec.name == name)
            .expect("known field")
    }

    #[test]
    fn lookup_finds_registered_commands() {
        let registry = TicketRegistry;
        let spec = registry.lookup("update").expect("update is registered");
        assert_eq!(spec.usage(), "update <id>");
        assert_eq!(spec.fields.len(), TICKET_FIELDS.len());
        assert!(registry.lookup("execute_script").is_none());
        assert!(registry.lookup("UPDATE").is_none());
    }

    #[test]
    fn command_names_are_unique() {
        let names: std::collections::BTreeSet<_> =
            TICKET_COMMANDS.iter().map(|spec| spec.name).collect();
        assert_eq!(names.len(), TICKET_COMMANDS.len());
    }

    #[rstest]
    #[case("name", " gala ", json!("gala"))]
    #[case("coordinates_x", "-4", json!(-4))]
    #[case("coordinates_y", "2.5", json!(2.5))]
    #[case("price", "1", json!(1))]
    #[case("type", "vip", json!("VIP"))]
    #[case("type", "", Value::Null)]
    fn parses_valid_field_input(#[case] name: &str, #[case] input: &str, #[case] expected: Value) {
        assert_eq!(field(name).parse(input), Ok(expected));
    }

    #[rstest]
    #[case("name", "   ", "name must not be empty")]
    #[case("coordinates_x", "left", "coordinates_x must be an integer")]
    #[case("coordinates_y", "NaN", "coordinates_y must be a number")]
    #[case("price", "0", "price must be at least 1")]
    #[case("type", "gold", "type must be one of: VIP, USUAL, BUDGET, CHEAP")]
    fn rejects_invalid_field_input(#[case] name: &str, #[case] input: &str, #[case] message: &str) {
        assert_eq!(field(name).parse(input), Err(String::from(message)));
    }
}
