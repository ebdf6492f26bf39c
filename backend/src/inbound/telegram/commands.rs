//! Chat command grammar.
//!
//! Commands are `/name` optionally suffixed with `@botname`, followed by
//! whitespace-separated arguments. Route commands take two numeric location
//! ids.

use crate::domain::{LocationId, RouteKey};

/// Commands registered with Telegram, in menu order.
pub const COMMAND_MENU: &[(&str, &str)] = &[
    ("start", "Start the bot"),
    ("info", "List location ids"),
    ("sub", "Subscribe: /sub <from> <to>"),
    ("unsub", "Unsubscribe: /unsub <from> <to>"),
    ("show_all_flights", "Show all known flight dates"),
    ("show_my_subs", "Show my subscriptions"),
];

/// A parsed chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Greeting and usage.
    Start,
    /// Location catalogue.
    Info,
    /// Watch a route.
    Subscribe(RouteKey),
    /// Stop watching a route.
    Unsubscribe(RouteKey),
    /// List the sender's subscriptions.
    ShowMySubscriptions,
    /// List every stored route with its dates.
    ShowAllFlights,
}

/// Why a message that looked like a command could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    /// The command name is not one the bot knows.
    #[error("unknown command /{name}")]
    Unknown {
        /// Name as typed, without the slash or bot suffix.
        name: String,
    },
    /// The arguments do not match the command's usage.
    #[error("usage: /{command} <from id> <to id>")]
    Usage {
        /// Command whose usage was violated.
        command: &'static str,
    },
}

impl BotCommand {
    /// Parse `text`; `None` when it is not a command at all.
    ///
    /// # Examples
    /// ```
    /// use flightwatch::domain::{LocationId, RouteKey};
    /// use flightwatch::inbound::telegram::BotCommand;
    ///
    /// let parsed = BotCommand::parse("/sub@flightwatch_bot 1 4");
    /// assert_eq!(
    ///     parsed,
    ///     Some(Ok(BotCommand::Subscribe(RouteKey::new(
    ///         LocationId::new(1),
    ///         LocationId::new(4)
    ///     ))))
    /// );
    /// assert_eq!(BotCommand::parse("hello"), None);
    /// ```
    pub fn parse(text: &str) -> Option<Result<Self, CommandParseError>> {
        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        let name = head.split_once('@').map_or(head, |(name, _bot)| name);
        let args = words.collect::<Vec<_>>();

        let parsed = match name {
            "start" | "help" => Ok(Self::Start),
            "info" => Ok(Self::Info),
            "sub" => route_args("sub", &args).map(Self::Subscribe),
            "unsub" => route_args("unsub", &args).map(Self::Unsubscribe),
            "show_my_subs" => Ok(Self::ShowMySubscriptions),
            "show_all_flights" => Ok(Self::ShowAllFlights),
            other => Err(CommandParseError::Unknown {
                name: other.to_owned(),
            }),
        };
        Some(parsed)
    }
}

fn route_args(command: &'static str, args: &[&str]) -> Result<RouteKey, CommandParseError> {
    let usage = || CommandParseError::Usage { command };
    let [origin, destination] = args else {
        return Err(usage());
    };
    let origin = origin.parse::<LocationId>().map_err(|_| usage())?;
    let destination = destination.parse::<LocationId>().map_err(|_| usage())?;
    Ok(RouteKey::new(origin, destination))
}

#[cfg(test)]
mod tests {
    //! Grammar coverage for chat commands.

    use super::*;
    use rstest::rstest;

    fn route(origin: i64, destination: i64) -> RouteKey {
        RouteKey::new(LocationId::new(origin), LocationId::new(destination))
    }

    #[rstest]
    #[case("/start", BotCommand::Start)]
    #[case("/help", BotCommand::Start)]
    #[case("/info", BotCommand::Info)]
    #[case("/sub 1 4", BotCommand::Subscribe(route(1, 4)))]
    #[case("  /sub   5   1 ", BotCommand::Subscribe(route(5, 1)))]
    #[case("/unsub 4 1", BotCommand::Unsubscribe(route(4, 1)))]
    #[case("/show_my_subs", BotCommand::ShowMySubscriptions)]
    #[case("/show_all_flights@flightwatch_bot", BotCommand::ShowAllFlights)]
    fn parses_known_commands(#[case] text: &str, #[case] expected: BotCommand) {
        assert_eq!(BotCommand::parse(text), Some(Ok(expected)));
    }

    #[rstest]
    #[case("/sub")]
    #[case("/sub 1")]
    #[case("/sub 1 4 5")]
    #[case("/sub Tbilisi Batumi")]
    fn malformed_route_arguments_report_usage(#[case] text: &str) {
        assert_eq!(
            BotCommand::parse(text),
            Some(Err(CommandParseError::Usage { command: "sub" }))
        );
    }

    #[rstest]
    fn unknown_commands_are_reported_by_name() {
        assert_eq!(
            BotCommand::parse("/weather@flightwatch_bot"),
            Some(Err(CommandParseError::Unknown {
                name: "weather".to_owned()
            }))
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("sub 1 4")]
    fn plain_text_is_not_a_command(#[case] text: &str) {
        assert_eq!(BotCommand::parse(text), None);
    }

    #[rstest]
    fn menu_names_parse_as_commands() {
        for (name, _) in COMMAND_MENU {
            let text = if matches!(*name, "sub" | "unsub") {
                format!("/{name} 1 4")
            } else {
                format!("/{name}")
            };
            assert!(
                matches!(BotCommand::parse(&text), Some(Ok(_))),
                "/{name} should parse"
            );
        }
    }
}
