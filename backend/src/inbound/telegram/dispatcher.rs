//! Turns parsed chat commands into subscription-service calls and replies.

use std::sync::Arc;

use tracing::{debug, warn};

use super::commands::{BotCommand, CommandParseError};
use crate::domain::ports::NotificationChannel;
use crate::domain::{
    AvailabilitySnapshot, Error, ErrorCode, SubscriberId, SubscriptionService, location_label,
    route_label,
};

const FALLBACK_REPLY: &str = "Something went wrong on our side. Please try again later.";

/// Executes chat commands for one bot.
pub struct CommandDispatcher {
    service: SubscriptionService,
    replies: Arc<dyn NotificationChannel>,
}

impl CommandDispatcher {
    /// Build a dispatcher replying through `replies`.
    pub fn new(service: SubscriptionService, replies: Arc<dyn NotificationChannel>) -> Self {
        Self { service, replies }
    }

    /// Handle one incoming message. Non-command text is ignored.
    pub async fn handle_message(&self, chat: SubscriberId, text: &str) {
        let Some(parsed) = BotCommand::parse(text) else {
            debug!(%chat, "ignoring non-command message");
            return;
        };
        let replies = match parsed {
            Ok(command) => self.execute(chat, command).await,
            Err(error) => vec![render_parse_error(&error)],
        };
        for reply in replies {
            if let Err(error) = self.replies.send(chat, &reply).await {
                warn!(%chat, %error, "failed to send command reply");
            }
        }
    }

    /// Run `command` for `chat` and return the replies to send, in order.
    pub async fn execute(&self, chat: SubscriberId, command: BotCommand) -> Vec<String> {
        debug!(%chat, ?command, "executing chat command");
        match command {
            BotCommand::Start => vec![welcome_text()],
            BotCommand::Info => vec![self.catalogue_text()],
            BotCommand::Subscribe(route) => vec![match self.service.subscribe(chat, route).await {
                Ok(_) => format!("Subscribed to {}.", route_label(route)),
                Err(error) => render_error(&error),
            }],
            BotCommand::Unsubscribe(route) => {
                vec![match self.service.unsubscribe(chat, route).await {
                    Ok(_) => format!("Unsubscribed from {}.", route_label(route)),
                    Err(error) => render_error(&error),
                }]
            }
            BotCommand::ShowMySubscriptions => {
                vec![match self.service.subscriptions_for(chat).await {
                    Ok(subscriptions) if subscriptions.is_empty() => {
                        "You have no subscriptions.".to_owned()
                    }
                    Ok(subscriptions) => {
                        let lines = subscriptions
                            .iter()
                            .map(|subscription| route_label(subscription.route))
                            .collect::<Vec<_>>();
                        format!("Your subscriptions:\n{}", lines.join("\n"))
                    }
                    Err(error) => render_error(&error),
                }]
            }
            BotCommand::ShowAllFlights => match self.service.all_flights().await {
                Ok(flights) if flights.is_empty() => {
                    vec!["No flights available at the moment.".to_owned()]
                }
                Ok(flights) => flights.iter().map(flight_text).collect(),
                Err(error) => vec![render_error(&error)],
            },
        }
    }

    fn catalogue_text(&self) -> String {
        let lines = self
            .service
            .catalogue()
            .iter()
            .map(|location| location_label(location.id))
            .collect::<Vec<_>>();
        format!("Known locations:\n{}", lines.join("\n"))
    }
}

fn welcome_text() -> String {
    [
        "Hi! I watch flight dates and message you when they change.",
        "/info lists location ids.",
        "/sub <from> <to> starts watching a route, /unsub <from> <to> stops.",
        "/show_my_subs and /show_all_flights show what is tracked.",
    ]
    .join("\n")
}

fn flight_text(snapshot: &AvailabilitySnapshot) -> String {
    let dates = snapshot.sorted_dates();
    if dates.is_empty() {
        format!("{}: no dates", route_label(snapshot.route()))
    } else {
        format!("{}: {}", route_label(snapshot.route()), dates.join(", "))
    }
}

fn render_parse_error(error: &CommandParseError) -> String {
    match error {
        CommandParseError::Unknown { .. } => format!("Sorry, {error}. Try /start."),
        CommandParseError::Usage { .. } => format!("Sorry, {error}. Ids are listed by /info."),
    }
}

fn render_error(error: &Error) -> String {
    match error.code() {
        ErrorCode::InvalidRequest | ErrorCode::NotFound | ErrorCode::Conflict => {
            format!("Sorry, {}.", error.message())
        }
        _ => {
            warn!(code = ?error.code(), message = error.message(), "command failed");
            FALLBACK_REPLY.to_owned()
        }
    }
}
