use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use nexure_agent::StorefrontClient;
use nexure_core::config::{AppConfig, LoadOptions};
use nexure_core::domain::chat::{ChatMessage, MessageId, MessageKind, Sender};
use nexure_core::errors::DomainError;
use nexure_core::flows::{Action, ControlOutcome, FlowController, Navigator};

use crate::commands::flows::load_flow_table;
use crate::commands::{CommandResult, EXIT_FAILURE};

const COMMAND: &str = "chat";
const PROMPT: &str = "> ";

/// Collects storefront paths chosen in the session so they can be printed as links.
#[derive(Debug, Default)]
pub struct LinkNavigator {
    pending: Mutex<Vec<String>>,
}

impl LinkNavigator {
    pub fn drain(&self) -> Vec<String> {
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *pending)
    }
}

impl Navigator for LinkNavigator {
    fn navigate(&self, path: &str) {
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.push(path.to_string());
    }
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, error),
    };

    let table = match load_flow_table(config.chat.flows_path.as_deref()) {
        Ok((table, _)) => table,
        Err(error) => return CommandResult::from_error(COMMAND, DomainError::from(error)),
    };

    let client = match StorefrontClient::from_config(&config) {
        Ok(client) => Arc::new(client),
        Err(error) => return CommandResult::from_error(COMMAND, error),
    };

    let navigator = Arc::new(LinkNavigator::default());
    let controller = FlowController::new(table, client.clone(), client)
        .with_navigator(navigator.clone());

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("could not start async runtime: {error}"),
                EXIT_FAILURE,
            )
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let result = runtime.block_on(session(
        &controller,
        &config,
        &navigator,
        stdin.lock(),
        stdout.lock(),
    ));

    match result {
        Ok(()) => CommandResult::success(COMMAND, "Goodbye!"),
        Err(error) => CommandResult::failure(COMMAND, "io", format!("{error:#}"), EXIT_FAILURE),
    }
}

/// Runs a line-oriented conversation until `/quit`, `/exit` or end of input.
///
/// A bare number picks an option from the latest bot message, except while the
/// current step is collecting a field value.
pub async fn session<R: BufRead, W: Write>(
    controller: &FlowController,
    config: &AppConfig,
    navigator: &LinkNavigator,
    mut input: R,
    mut output: W,
) -> anyhow::Result<()> {
    controller.open();
    let mut printed = print_new_messages(controller, None, &mut output)?;

    let mut line = String::new();
    loop {
        write!(output, "{PROMPT}").context("failed to write prompt")?;
        output.flush().context("failed to flush output")?;

        line.clear();
        if input.read_line(&mut line).context("failed to read input")? == 0 {
            break;
        }
        let entry = line.trim();

        match entry {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                controller.reset();
                writeln!(output, "(conversation reset)").context("failed to write output")?;
                printed = print_new_messages(controller, None, &mut output)?;
                continue;
            }
            _ => {}
        }

        let outcome = match pick_option(controller, entry) {
            Some(action) => controller.handle_action(action).await,
            None => controller.handle_input_submit(entry).await,
        };

        match outcome {
            ControlOutcome::InputRejected { error } => {
                writeln!(output, "! {error}").context("failed to write output")?;
            }
            ControlOutcome::UnknownStep(step) => {
                tracing::warn!(
                    event_name = "chat.cli.unknown_step",
                    step = %step,
                    "option pointed at a missing step"
                );
            }
            _ => {}
        }

        for path in navigator.drain() {
            writeln!(output, "-> {}", config.storefront_link(&path))
                .context("failed to write output")?;
        }
        printed = print_new_messages(controller, printed, &mut output)?;
    }

    controller.close();
    Ok(())
}

fn pick_option(controller: &FlowController, entry: &str) -> Option<Action> {
    let index = entry.parse::<usize>().ok()?.checked_sub(1)?;
    let collecting_input = controller
        .read(|store| store.current_step().cloned())
        .and_then(|step| controller.table().get(&step).map(|step| step.input.is_some()))
        .unwrap_or(false);
    if collecting_input {
        return None;
    }

    controller.read(|store| {
        store
            .messages()
            .iter()
            .rev()
            .find(|message| message.sender == Sender::Bot)
            .and_then(|message| message.options.get(index))
            .map(|option| option.action.clone())
    })
}

fn print_new_messages<W: Write>(
    controller: &FlowController,
    after: Option<MessageId>,
    output: &mut W,
) -> anyhow::Result<Option<MessageId>> {
    let fresh: Vec<ChatMessage> = controller.read(|store| {
        store
            .messages()
            .iter()
            .filter(|message| after.map_or(true, |after| message.id > after))
            .cloned()
            .collect()
    });

    let mut last = after;
    for message in &fresh {
        last = Some(message.id);
        if message.sender == Sender::User || message.kind == MessageKind::Loading {
            continue;
        }
        for line in render_message(message) {
            writeln!(output, "{line}").context("failed to write output")?;
        }
    }
    Ok(last)
}

fn render_message(message: &ChatMessage) -> Vec<String> {
    let mut lines = Vec::new();
    match &message.order {
        Some(order) if message.kind == MessageKind::OrderResult => {
            lines.push(message.content.clone());
            lines.extend(order.render_lines().into_iter().map(|line| format!("  {line}")));
        }
        _ => lines.push(message.content.clone()),
    }
    for (position, option) in message.options.iter().enumerate() {
        lines.push(format!("  [{}] {}", position + 1, option.label));
    }
    lines
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use nexure_core::config::AppConfig;
    use nexure_core::domain::chat::HistoryEntry;
    use nexure_core::domain::order::{OrderResultData, OrderStatus, TrackOrderRequest};
    use nexure_core::flows::{
        storefront_flows, FlowController, OrderLookup, RemoteError, ReplyService,
    };
    use rust_decimal::Decimal;

    use super::{session, LinkNavigator};

    struct FixedOrders;

    #[async_trait]
    impl OrderLookup for FixedOrders {
        async fn track_order(
            &self,
            request: &TrackOrderRequest,
        ) -> Result<OrderResultData, RemoteError> {
            if request.order_number != "NX-1001" {
                return Err(RemoteError::NotFound);
            }
            Ok(OrderResultData {
                order_number: request.order_number.clone(),
                status: OrderStatus::Shipped,
                items: Vec::new(),
                total: Decimal::new(3000, 0),
                tracking_number: None,
                tracking_url: None,
                created_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).single().expect("valid date"),
            })
        }
    }

    struct EchoReplies;

    #[async_trait]
    impl ReplyService for EchoReplies {
        async fn reply(&self, message: &str, _history: &[HistoryEntry]) -> Result<String, RemoteError> {
            Ok(format!("echo: {message}"))
        }
    }

    fn fixture() -> (FlowController, AppConfig, Arc<LinkNavigator>) {
        let navigator = Arc::new(LinkNavigator::default());
        let controller = FlowController::new(
            storefront_flows().expect("builtin flows"),
            Arc::new(FixedOrders),
            Arc::new(EchoReplies),
        )
        .with_navigator(navigator.clone());
        (controller, AppConfig::default(), navigator)
    }

    async fn transcript(script: &str) -> String {
        let (controller, config, navigator) = fixture();
        let mut output = Vec::new();
        session(&controller, &config, &navigator, Cursor::new(script.to_string()), &mut output)
            .await
            .expect("session should finish");
        String::from_utf8(output).expect("utf8 transcript")
    }

    #[tokio::test]
    async fn welcome_options_are_numbered() {
        let text = transcript("/quit\n").await;
        assert!(text.contains("[1] Track My Order"), "{text}");
    }

    #[tokio::test]
    async fn tracking_an_order_through_numbered_options() {
        let text = transcript("1\nNX-1001\nbuyer@example.com\n/quit\n").await;
        assert!(text.contains("Order #NX-1001"), "{text}");
        assert!(text.contains("Rs. 3,000"), "{text}");
        assert!(text.contains("Track Another Order"), "{text}");
    }

    #[tokio::test]
    async fn numbers_typed_into_an_input_step_are_field_values() {
        let text = transcript("1\nNX-1001\n2\n/quit\n").await;
        assert!(text.contains("! Please enter a valid email address."), "{text}");
    }

    #[tokio::test]
    async fn numbers_after_a_free_text_prompt_are_questions() {
        let text = transcript("6\n2\n/quit\n").await;
        assert!(text.contains("echo: 2"), "{text}");
        assert!(!text.contains("We deliver across Pakistan"), "{text}");
    }

    #[tokio::test]
    async fn free_text_gets_an_assistant_reply() {
        let text = transcript("do you ship abroad?\n").await;
        assert!(text.contains("echo: do you ship abroad?"), "{text}");
    }
}
