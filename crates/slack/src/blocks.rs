use bonusbot_core::{LookupReport, Period, Reply, Role};
use serde::Serialize;

pub const ROLE_SELECT_ACTION: &str = "bonus.role.select.v1";
pub const PERIOD_SELECT_ACTION: &str = "bonus.period.select.v1";
pub const CANCEL_ACTION: &str = "bonus.cancel.v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), text: TextObject::plain(label), style: None, value: None }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Context { block_id: String, elements: Vec<TextObject> },
}

/// A reply ready for posting: `fallback_text` is what clients without block
/// support show.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

fn cancel_button() -> ButtonElement {
    ButtonElement::new(CANCEL_ACTION, "Cancel").style(ButtonStyle::Danger).value("cancel")
}

/// Role choice: one button per role plus cancel.
pub fn role_prompt_message(retry: bool) -> MessageTemplate {
    let text = Reply::PromptRole { retry }.text();
    MessageBuilder::new(text.clone())
        .section("bonus.role.prompt.v1", |section| {
            section.plain(text);
        })
        .actions("bonus.role.actions.v1", |actions| {
            for role in Role::ALL {
                actions.button(
                    ButtonElement::new(ROLE_SELECT_ACTION, role.display_name()).value(role.as_str()),
                );
            }
            actions.button(cancel_button());
        })
        .build()
}

pub fn period_prompt_message(role: Role, retry: bool) -> MessageTemplate {
    let text = Reply::PromptPeriod { role, retry }.text();
    MessageBuilder::new(text.clone())
        .section("bonus.period.prompt.v1", |section| {
            section.plain(text);
        })
        .actions("bonus.period.actions.v1", |actions| {
            for period in Period::ALL {
                actions.button(
                    ButtonElement::new(PERIOD_SELECT_ACTION, period.display_name())
                        .value(period.as_str()),
                );
            }
            actions.button(cancel_button());
        })
        .build()
}

pub fn identifier_prompt_message(role: Role, period: Period, retry: bool) -> MessageTemplate {
    let text = Reply::PromptIdentifier { role, period, retry }.text();
    MessageBuilder::new(text.clone())
        .section("bonus.identifier.prompt.v1", |section| {
            section.plain(text);
        })
        .actions("bonus.identifier.actions.v1", |actions| {
            actions.button(cancel_button());
        })
        .build()
}

pub fn report_message(report: &LookupReport) -> MessageTemplate {
    let lines = report.lines.iter().map(|line| line.render()).collect::<Vec<_>>().join("\n");
    let mut builder = MessageBuilder::new(report.render())
        .section("bonus.report.header.v1", |section| {
            section.mrkdwn(format!(
                "*{}* · {}\nPersonnel number `{}`, hire date {}",
                report.role, report.period, report.personnel_number, report.hire_date
            ));
        })
        .section("bonus.report.lines.v1", |section| {
            section.plain(lines);
        });
    if let Some(elapsed_ms) = report.elapsed_ms {
        builder = builder.context("bonus.report.timing.v1", |context| {
            context.plain(format!("Lookup time: {elapsed_ms} ms"));
        });
    }
    builder.build()
}

pub fn notice_message(text: &str) -> MessageTemplate {
    MessageBuilder::new(text.to_owned())
        .section("bonus.notice.v1", |section| {
            section.plain(text);
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("bonus.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("bonus.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn help_message() -> MessageTemplate {
    MessageBuilder::new("Bonus lookup help")
        .section("bonus.help.summary.v1", |section| {
            section.mrkdwn(
                "*Available commands*\n• `/bonus` or `/bonus start` begins a lookup\n• `/bonus cancel` abandons the current lookup\n• `/bonus help`",
            );
        })
        .build()
}

/// Renders a conversation reply. `None` means nothing should be posted.
pub fn reply_message(reply: &Reply) -> Option<MessageTemplate> {
    let message = match reply {
        Reply::PromptRole { retry } => role_prompt_message(*retry),
        Reply::PromptPeriod { role, retry } => period_prompt_message(*role, *retry),
        Reply::PromptIdentifier { role, period, retry } => {
            identifier_prompt_message(*role, *period, *retry)
        }
        Reply::Report(report) => report_message(report),
        Reply::Failure { message, correlation_id, .. } => error_message(message, correlation_id),
        Reply::NotFound { .. } | Reply::RestartRequired | Reply::Cancelled => {
            notice_message(&reply.text())
        }
        Reply::Superseded => return None,
    };
    Some(message)
}
