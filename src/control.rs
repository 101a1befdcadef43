use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::mute::MuteStore;
use crate::resolver::NamespaceResolver;
use crate::telegram::{
    CallbackQuery, ChatApi, InlineButton, InlineKeyboard, Message, TelegramClient, Update,
};

pub const STATUS_REPLY: &str = "🚀 Kubernetes pod watchdog is running!";
pub const MUTE_MENU_PROMPT: &str = "Choose a namespace to pause notifications for:";
pub const UNMUTE_MENU_PROMPT: &str = "Choose a namespace to resume notifications for:";
pub const NOTHING_MUTED_REPLY: &str = "No paused namespaces.";
pub const NO_NAMESPACES_REPLY: &str = "No namespaces available to pause.";

/// How long a menu button stays valid after the menu was sent.
pub const MENU_TTL: Duration = Duration::from_secs(24 * 3600);

const MUTE_PREFIX: &str = "pause_";
const UNMUTE_PREFIX: &str = "resume_";

const POLL_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    MuteMenu,
    UnmuteMenu,
}

impl Command {
    /// Parses `/start`, `/pause` and `/resume`, ignoring a `@botname` suffix and any arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(cmd, _)| cmd);
        match name {
            "start" => Some(Command::Status),
            "pause" => Some(Command::MuteMenu),
            "resume" => Some(Command::UnmuteMenu),
            _ => None,
        }
    }
}

/// Button payloads: `pause_<id>` / `resume_<id>`, where the id points into the
/// [`MenuRegistry`]. The namespace itself never travels through Telegram, so
/// payloads stay short for any valid name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Mute(u64),
    Unmute(u64),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Mute(id) => format!("{}{}", MUTE_PREFIX, id),
            CallbackAction::Unmute(id) => format!("{}{}", UNMUTE_PREFIX, id),
        }
    }

    pub fn decode(data: &str) -> Option<Self> {
        if let Some(rest) = data.strip_prefix(MUTE_PREFIX) {
            rest.parse().ok().map(CallbackAction::Mute)
        } else if let Some(rest) = data.strip_prefix(UNMUTE_PREFIX) {
            rest.parse().ok().map(CallbackAction::Unmute)
        } else {
            None
        }
    }

    pub fn menu_id(&self) -> u64 {
        match self {
            CallbackAction::Mute(id) | CallbackAction::Unmute(id) => *id,
        }
    }
}

/// Short-lived mapping from menu button ids to namespace names.
pub struct MenuRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, (String, Instant)>>,
    ttl: Duration,
}

impl MenuRegistry {
    pub fn new(ttl: Duration) -> Self {
        // Seeded from the wall clock so buttons left over from a previous process
        // never collide with fresh ids.
        let seed = chrono::Utc::now().timestamp_millis().max(1) as u64;
        Self {
            next_id: AtomicU64::new(seed),
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn register(&self, namespace: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.retain(|_, (_, expiry)| *expiry > now);
        entries.insert(id, (namespace.to_string(), now + self.ttl));
        id
    }

    /// The namespace behind `id`, unless it is unknown or expired.
    pub fn lookup(&self, id: u64) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .get(&id)
            .filter(|(_, expiry)| *expiry > Instant::now())
            .map(|(ns, _)| ns.clone())
    }
}

/// Renders a TTL as e.g. `1h`, `1h 30m` or `45s`.
pub fn format_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut parts = Vec::new();
    if h > 0 {
        parts.push(format!("{}h", h));
    }
    if m > 0 {
        parts.push(format!("{}m", m));
    }
    if s > 0 || parts.is_empty() {
        parts.push(format!("{}s", s));
    }
    parts.join(" ")
}

pub fn mute_confirmation(namespace: &str, ttl: Duration) -> String {
    let until = chrono::Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
    format!(
        "🔇 Notifications for `{}` paused for {} (until {} UTC).",
        namespace,
        format_ttl(ttl),
        until.format("%H:%M")
    )
}

pub fn unmute_confirmation(namespace: &str) -> String {
    format!("🔔 Notifications for `{}` resumed.", namespace)
}

/// Handles operator commands and button presses from the configured chat.
pub struct ControlSurface {
    chat: Arc<dyn ChatApi>,
    resolver: NamespaceResolver,
    mutes: Arc<dyn MuteStore>,
    menus: MenuRegistry,
    chat_id: String,
    mute_ttl: Duration,
}

impl ControlSurface {
    pub fn new(
        chat: Arc<dyn ChatApi>,
        resolver: NamespaceResolver,
        mutes: Arc<dyn MuteStore>,
        chat_id: impl Into<String>,
        mute_ttl: Duration,
    ) -> Self {
        Self {
            chat,
            resolver,
            mutes,
            menus: MenuRegistry::new(MENU_TTL),
            chat_id: chat_id.into(),
            mute_ttl,
        }
    }

    pub async fn handle_update(&self, update: Update) -> Result<()> {
        if let Some(cb) = update.callback_query {
            return self.handle_callback(cb).await;
        }
        let Some(message) = update.message else {
            return Ok(());
        };
        if !self.is_operator_chat(&message) {
            debug!("Ignoring message from chat {}", message.chat.id);
            return Ok(());
        }
        let Some(cmd) = message.text.as_deref().and_then(Command::parse) else {
            return Ok(());
        };
        self.handle_command(cmd).await
    }

    pub async fn handle_command(&self, cmd: Command) -> Result<()> {
        info!("Handling command {:?}", cmd);
        match cmd {
            Command::Status => self.reply(STATUS_REPLY, None).await,
            Command::MuteMenu => {
                let namespaces = self.resolver.resolve().await?;
                if namespaces.is_empty() {
                    return self.reply(NO_NAMESPACES_REPLY, None).await;
                }
                let menu = self.build_menu(&namespaces, CallbackAction::Mute);
                self.reply(MUTE_MENU_PROMPT, Some(&menu)).await
            }
            Command::UnmuteMenu => {
                let muted = self
                    .mutes
                    .list_muted()
                    .await
                    .context("Failed to list paused namespaces")?;
                if muted.is_empty() {
                    return self.reply(NOTHING_MUTED_REPLY, None).await;
                }
                let menu = self.build_menu(&muted, CallbackAction::Unmute);
                self.reply(UNMUTE_MENU_PROMPT, Some(&menu)).await
            }
        }
    }

    /// One button per namespace, labelled with the name.
    fn build_menu(
        &self,
        namespaces: &[String],
        action: fn(u64) -> CallbackAction,
    ) -> InlineKeyboard {
        let buttons = namespaces
            .iter()
            .map(|ns| InlineButton {
                text: ns.clone(),
                callback_data: action(self.menus.register(ns)).encode(),
            })
            .collect();
        InlineKeyboard::single_column(buttons)
    }

    pub async fn handle_callback(&self, cb: CallbackQuery) -> Result<()> {
        let result = self.apply_callback(&cb).await;
        // Always acknowledge, even when the payload was rejected
        if let Err(e) = self.chat.answer_callback(&cb.id).await {
            warn!("Failed to answer callback {}: {}", cb.id, e);
        }
        result
    }

    async fn apply_callback(&self, cb: &CallbackQuery) -> Result<()> {
        if let Some(message) = &cb.message {
            if !self.is_operator_chat(message) {
                debug!("Ignoring callback from chat {}", message.chat.id);
                return Ok(());
            }
        }
        let data = cb.data.as_deref().unwrap_or_default();
        let action = CallbackAction::decode(data)
            .ok_or_else(|| anyhow!("Malformed callback payload {:?}", data))?;
        let ns = self
            .menus
            .lookup(action.menu_id())
            .ok_or_else(|| anyhow!("Unknown or expired menu selection {:?}", data))?;

        let confirmation = match action {
            CallbackAction::Mute(_) => {
                self.mutes
                    .mute(&ns, self.mute_ttl)
                    .await
                    .with_context(|| format!("Failed to pause {}", ns))?;
                info!("Paused notifications for {} for {}s", ns, self.mute_ttl.as_secs());
                mute_confirmation(&ns, self.mute_ttl)
            }
            CallbackAction::Unmute(_) => {
                self.mutes
                    .unmute(&ns)
                    .await
                    .with_context(|| format!("Failed to resume {}", ns))?;
                info!("Resumed notifications for {}", ns);
                unmute_confirmation(&ns)
            }
        };

        if let Some(message) = &cb.message {
            self.chat
                .edit_message(&message.chat.id.to_string(), message.message_id, &confirmation)
                .await
                .context("Failed to edit menu message")?;
        }
        Ok(())
    }

    async fn reply(&self, text: &str, keyboard: Option<&InlineKeyboard>) -> Result<()> {
        self.chat
            .send_message(&self.chat_id, text, keyboard)
            .await
            .context("Failed to send reply")
    }

    fn is_operator_chat(&self, message: &Message) -> bool {
        message.chat.id.to_string() == self.chat_id
    }

    /// Long-polls Telegram forever, handling each update on its own task.
    pub async fn run_polling(self: Arc<Self>, client: TelegramClient) {
        info!("control surface started");
        let mut offset: Option<i64> = None;
        loop {
            let updates = match client.get_updates(offset, POLL_TIMEOUT).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("Polling for updates failed: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };
            for update in updates {
                offset = Some(update.update_id + 1);
                let this = self.clone();
                tokio::spawn(async move {
                    let id = update.update_id;
                    if let Err(e) = this.handle_update(update).await {
                        error!("Update {} failed: {:#}", id, e);
                    }
                });
            }
        }
    }
}
