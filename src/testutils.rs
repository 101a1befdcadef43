//! In-process fakes for the cluster and the chat platform, shared by unit and
//! integration tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::kubernetes::ClusterApi;
use crate::telegram::{ChatApi, InlineKeyboard, TelegramError};
use crate::types::PodSummary;

#[derive(Default)]
pub struct FakeCluster {
    namespaces: Mutex<Vec<String>>,
    pods: Mutex<HashMap<String, Vec<PodSummary>>>,
    fail_namespaces: bool,
    failing_pod_namespaces: HashSet<String>,
    namespace_calls: AtomicUsize,
    pod_calls: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespaces(self, namespaces: &[&str]) -> Self {
        self.set_namespaces(namespaces);
        self
    }

    /// Adds pods given as `(name, phase)` to `namespace`.
    pub fn with_pods(self, namespace: &str, pods: &[(&str, &str)]) -> Self {
        let summaries = pods
            .iter()
            .map(|(name, phase)| PodSummary {
                name: name.to_string(),
                phase: Some(phase.to_string()),
            })
            .collect();
        self.pods.lock().unwrap().insert(namespace.to_string(), summaries);
        self
    }

    pub fn failing_namespaces(mut self) -> Self {
        self.fail_namespaces = true;
        self
    }

    pub fn failing_pods(mut self, namespace: &str) -> Self {
        self.failing_pod_namespaces.insert(namespace.to_string());
        self
    }

    pub fn set_namespaces(&self, namespaces: &[&str]) {
        *self.namespaces.lock().unwrap() = namespaces.iter().map(|s| s.to_string()).collect();
    }

    pub fn namespace_calls(&self) -> usize {
        self.namespace_calls.load(Ordering::SeqCst)
    }

    /// Namespaces whose pods were listed, in call order.
    pub fn pod_calls(&self) -> Vec<String> {
        self.pod_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.namespace_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_namespaces {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.namespaces.lock().unwrap().clone())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodSummary>> {
        self.pod_calls.lock().unwrap().push(namespace.to_string());
        if self.failing_pod_namespaces.contains(namespace) {
            return Err(anyhow!("pods is forbidden in {}", namespace));
        }
        Ok(self.pods.lock().unwrap().get(namespace).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditedMessage {
    pub chat_id: String,
    pub message_id: i64,
    pub text: String,
}

/// Records every outbound chat call instead of talking to Telegram.
#[derive(Default)]
pub struct RecordingChat {
    sent: Mutex<Vec<SentMessage>>,
    edited: Mutex<Vec<EditedMessage>>,
    answered: Mutex<Vec<String>>,
    fail_sends: bool,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail_sends: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn edited(&self) -> Vec<EditedMessage> {
        self.edited.lock().unwrap().clone()
    }

    pub fn answered(&self) -> Vec<String> {
        self.answered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for RecordingChat {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TelegramError> {
        if self.fail_sends {
            return Err(TelegramError::Api {
                method: "sendMessage".to_string(),
                description: "Bad Gateway".to_string(),
            });
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError> {
        self.edited.lock().unwrap().push(EditedMessage {
            chat_id: chat_id.to_string(),
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TelegramError> {
        self.answered.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}
