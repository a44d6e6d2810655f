//! Scripted browser for British Gas flow tests
//!
//! The fake records every page action and answers like the real site would
//! for the locators the integration declares.

#![allow(dead_code)]

use async_trait::async_trait;
use relocate_core::error::{Error, Result};
use relocate_core::forms::FormField;
use relocate_core::model::{Address, ServiceCredentials};
use relocate_core::traits::{BrowserEngine, BrowserSession, LaunchOptions};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const LOGIN_SUBMIT: &str = "#login-submit";
pub const ADDRESS_SUBMIT: &str = "#update-address-submit";
pub const ACCOUNT_PAGE: &str = "https://www.britishgas.co.uk/account/";

/// Smallest valid PNG header; the integration only stores the bytes
pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Goto(String),
    Fill(String, String),
    Click(String),
    Screenshot,
    Close,
}

#[derive(Debug)]
struct Script {
    post_login_url: String,
    missing_locators: HashSet<String>,
    fail_launch: bool,
    launches: usize,
    closes: usize,
    actions: Vec<Action>,
}

/// Fake browser engine; clones share the same script and log
#[derive(Debug, Clone)]
pub struct FakeBrowser {
    script: Arc<Mutex<Script>>,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                post_login_url: ACCOUNT_PAGE.to_string(),
                missing_locators: HashSet::new(),
                fail_launch: false,
                launches: 0,
                closes: 0,
                actions: Vec::new(),
            })),
        }
    }

    /// Where the login submit lands; anything outside `/account/` is a refusal
    pub fn landing_after_login(self, url: &str) -> Self {
        self.script.lock().unwrap().post_login_url = url.to_string();
        self
    }

    pub fn without_element(self, locator: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .missing_locators
            .insert(locator.to_string());
        self
    }

    pub fn failing_launch(self) -> Self {
        self.script.lock().unwrap().fail_launch = true;
        self
    }

    pub fn launches(&self) -> usize {
        self.script.lock().unwrap().launches
    }

    pub fn closes(&self) -> usize {
        self.script.lock().unwrap().closes
    }

    pub fn actions(&self) -> Vec<Action> {
        self.script.lock().unwrap().actions.clone()
    }

    pub fn filled(&self, locator: &str) -> Option<String> {
        self.actions().into_iter().find_map(|action| match action {
            Action::Fill(l, value) if l == locator => Some(value),
            _ => None,
        })
    }

    pub fn clicked(&self, locator: &str) -> bool {
        self.actions()
            .iter()
            .any(|action| matches!(action, Action::Click(l) if l == locator))
    }
}

#[async_trait]
impl BrowserEngine for FakeBrowser {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        let mut script = self.script.lock().unwrap();
        if script.fail_launch {
            return Err(Error::infrastructure("browser crashed on start"));
        }
        script.launches += 1;
        Ok(Box::new(FakeSession {
            script: Arc::clone(&self.script),
            current_url: "about:blank".to_string(),
            closed: false,
        }))
    }

    fn engine_name(&self) -> &'static str {
        "fake"
    }
}

struct FakeSession {
    script: Arc<Mutex<Script>>,
    current_url: String,
    closed: bool,
}

impl FakeSession {
    fn record(&self, action: Action) -> Result<()> {
        if self.closed {
            return Err(Error::infrastructure("session closed"));
        }
        self.script.lock().unwrap().actions.push(action);
        Ok(())
    }

    fn require(&self, locator: &str) -> Result<()> {
        if self.script.lock().unwrap().missing_locators.contains(locator) {
            return Err(Error::element_not_found(locator));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.record(Action::Goto(url.to_string()))?;
        self.current_url = url.to_string();
        Ok(())
    }

    async fn fill(&mut self, locator: &str, value: &str) -> Result<()> {
        self.require(locator)?;
        self.record(Action::Fill(locator.to_string(), value.to_string()))
    }

    async fn click(&mut self, locator: &str) -> Result<()> {
        self.require(locator)?;
        self.record(Action::Click(locator.to_string()))?;
        if locator == LOGIN_SUBMIT {
            self.current_url = self.script.lock().unwrap().post_login_url.clone();
        }
        Ok(())
    }

    async fn wait_for_navigation(&mut self) -> Result<()> {
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.current_url.clone())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.record(Action::Screenshot)?;
        Ok(FAKE_PNG.to_vec())
    }

    async fn inspect_inputs(&mut self) -> Result<Vec<FormField>> {
        Ok(vec![
            FormField::text("line1", "#address-line-1"),
            FormField::text("postcode", "#postcode"),
        ])
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.record(Action::Close)?;
            self.closed = true;
            self.script.lock().unwrap().closes += 1;
        }
        Ok(())
    }
}

pub fn credentials() -> ServiceCredentials {
    ServiceCredentials::new()
        .with("accountNumber", "850012345678")
        .with("password", "hunter2")
}

pub fn old_address() -> Address {
    Address::new("1 Old Lane", "York", "YO1 7HH")
}

pub fn new_address() -> Address {
    Address::new("22 New Road", "Leeds", "LS1 4AP")
}
