//! One-shot status messages carried across the post/redirect/get cycle.

use std::fmt;
use std::str::FromStr;

use actix_web::cookie::Cookie;

use crate::cpu_stress::{MAX_TARGET_PERCENT, MIN_TARGET_PERCENT};
use crate::error::StressError;

pub const FLASH_COOKIE: &str = "stress_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
            FlashLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMessage {
    Started { target: u32 },
    Stopped,
    AlreadyRunning,
    TargetOutOfRange,
    NotRunning,
    ShuttingDown,
}

impl FlashMessage {
    pub fn level(self) -> FlashLevel {
        match self {
            FlashMessage::Started { .. } | FlashMessage::Stopped => FlashLevel::Success,
            FlashMessage::NotRunning => FlashLevel::Warning,
            FlashMessage::AlreadyRunning
            | FlashMessage::TargetOutOfRange
            | FlashMessage::ShuttingDown => FlashLevel::Error,
        }
    }

    /// Compact cookie value, parsed back by `FromStr`.
    pub fn token(self) -> String {
        match self {
            FlashMessage::Started { target } => format!("started-{}", target),
            FlashMessage::Stopped => "stopped".to_string(),
            FlashMessage::AlreadyRunning => "already-running".to_string(),
            FlashMessage::TargetOutOfRange => "out-of-range".to_string(),
            FlashMessage::NotRunning => "not-running".to_string(),
            FlashMessage::ShuttingDown => "shutting-down".to_string(),
        }
    }

    pub fn to_cookie(self) -> Cookie<'static> {
        Cookie::build(FLASH_COOKIE, self.token())
            .path("/")
            .http_only(true)
            .finish()
    }

    /// Cookie that tells the browser to drop the flash once it has been shown.
    pub fn removal_cookie() -> Cookie<'static> {
        let mut cookie = Cookie::build(FLASH_COOKIE, "").path("/").finish();
        cookie.make_removal();
        cookie
    }
}

impl From<StressError> for FlashMessage {
    fn from(err: StressError) -> Self {
        match err {
            StressError::AlreadyRunning => FlashMessage::AlreadyRunning,
            StressError::TargetOutOfRange { .. } => FlashMessage::TargetOutOfRange,
            StressError::NotRunning => FlashMessage::NotRunning,
            StressError::ShuttingDown => FlashMessage::ShuttingDown,
        }
    }
}

impl fmt::Display for FlashMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashMessage::Started { target } => write!(
                f,
                "CPU stress test started successfully with target: {}%",
                target
            ),
            FlashMessage::Stopped => write!(f, "CPU stress test stopped successfully."),
            FlashMessage::AlreadyRunning => write!(f, "{}", StressError::AlreadyRunning),
            FlashMessage::TargetOutOfRange => write!(
                f,
                "Target CPU percentage must be between {}% and {}%.",
                MIN_TARGET_PERCENT, MAX_TARGET_PERCENT
            ),
            FlashMessage::NotRunning => write!(f, "{}", StressError::NotRunning),
            FlashMessage::ShuttingDown => write!(f, "{}", StressError::ShuttingDown),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownFlash;

impl FromStr for FlashMessage {
    type Err = UnknownFlash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(FlashMessage::Stopped),
            "already-running" => Ok(FlashMessage::AlreadyRunning),
            "out-of-range" => Ok(FlashMessage::TargetOutOfRange),
            "not-running" => Ok(FlashMessage::NotRunning),
            "shutting-down" => Ok(FlashMessage::ShuttingDown),
            other => other
                .strip_prefix("started-")
                .and_then(|t| t.parse().ok())
                .map(|target| FlashMessage::Started { target })
                .ok_or(UnknownFlash),
        }
    }
}
