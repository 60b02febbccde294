// ABOUTME: Transports banter can run on
// ABOUTME: Telegram (feature "telegram") and a local console

pub mod console;
#[cfg(feature = "telegram")]
pub mod telegram;

pub use console::{ConsoleChannel, ConsolePlatform};
#[cfg(feature = "telegram")]
pub use telegram::{TelegramChannel, TelegramPlatform};
