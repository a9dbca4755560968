//! Console adapter for development/testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::{Message, Profile};
use crate::domain::traits::{Bot, BotInfo};

/// Console bot adapter for local development. Every input line is a message
/// from one local user; replies go to stdout.
pub struct ConsoleAdapter<R = BufReader<Stdin>> {
    info: BotInfo,
    user: Profile,
    lines: Mutex<Lines<R>>,
    next_id: AtomicI64,
}

impl ConsoleAdapter {
    pub fn new(user: Profile) -> Self {
        Self::with_reader(user, BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleAdapter<R> {
    pub fn with_reader(user: Profile, reader: R) -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "greeter-bot".to_string(),
                username: "console".to_string(),
            },
            user,
            lines: Mutex::new(reader.lines()),
            next_id: AtomicI64::new(1),
        }
    }

    fn to_message(&self, line: &str) -> Message {
        Message::new(self.user.external_id, line.trim())
            .with_id(self.next_id.fetch_add(1, Ordering::SeqCst))
            .with_sender(self.user.clone())
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Bot for ConsoleAdapter<R> {
    async fn start(&self) -> Result<BotInfo, BotError> {
        tracing::info!("Starting console bot (dev mode), end input to stop");
        Ok(self.info.clone())
    }

    async fn next_messages(&self) -> Result<Option<Vec<Message>>, BotError> {
        let mut lines = self.lines.lock().await;
        loop {
            match lines.next_line().await? {
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return Ok(Some(vec![self.to_message(&line)])),
                None => return Ok(None),
            }
        }
    }

    async fn reply(&self, _to: &Message, text: &str) -> Result<String, BotError> {
        println!("[BOT] {}", text);
        Ok("console_msg".to_string())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_lines_until_eof() {
        let input: &[u8] = b"/start\n\n  /help start  \n";
        let bot = ConsoleAdapter::with_reader(
            Profile::new(5).with_name("Dev", None::<String>),
            BufReader::new(input),
        );

        let first = bot.next_messages().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].text, "/start");
        assert_eq!(first[0].chat_id, 5);
        assert_eq!(first[0].sender.as_ref().unwrap().display_name(), "Dev");

        let second = bot.next_messages().await.unwrap().unwrap();
        assert_eq!(second[0].text, "/help start");
        assert!(second[0].id > first[0].id);

        assert!(bot.next_messages().await.unwrap().is_none());
    }
}
