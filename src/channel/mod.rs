pub mod mailbox;

pub use mailbox::{MailMessage, MailboxChannel};
