//! Command palette entries and autocomplete.

/// What a palette command does once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
  Vault,
  Generate,
  Sync,
  Logout,
  Open,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: AppCommand,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "vault",
    aliases: &["v", "passwords", "list"],
    description: "Show your passwords",
    action: AppCommand::Vault,
  },
  Command {
    name: "generate",
    aliases: &["g", "gen", "password"],
    description: "Generate a strong password",
    action: AppCommand::Generate,
  },
  Command {
    name: "sync",
    aliases: &["s", "flush"],
    description: "Replay changes saved offline",
    action: AppCommand::Sync,
  },
  Command {
    name: "logout",
    aliases: &["signout", "sign-out"],
    description: "Sign out of your account",
    action: AppCommand::Logout,
  },
  Command {
    name: "open",
    aliases: &["o", "notification"],
    description: "Open the latest notification",
    action: AppCommand::Open,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit Pocket Secrets",
    action: AppCommand::Quit,
  },
];

/// Commands matching `input`, best first: exact name, exact alias, name
/// prefix, alias prefix, then substring matches.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();
  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let rank = |cmd: &Command| -> Option<u8> {
    let alias = |f: &dyn Fn(&str) -> bool| cmd.aliases.iter().any(|a| f(a));
    if cmd.name == input {
      Some(0)
    } else if alias(&|a| a == input) {
      Some(1)
    } else if cmd.name.starts_with(&input) {
      Some(2)
    } else if alias(&|a| a.starts_with(&input)) {
      Some(3)
    } else if cmd.name.contains(&input) {
      Some(4)
    } else if alias(&|a| a.contains(&input)) {
      Some(5)
    } else {
      None
    }
  };

  let mut matches: Vec<(u8, &'static Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd).map(|r| (r, cmd)))
    .collect();
  matches.sort_by_key(|(rank, _)| *rank);
  matches.into_iter().map(|(_, cmd)| cmd).collect()
}

/// Resolve typed text to a command, if it names one exactly.
pub fn parse(input: &str) -> Option<AppCommand> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
    .map(|cmd| cmd.action)
}
