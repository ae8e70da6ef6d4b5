//! Parsing for the subset of Twitch's IRC dialect the client reacts to.
//!
//! Nothing in here fails on unexpected input. Lines that don't match a known
//! shape come back as [`ServerLine::Unrecognized`].

const SERVER_MESSAGE_SIGIL: char = ':';
const PING_COMMAND: &str = "PING ";

/// One raw line split into its prefix, command and parameters.
///
/// The trailing parameter (the one after ` :`) is the last entry in `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcLine<'a> {
  prefix: Option<&'a str>,
  command: &'a str,
  params: Vec<&'a str>,
}

impl<'a> IrcLine<'a> {
  pub fn parse(line: &'a str) -> Option<Self> {
    let line = line.trim_end_matches(['\r', '\n']);

    if line.is_empty() {
      return None;
    }

    let mut rest = line;

    let prefix = if let Some(without_sigil) = rest.strip_prefix(SERVER_MESSAGE_SIGIL) {
      let (prefix, remainder) = without_sigil.split_once(' ')?;
      rest = remainder;

      Some(prefix)
    } else {
      None
    };

    let rest = rest.trim_start_matches(' ');
    let (command, mut rest) = match rest.split_once(' ') {
      Some((command, remainder)) => (command, remainder),
      None => (rest, ""),
    };

    if command.is_empty() {
      return None;
    }

    let mut params = Vec::new();

    while !rest.is_empty() {
      if let Some(trailing) = rest.strip_prefix(SERVER_MESSAGE_SIGIL) {
        params.push(trailing);
        break;
      }

      match rest.split_once(' ') {
        Some((param, remainder)) => {
          if !param.is_empty() {
            params.push(param);
          }

          rest = remainder;
        }
        None => {
          params.push(rest);
          break;
        }
      }
    }

    Some(Self {
      prefix,
      command,
      params,
    })
  }

  pub fn prefix(&self) -> Option<&'a str> {
    self.prefix
  }

  pub fn command(&self) -> &'a str {
    self.command
  }

  pub fn params(&self) -> &[&'a str] {
    &self.params
  }

  pub fn param(&self, index: usize) -> Option<&'a str> {
    self.params.get(index).copied()
  }

  pub fn trailing(&self) -> Option<&'a str> {
    self.params.last().copied()
  }

  /// The nickname in a `nick!user@host` prefix. A prefix without `!` is returned whole.
  pub fn sender_nickname(&self) -> Option<&'a str> {
    let prefix = self.prefix?;
    let nickname = prefix.split_once('!').map_or(prefix, |(nickname, _)| nickname);

    (!nickname.is_empty()).then_some(nickname)
  }
}

/// A line from the server, classified by what the client does with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
  /// Contains everything after `PING `, which is echoed back verbatim.
  Ping { payload: String },
  /// Numeric `001`.
  Welcome,
  Notice { text: String },
  /// Numeric `353`.
  NameList { names: Vec<String> },
  ModeratorGranted { username: String },
  Join { username: String },
  Part { username: String },
  PrivMsg {
    sender: String,
    channel: String,
    text: String,
  },
  Unrecognized,
}

impl ServerLine {
  pub fn classify(raw_line: &str) -> Self {
    let line = raw_line.trim_end_matches(['\r', '\n']);

    if let Some(payload) = line.strip_prefix(PING_COMMAND) {
      return Self::Ping {
        payload: payload.to_string(),
      };
    }

    if !line.starts_with(SERVER_MESSAGE_SIGIL) {
      return Self::Unrecognized;
    }

    let Some(irc_line) = IrcLine::parse(line) else {
      return Self::Unrecognized;
    };

    match irc_line.command().to_ascii_uppercase().as_str() {
      "001" => Self::Welcome,
      "NOTICE" => Self::Notice {
        text: irc_line.trailing().unwrap_or_default().to_string(),
      },
      "353" => Self::NameList {
        names: Self::names_from_name_list(&irc_line),
      },
      "MODE" => Self::classify_mode(&irc_line),
      "JOIN" => match irc_line.sender_nickname() {
        Some(username) => Self::Join {
          username: username.to_string(),
        },
        None => Self::Unrecognized,
      },
      "PART" => match irc_line.sender_nickname() {
        Some(username) => Self::Part {
          username: username.to_string(),
        },
        None => Self::Unrecognized,
      },
      "PRIVMSG" => Self::classify_private_message(&irc_line),
      _ => Self::Unrecognized,
    }
  }

  /// `:server 353 <own> = #<channel> :name1 name2 ...`
  fn names_from_name_list(irc_line: &IrcLine) -> Vec<String> {
    irc_line
      .params()
      .iter()
      .skip(3)
      .flat_map(|param| param.split_whitespace())
      .map(|name| name.trim_start_matches(SERVER_MESSAGE_SIGIL))
      .filter(|name| !name.is_empty())
      .map(str::to_string)
      .collect()
  }

  /// `:jtv MODE #<channel> +o <user>`
  fn classify_mode(irc_line: &IrcLine) -> Self {
    match (irc_line.param(1), irc_line.param(2)) {
      (Some("+o"), Some(username)) => Self::ModeratorGranted {
        username: username.to_string(),
      },
      _ => Self::Unrecognized,
    }
  }

  /// `:<nick>!<user>@<host> PRIVMSG #<channel> :<text>`
  fn classify_private_message(irc_line: &IrcLine) -> Self {
    let (Some(sender), Some(channel)) = (irc_line.sender_nickname(), irc_line.param(0)) else {
      return Self::Unrecognized;
    };

    if irc_line.params().len() < 2 {
      return Self::Unrecognized;
    }

    Self::PrivMsg {
      sender: sender.to_string(),
      channel: channel.trim_start_matches('#').to_string(),
      text: irc_line.trailing().unwrap_or_default().to_string(),
    }
  }
}
