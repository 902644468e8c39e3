use launcher_core::Msg;

pub const HELP: &str = "\
Commands:
  signin               sign in with a device code
  signout              sign out and forget the pipeline list
  refresh              renew the token and reload pipelines
  open <n>             select pipeline number <n>
  set <field> <value>  fill in a field of the launch form
  submit               launch with the entered values
  cancel               close the launch form
  help                 show this list
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SignIn,
    SignOut,
    Refresh,
    /// One-based, as shown on screen.
    Open(usize),
    Set { field: String, value: String },
    Submit,
    Cancel,
    Help,
    Quit,
}

impl Command {
    /// The core message this command stands for; `None` for shell-only
    /// commands.
    pub fn into_msg(self) -> Option<Msg> {
        match self {
            Command::SignIn => Some(Msg::SignInClicked),
            Command::SignOut => Some(Msg::SignOutClicked),
            Command::Refresh => Some(Msg::RefreshRequested),
            Command::Open(number) => Some(Msg::PipelineSelected(number.saturating_sub(1))),
            Command::Set { field, value } => Some(Msg::FieldChanged { name: field, value }),
            Command::Submit => Some(Msg::LaunchSubmitted),
            Command::Cancel => Some(Msg::LaunchCancelled),
            Command::Help | Command::Quit => None,
        }
    }
}

/// Parses one input line. Blank lines yield `Ok(None)`.
///
/// The value of `set` is the rest of the line after the field name, inner
/// spaces included.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "signin" | "login" => Command::SignIn,
        "signout" | "logout" => Command::SignOut,
        "refresh" | "r" => Command::Refresh,
        "open" | "o" => Command::Open(parse_number(rest)?),
        "set" => {
            let (field, value) = match rest.split_once(char::is_whitespace) {
                Some((field, value)) => (field, value.trim_start()),
                None => (rest, ""),
            };
            if field.is_empty() {
                return Err("usage: set <field> <value>".to_string());
            }
            Command::Set {
                field: field.to_string(),
                value: value.to_string(),
            }
        }
        "submit" | "launch" => Command::Submit,
        "cancel" => Command::Cancel,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(Some(command))
}

fn parse_number(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("pipeline numbers start at 1".to_string()),
        Ok(number) => Ok(number),
        Err(_) => Err("usage: open <n>".to_string()),
    }
}
